//! Unified error handling for the p4bridge client layer.
//!
//! This module provides a single error type [`P4Error`] shared by every crate
//! in the workspace. Narrow, module-local failures (spec grammar, form text)
//! have their own `thiserror` enums and convert into [`P4Error`] with `?`.
//!
//! ## Taxonomy
//!
//! Every [`ErrorKind`] belongs to exactly one [`ErrorCategory`]:
//!
//! - **Protocol**: malformed wire data, unknown spec types, malformed spec or form text
//! - **Command**: server-reported errors and warnings escalated by the exception level
//! - **Callback**: failures raised inside caller-supplied handlers
//! - **State**: local precondition failures (reentrancy, not connected, ...)
//!
//! ## Example
//!
//! ```rust
//! use p4bridge_protocol::error::{ErrorCategory, ErrorKind, P4Error};
//!
//! let err = P4Error::unknown_spec("widget").with_operation("parse_spec");
//! assert_eq!(err.kind, ErrorKind::UnknownSpec);
//! assert_eq!(err.kind.category(), ErrorCategory::Protocol);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result type alias for p4bridge operations
pub type Result<T> = std::result::Result<T, P4Error>;

/// Unified p4bridge error type
///
/// The `context` field is boxed to keep the error small for efficient
/// `Result<T, P4Error>` usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct P4Error {
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Additional context (boxed to keep P4Error small)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Box<ErrorContext>>,
}

/// Additional error context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Operation being performed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Command string (`p4 cmd args...`) that was executing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Formatted server errors accumulated by the command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
    /// Formatted server warnings accumulated by the command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
}

/// Broad class of an error, used for escalation decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed data from the server or the caller; always surfaced
    Protocol,
    /// Server-reported errors or warnings
    Command,
    /// A caller-supplied callback failed
    Callback,
    /// A local precondition was violated
    State,
}

/// Error classification for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    // === Protocol ===
    /// Malformed wire dictionary or transport payload
    Protocol,
    /// No spec definition registered for a type
    UnknownSpec,
    /// Spec definition text could not be parsed
    SpecSyntax,
    /// Form text could not be parsed against its definition
    FormParse,
    /// A field name outside a spec record's permitted fields
    InvalidField,
    /// The transport engine reported a failure
    Transport,

    // === Command ===
    /// Server errors or warnings escalated by the exception level
    Command,

    // === Callback ===
    /// A caller-supplied handler, resolver or SSO handler failed
    Callback,
    /// A prompt arrived but no input was supplied
    Input,
    /// An SSO handler returned a status outside the valid range
    InvalidStatus,

    // === State ===
    /// Reentrant command, run while disconnected, setting changed after connect
    State,
    /// Access to a callback object after it was invalidated
    Invalidated,
    /// A required collaborator is missing or misconfigured
    Configuration,
}

impl P4Error {
    /// Create a new error with kind and message
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// Create a protocol error
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    /// Create an unknown spec type error
    #[must_use]
    pub fn unknown_spec(spec_type: impl AsRef<str>) -> Self {
        Self::new(
            ErrorKind::UnknownSpec,
            format!("No spec definition for {} objects.", spec_type.as_ref()),
        )
    }

    /// Create the error raised when a record cannot be formatted for lack of a definition
    #[must_use]
    pub fn no_specdef() -> Self {
        Self::new(
            ErrorKind::UnknownSpec,
            "No specdef available. Cannot convert hash to a Perforce form",
        )
    }

    /// Create the error raised when setting a field a spec does not permit
    #[must_use]
    pub fn invalid_field(name: impl AsRef<str>) -> Self {
        Self::new(
            ErrorKind::InvalidField,
            format!("Invalid field: {}", name.as_ref()),
        )
    }

    /// Create a command error
    #[must_use]
    pub fn command(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Command, message)
    }

    /// Create a callback error
    #[must_use]
    pub fn callback(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Callback, message)
    }

    /// Create a state error
    #[must_use]
    pub fn state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::State, message)
    }

    /// Create an invalidated-object error
    #[must_use]
    pub fn invalidated(object: impl AsRef<str>) -> Self {
        Self::new(
            ErrorKind::Invalidated,
            format!("{} has been invalidated", object.as_ref()),
        )
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a transport error
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Set the operation context
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Set the command context
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.context_mut().command = Some(command.into());
        self
    }

    /// Attach accumulated error and warning text
    #[must_use]
    pub fn with_diagnostics(mut self, errors: Option<String>, warnings: Option<String>) -> Self {
        let ctx = self.context_mut();
        ctx.errors = errors.filter(|e| !e.is_empty());
        ctx.warnings = warnings.filter(|w| !w.is_empty());
        self
    }

    /// The command string this error was raised for, if any
    #[must_use]
    pub fn command_string(&self) -> Option<&str> {
        self.context.as_ref()?.command.as_deref()
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        self.context
            .get_or_insert_with(|| Box::new(ErrorContext::default()))
    }
}

impl ErrorKind {
    /// The section of the taxonomy this kind belongs to
    #[must_use]
    pub const fn category(self) -> ErrorCategory {
        match self {
            Self::Protocol
            | Self::UnknownSpec
            | Self::SpecSyntax
            | Self::FormParse
            | Self::InvalidField
            | Self::Transport => ErrorCategory::Protocol,
            Self::Command => ErrorCategory::Command,
            Self::Callback | Self::Input | Self::InvalidStatus => ErrorCategory::Callback,
            Self::State | Self::Invalidated | Self::Configuration => ErrorCategory::State,
        }
    }

    /// Get a human-readable description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Protocol => "Protocol error",
            Self::UnknownSpec => "Unknown spec type",
            Self::SpecSyntax => "Malformed spec definition",
            Self::FormParse => "Malformed form",
            Self::InvalidField => "Invalid field",
            Self::Transport => "Transport error",
            Self::Command => "Command failed",
            Self::Callback => "Callback failed",
            Self::Input => "Missing user input",
            Self::InvalidStatus => "Invalid status",
            Self::State => "Invalid session state",
            Self::Invalidated => "Object invalidated",
            Self::Configuration => "Configuration error",
        }
    }
}

impl fmt::Display for P4Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Command escalations follow the "[func] msg" layout callers grep for
        if let Some(ctx) = &self.context
            && self.kind == ErrorKind::Command
        {
            if let Some(op) = &ctx.operation {
                write!(f, "[{}] ", op)?;
            }
            write!(f, "{}", self.message)?;
            if let Some(errors) = &ctx.errors {
                write!(f, "\n{}", errors)?;
            }
            if let Some(warnings) = &ctx.warnings {
                write!(f, "\n{}", warnings)?;
            }
            if ctx.errors.is_some() || ctx.warnings.is_some() {
                write!(f, "\n\n")?;
            }
            return Ok(());
        }

        write!(f, "{}", self.message)?;
        if let Some(ctx) = &self.context {
            if let Some(op) = &ctx.operation {
                write!(f, " (operation: {})", op)?;
            }
            if let Some(cmd) = &ctx.command {
                write!(f, " (command: {})", cmd)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::error::Error for P4Error {}

// =========================================================================
// From implementations for module-local error types
// =========================================================================

impl From<Box<P4Error>> for P4Error {
    fn from(boxed: Box<P4Error>) -> Self {
        *boxed
    }
}

impl From<crate::spec::DefinitionError> for P4Error {
    fn from(err: crate::spec::DefinitionError) -> Self {
        Self::new(ErrorKind::SpecSyntax, err.to_string())
    }
}

impl From<crate::form::FormError> for P4Error {
    fn from(err: crate::form::FormError) -> Self {
        Self::new(ErrorKind::FormParse, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_spec_message() {
        let err = P4Error::unknown_spec("widget");
        assert_eq!(err.to_string(), "No spec definition for widget objects.");
        assert_eq!(err.kind.category(), ErrorCategory::Protocol);
    }

    #[test]
    fn test_context_display() {
        let err = P4Error::state("not connected")
            .with_operation("run")
            .with_command("p4 info");
        assert_eq!(
            err.to_string(),
            "not connected (operation: run) (command: p4 info)"
        );
        assert_eq!(err.command_string(), Some("p4 info"));
    }

    #[test]
    fn test_command_display_layout() {
        let err = P4Error::command("Errors during command execution( \"p4 edit x\" )")
            .with_operation("Session::run")
            .with_diagnostics(Some("\n\t[Error]: no such file".into()), Some(String::new()));
        assert_eq!(
            err.to_string(),
            "[Session::run] Errors during command execution( \"p4 edit x\" )\n\n\t[Error]: no such file\n\n"
        );
    }

    #[test]
    fn test_categories_cover_taxonomy() {
        assert_eq!(ErrorKind::Command.category(), ErrorCategory::Command);
        assert_eq!(ErrorKind::InvalidStatus.category(), ErrorCategory::Callback);
        assert_eq!(ErrorKind::Invalidated.category(), ErrorCategory::State);
        assert_eq!(ErrorKind::FormParse.category(), ErrorCategory::Protocol);
    }

    #[test]
    fn test_serialization_skips_empty_context() {
        let err = P4Error::protocol("bad key");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "protocol");
        assert!(json.get("context").is_none());
    }
}
