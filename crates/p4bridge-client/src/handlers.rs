//! Handler traits for the interactive side of a command
//!
//! While a command runs, the server may stream far more output than a caller
//! wants buffered, ask for a conflict to be resolved, report progress, or
//! request single-sign-on credentials. Each of these is a capability set with
//! every method mandatory; a session without a handler for a protocol falls
//! back to the default behavior for it.
//!
//! ## Handler Types
//!
//! - **OutputHandler**: Intercept output before it is buffered, optionally
//!   consuming it or cancelling the command
//! - **Progress**: Receive progress reports for long-running commands
//! - **SsoHandler**: Answer single-sign-on authorization requests
//! - **Resolver**: Answer merge conflicts during `resolve`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use p4bridge_client::handlers::{HandlerResult, OutputDisposition, OutputHandler};
//! use p4bridge_client::CommandOutput;
//! use p4bridge_protocol::Message;
//! use async_trait::async_trait;
//! use bytes::Bytes;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! // Stop a large listing after the first hundred records
//! #[derive(Debug, Default)]
//! struct FirstHundred {
//!     seen: AtomicUsize,
//! }
//!
//! #[async_trait]
//! impl OutputHandler for FirstHundred {
//!     async fn output_stat(&self, _stat: &CommandOutput) -> HandlerResult<OutputDisposition> {
//!         if self.seen.fetch_add(1, Ordering::Relaxed) + 1 >= 100 {
//!             return Ok(OutputDisposition::CANCEL);
//!         }
//!         Ok(OutputDisposition::REPORT)
//!     }
//!
//!     async fn output_info(&self, _text: &str) -> HandlerResult<OutputDisposition> {
//!         Ok(OutputDisposition::REPORT)
//!     }
//!
//!     async fn output_text(&self, _text: &str) -> HandlerResult<OutputDisposition> {
//!         Ok(OutputDisposition::REPORT)
//!     }
//!
//!     async fn output_binary(&self, _data: &Bytes) -> HandlerResult<OutputDisposition> {
//!         Ok(OutputDisposition::HANDLED)
//!     }
//!
//!     async fn output_message(&self, _message: &Message) -> HandlerResult<OutputDisposition> {
//!         Ok(OutputDisposition::REPORT)
//!     }
//! }
//! ```

use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use p4bridge_protocol::{ErrorKind, Message, P4Error, ProgressDone, SsoStatus, WireDict};
use thiserror::Error;
use tracing::debug;

use crate::merge::MergeInfo;
use crate::result::CommandOutput;

// ============================================================================
// ERROR TYPES FOR HANDLER OPERATIONS
// ============================================================================

/// Errors a caller-supplied handler may report
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HandlerError {
    /// The user abandoned the interaction
    #[error("User cancelled the operation")]
    UserCancelled,

    /// Input validation failed
    #[error("Invalid input: {details}")]
    InvalidInput {
        /// What was wrong
        details: String,
    },

    /// Handler configuration error
    #[error("Handler configuration error: {message}")]
    Configuration {
        /// What is misconfigured
        message: String,
    },

    /// Generic handler error
    #[error("Handler error: {message}")]
    Generic {
        /// Error text
        message: String,
    },

    /// External system error (e.g., UI framework, credential helper)
    #[error("External system error: {source}")]
    External {
        /// The underlying error
        #[from]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl HandlerError {
    /// Shorthand for a [`HandlerError::Generic`]
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }
}

impl From<HandlerError> for P4Error {
    fn from(err: HandlerError) -> Self {
        let kind = match &err {
            HandlerError::InvalidInput { .. } => ErrorKind::Input,
            HandlerError::Configuration { .. } => ErrorKind::Configuration,
            _ => ErrorKind::Callback,
        };
        P4Error::new(kind, err.to_string())
    }
}

/// Result type for handler operations
pub type HandlerResult<T> = Result<T, HandlerError>;

// ============================================================================
// OUTPUT HANDLER
// ============================================================================

/// What an [`OutputHandler`] wants done with one unit of output
///
/// A bitmask: [`REPORT`](Self::REPORT) buffers the unit as usual,
/// [`HANDLED`](Self::HANDLED) suppresses buffering and
/// [`CANCEL`](Self::CANCEL) stops the command after this unit. `HANDLED` and
/// `CANCEL` combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OutputDisposition(u8);

impl OutputDisposition {
    /// Buffer the unit
    pub const REPORT: Self = Self(0);
    /// The handler consumed the unit
    pub const HANDLED: Self = Self(1);
    /// Stop the command
    pub const CANCEL: Self = Self(2);

    /// Decode a raw bitmask
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b11)
    }

    /// Raw bitmask
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether buffering is suppressed
    #[must_use]
    pub const fn is_handled(self) -> bool {
        self.0 & Self::HANDLED.0 != 0
    }

    /// Whether the command should stop
    #[must_use]
    pub const fn is_cancel(self) -> bool {
        self.0 & Self::CANCEL.0 != 0
    }
}

impl BitOr for OutputDisposition {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OutputDisposition {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Intercepts command output before it is buffered
///
/// Called once per output unit, in arrival order, never concurrently. An
/// error (or a panic) stops the command and is returned from `run` once the
/// engine has unwound.
#[async_trait]
pub trait OutputHandler: Send + Sync + std::fmt::Debug {
    /// Tagged output, already converted to a record or spec record
    async fn output_stat(&self, stat: &CommandOutput) -> HandlerResult<OutputDisposition>;

    /// An empty or informational message, rendered as plain text
    async fn output_info(&self, text: &str) -> HandlerResult<OutputDisposition>;

    /// Plain text output
    async fn output_text(&self, text: &str) -> HandlerResult<OutputDisposition>;

    /// Binary output
    async fn output_binary(&self, data: &Bytes) -> HandlerResult<OutputDisposition>;

    /// A warning or error message
    async fn output_message(&self, message: &Message) -> HandlerResult<OutputDisposition>;
}

/// Output handler that buffers everything
///
/// Registering it is equivalent to registering nothing, except that the
/// engine polls for cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportHandler;

#[async_trait]
impl OutputHandler for ReportHandler {
    async fn output_stat(&self, _stat: &CommandOutput) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }

    async fn output_info(&self, _text: &str) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }

    async fn output_text(&self, _text: &str) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }

    async fn output_binary(&self, _data: &Bytes) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }

    async fn output_message(&self, _message: &Message) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }
}

// ============================================================================
// PROGRESS
// ============================================================================

/// Receives progress reports for long-running commands
///
/// The engine creates one indicator per measured operation: [`init`] first,
/// then any number of description, total and update calls, then [`done`].
///
/// [`init`]: Progress::init
/// [`done`]: Progress::done
#[async_trait]
pub trait Progress: Send + Sync + std::fmt::Debug {
    /// A new indicator of the given type
    async fn init(&self, kind: i32) -> HandlerResult<()>;

    /// What is being measured and in which units
    async fn description(&self, description: &str, units: i32) -> HandlerResult<()>;

    /// Expected total
    async fn total(&self, total: i64) -> HandlerResult<()>;

    /// Current position
    async fn update(&self, position: i64) -> HandlerResult<()>;

    /// The measured operation finished
    async fn done(&self, state: ProgressDone) -> HandlerResult<()>;
}

// ============================================================================
// SINGLE SIGN-ON
// ============================================================================

/// Reply from an [`SsoHandler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsoReply {
    /// A bare status code
    Status(i64),
    /// A status code with a result payload
    StatusWithResult(i64, String),
    /// A credential; implies pass
    Text(String),
}

impl SsoReply {
    /// Validate the reply into a status and payload
    ///
    /// # Errors
    ///
    /// Returns an `InvalidStatus` error when the code is outside the SSO
    /// status range.
    pub fn into_status(self) -> Result<(SsoStatus, String), P4Error> {
        let (code, result) = match self {
            Self::Text(text) => return Ok((SsoStatus::Pass, text)),
            Self::Status(code) => (code, String::new()),
            Self::StatusWithResult(code, result) => (code, result),
        };
        let status = SsoStatus::from_code(code).ok_or_else(|| {
            P4Error::new(
                ErrorKind::InvalidStatus,
                format!("SSO handler returned out of range response: {code}"),
            )
        })?;
        Ok((status, result))
    }
}

impl From<SsoStatus> for SsoReply {
    fn from(status: SsoStatus) -> Self {
        Self::Status(i64::from(status.code()))
    }
}

impl From<(SsoStatus, String)> for SsoReply {
    fn from((status, result): (SsoStatus, String)) -> Self {
        Self::StatusWithResult(i64::from(status.code()), result)
    }
}

impl From<String> for SsoReply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Answers single-sign-on authorization requests
///
/// Returning [`SsoStatus::Skip`] defers to the session's configured fallback.
#[async_trait]
pub trait SsoHandler: Send + Sync + std::fmt::Debug {
    /// Authorize with the server-supplied variables
    async fn authorize(&self, vars: &WireDict, max_length: usize) -> HandlerResult<SsoReply>;
}

/// SSO handler that always defers to the fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSsoHandler;

#[async_trait]
impl SsoHandler for DefaultSsoHandler {
    async fn authorize(&self, _vars: &WireDict, _max_length: usize) -> HandlerResult<SsoReply> {
        Ok(SsoReply::StatusWithResult(
            i64::from(SsoStatus::Skip.code()),
            String::new(),
        ))
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Answers merge conflicts during `resolve`
///
/// The reply is one of `ay` (yours), `at` (theirs), `am` (merged), `ae`
/// (edited), `s` (skip) or `q` (quit); [`MergeInfo::merge_hint`] carries the
/// engine's recommendation. Anything else is logged and treated as `q`.
#[async_trait]
pub trait Resolver: Send + Sync + std::fmt::Debug {
    /// Decide one conflict
    async fn resolve(&self, info: &MergeInfo) -> HandlerResult<String>;
}

// ============================================================================
// HANDLER REGISTRY
// ============================================================================

/// Registry for the handlers of a session
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    /// Output interception
    pub output: Option<Arc<dyn OutputHandler>>,

    /// Progress reporting
    pub progress: Option<Arc<dyn Progress>>,

    /// Single sign-on
    pub sso: Option<Arc<dyn SsoHandler>>,
}

impl HandlerRegistry {
    /// Create a new empty handler registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an output handler
    pub fn set_output_handler(&mut self, handler: Arc<dyn OutputHandler>) {
        debug!("Registering output handler");
        self.output = Some(handler);
    }

    /// Register a progress handler
    pub fn set_progress_handler(&mut self, handler: Arc<dyn Progress>) {
        debug!("Registering progress handler");
        self.progress = Some(handler);
    }

    /// Register an SSO handler
    pub fn set_sso_handler(&mut self, handler: Arc<dyn SsoHandler>) {
        debug!("Registering SSO handler");
        self.sso = Some(handler);
    }

    /// Remove the output handler
    pub fn clear_output_handler(&mut self) -> Option<Arc<dyn OutputHandler>> {
        self.output.take()
    }

    /// Remove the progress handler
    pub fn clear_progress_handler(&mut self) -> Option<Arc<dyn Progress>> {
        self.progress.take()
    }

    /// Remove the SSO handler
    pub fn clear_sso_handler(&mut self) -> Option<Arc<dyn SsoHandler>> {
        self.sso.take()
    }

    /// Check if an output handler is registered
    #[must_use]
    pub fn has_output_handler(&self) -> bool {
        self.output.is_some()
    }

    /// Check if a progress handler is registered
    #[must_use]
    pub fn has_progress_handler(&self) -> bool {
        self.progress.is_some()
    }

    /// Check if an SSO handler is registered
    #[must_use]
    pub fn has_sso_handler(&self) -> bool {
        self.sso.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p4bridge_protocol::Severity;

    #[test]
    fn test_disposition_bits() {
        let both = OutputDisposition::HANDLED | OutputDisposition::CANCEL;
        assert!(both.is_handled());
        assert!(both.is_cancel());
        assert_eq!(both.bits(), 3);
        assert!(!OutputDisposition::REPORT.is_handled());
        assert_eq!(OutputDisposition::from_bits(0xff).bits(), 3);
    }

    #[test]
    fn test_sso_reply_validation() {
        assert_eq!(
            SsoReply::Text("token".into()).into_status().unwrap(),
            (SsoStatus::Pass, "token".to_string())
        );
        assert_eq!(
            SsoReply::StatusWithResult(1, "denied".into()).into_status().unwrap(),
            (SsoStatus::Fail, "denied".to_string())
        );
        assert_eq!(
            SsoReply::Status(3).into_status().unwrap(),
            (SsoStatus::Exit, String::new())
        );
        let err = SsoReply::Status(7).into_status().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidStatus);
    }

    #[tokio::test]
    async fn test_default_sso_handler_skips() {
        let reply = DefaultSsoHandler.authorize(&WireDict::new(), 128).await.unwrap();
        assert_eq!(reply.into_status().unwrap(), (SsoStatus::Skip, String::new()));
    }

    #[test]
    fn test_report_handler_reports_everything() {
        tokio_test::block_on(async {
            let handler = ReportHandler;
            let message = Message::new(Severity::Warn, "no such file(s).");
            assert!(!handler.output_info("ok").await.unwrap().is_handled());
            assert!(!handler.output_text("text").await.unwrap().is_handled());
            assert!(!handler.output_binary(&Bytes::from_static(b"\0")).await.unwrap().is_cancel());
            assert!(!handler.output_message(&message).await.unwrap().is_handled());
        });
    }

    #[test]
    fn test_handler_error_conversion() {
        let err: P4Error = HandlerError::generic("boom").into();
        assert_eq!(err.kind, ErrorKind::Callback);
        assert_eq!(err.message, "Handler error: boom");

        let err: P4Error = HandlerError::InvalidInput {
            details: "x".into(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Input);
    }

    #[test]
    fn test_registry() {
        let mut registry = HandlerRegistry::new();
        assert!(!registry.has_output_handler());
        registry.set_output_handler(Arc::new(ReportHandler));
        registry.set_sso_handler(Arc::new(DefaultSsoHandler));
        assert!(registry.has_output_handler());
        assert!(registry.has_sso_handler());
        assert!(registry.clear_output_handler().is_some());
        assert!(!registry.has_output_handler());
    }
}
