//! Severity-classified diagnostic messages.
//!
//! Every diagnostic the server emits during a command is normalized into a
//! [`Message`]: a generic class, a [`Severity`], the formatted text, the
//! parameter dictionary it was rendered from and a unique message id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::wire::WireDict;

/// Severity of a server diagnostic
///
/// The numeric values match the server's wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Severity {
    /// Nothing yet
    Empty = 0,
    /// Something good happened
    Info = 1,
    /// Something not good happened
    Warn = 2,
    /// The user did something wrong
    Failed = 3,
    /// System broken; nothing can continue
    Fatal = 4,
}

impl Severity {
    /// Decode a wire severity; anything above the known range is fatal
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            i32::MIN..=0 => Self::Empty,
            1 => Self::Info,
            2 => Self::Warn,
            3 => Self::Failed,
            _ => Self::Fatal,
        }
    }

    /// Wire code of this severity
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Empty and informational messages are routed as ordinary output
    #[must_use]
    pub const fn is_informational(self) -> bool {
        matches!(self, Self::Empty | Self::Info)
    }

    /// Failed and fatal messages are routed as errors
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Failed | Self::Fatal)
    }
}

/// Generic class of a diagnostic
///
/// This is an open set on the wire, so it is a newtype over the raw code with
/// named constants for the classes the server documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generic(pub i32);

impl Generic {
    /// Miscellaneous
    pub const NONE: Self = Self(0x00);

    // The fault of the user
    /// Request not consistent with documentation
    pub const USAGE: Self = Self(0x01);
    /// Using an unknown entity
    pub const UNKNOWN: Self = Self(0x02);
    /// Using an entity in the wrong context
    pub const CONTEXT: Self = Self(0x03);
    /// Trying to do something you can't
    pub const ILLEGAL: Self = Self(0x04);
    /// Something must be corrected first
    pub const NOTYET: Self = Self(0x05);
    /// Protections prevented the operation
    pub const PROTECT: Self = Self(0x06);

    // No fault at all
    /// Action returned empty results
    pub const EMPTY: Self = Self(0x11);

    // Not the fault of the user
    /// Inexplicable program fault
    pub const FAULT: Self = Self(0x21);
    /// Client side program error
    pub const CLIENT: Self = Self(0x22);
    /// Server administrative action required
    pub const ADMIN: Self = Self(0x23);
    /// Client configuration inadequate
    pub const CONFIG: Self = Self(0x24);
    /// Client or server too old to interact
    pub const UPGRADE: Self = Self(0x25);
    /// Communications error
    pub const COMM: Self = Self(0x26);
    /// Too much data to handle
    pub const TOOBIG: Self = Self(0x27);
}

impl fmt::Display for Generic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A normalized server diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id
    pub id: u32,
    /// Severity, which decides routing
    pub severity: Severity,
    /// Generic class
    pub generic: Generic,
    /// Text rendered in plain format
    pub text: String,
    /// Parameters the text was rendered from
    #[serde(default, skip_serializing_if = "WireDict::is_empty")]
    pub dict: WireDict,
}

impl Message {
    /// Create a message with the given severity and text
    #[must_use]
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            id: 0,
            severity,
            generic: Generic::NONE,
            text: text.into(),
            dict: WireDict::new(),
        }
    }

    /// Set the generic class
    #[must_use]
    pub fn with_generic(mut self, generic: Generic) -> Self {
        self.generic = generic;
        self
    }

    /// Set the unique message id
    #[must_use]
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }

    /// Set the parameter dictionary
    #[must_use]
    pub fn with_dict(mut self, dict: WireDict) -> Self {
        self.dict = dict;
        self
    }

    /// Debug rendering: `[Gen:G/Sev:S]: text`
    #[must_use]
    pub fn inspect(&self) -> String {
        format!(
            "[Gen:{}/Sev:{}]: {}",
            self.generic,
            self.severity.code(),
            self.text
        )
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_codes() {
        assert_eq!(Severity::from_code(0), Severity::Empty);
        assert_eq!(Severity::from_code(2), Severity::Warn);
        assert_eq!(Severity::from_code(9), Severity::Fatal);
        assert_eq!(Severity::Failed.code(), 3);
        assert!(Severity::Info.is_informational());
        assert!(!Severity::Warn.is_error());
        assert!(Severity::Fatal.is_error());
    }

    #[test]
    fn test_inspect() {
        let msg = Message::new(Severity::Failed, "//depot/x - no such file(s).")
            .with_generic(Generic::EMPTY);
        assert_eq!(msg.inspect(), "[Gen:17/Sev:3]: //depot/x - no such file(s).");
        assert_eq!(msg.to_string(), "//depot/x - no such file(s).");
    }
}
