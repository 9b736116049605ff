//! Closed status enums exchanged with the transport engine during
//! interactive callbacks.

use serde::{Deserialize, Serialize};

/// Outcome of a resolve, and the automatic-resolve recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MergeStatus {
    /// Stop resolving
    Quit = 0,
    /// Leave the file unresolved
    Skip = 1,
    /// Accept the merged result
    Merged = 2,
    /// Accept the edited result
    Edit = 3,
    /// Accept their revision
    Theirs = 4,
    /// Accept your revision
    Yours = 5,
}

impl MergeStatus {
    /// All statuses, in wire order
    pub const ALL: [Self; 6] = [
        Self::Quit,
        Self::Skip,
        Self::Merged,
        Self::Edit,
        Self::Theirs,
        Self::Yours,
    ];

    /// Short hint code shown to an interactive resolver
    #[must_use]
    pub const fn hint(self) -> &'static str {
        match self {
            Self::Quit => "q",
            Self::Skip => "s",
            Self::Merged => "am",
            Self::Edit => "e",
            Self::Yours => "ay",
            Self::Theirs => "at",
        }
    }

    /// Map a resolver's reply to a status
    ///
    /// Accepted replies are `ay`, `at`, `am`, `ae`, `s` and `q`.
    #[must_use]
    pub fn from_reply(reply: &str) -> Option<Self> {
        Some(match reply {
            "ay" => Self::Yours,
            "at" => Self::Theirs,
            "am" => Self::Merged,
            "ae" => Self::Edit,
            "s" => Self::Skip,
            "q" => Self::Quit,
            _ => return None,
        })
    }

    /// Wire code
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Result of a single-sign-on authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SsoStatus {
    /// Succeeded; the result is an authentication token
    Pass = 0,
    /// Failed; the result is logged as an error message
    Fail = 1,
    /// The client has no SSO support
    Unset = 2,
    /// Stop and re-invoke once variables have been captured
    Exit = 3,
    /// Fall back to default behavior
    Skip = 4,
}

impl SsoStatus {
    /// Decode a status code, rejecting anything outside the enum
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Self::Pass,
            1 => Self::Fail,
            2 => Self::Unset,
            3 => Self::Exit,
            4 => Self::Skip,
            _ => return None,
        })
    }

    /// Wire code
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// How a progress indicator finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProgressDone {
    /// Still running
    Normal = 0,
    /// Completed
    Done = 1,
    /// Completed with a failure
    FailDone = 2,
    /// Flushed without completing
    Flush = 3,
}

impl ProgressDone {
    /// Decode a wire code; unknown codes read as a failure
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Normal,
            1 => Self::Done,
            3 => Self::Flush,
            _ => Self::FailDone,
        }
    }

    /// Wire code
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_hints_and_replies() {
        assert_eq!(MergeStatus::Edit.hint(), "e");
        assert_eq!(MergeStatus::from_reply("ae"), Some(MergeStatus::Edit));
        assert_eq!(MergeStatus::from_reply("e"), None);
        for status in MergeStatus::ALL {
            assert_eq!(MergeStatus::ALL[status.code() as usize], status);
        }
    }

    #[test]
    fn test_sso_codes() {
        assert_eq!(SsoStatus::from_code(3), Some(SsoStatus::Exit));
        assert_eq!(SsoStatus::from_code(5), None);
        assert_eq!(SsoStatus::from_code(-1), None);
        assert_eq!(SsoStatus::Skip.code(), 4);
    }

    #[test]
    fn test_progress_done_codes() {
        assert_eq!(ProgressDone::from_code(2), ProgressDone::FailDone);
        assert_eq!(ProgressDone::from_code(3).code(), 3);
    }
}
