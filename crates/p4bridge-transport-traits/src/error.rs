//! Transport error types.

use p4bridge_protocol::{ErrorKind, P4Error};
use thiserror::Error;

/// A specialized `Result` type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Represents errors the external command engine can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// Failed to establish a connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// An established connection was lost.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The engine was asked to run a command before `init`.
    #[error("Not connected")]
    NotConnected,

    /// The engine aborted a command because the liveness check went false.
    #[error("Command aborted")]
    Aborted,

    /// A protocol-level error occurred.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The transport was configured with invalid parameters.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An underlying I/O error occurred.
    #[error("IO error: {0}")]
    Io(String),

    /// An unexpected internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<TransportError> for P4Error {
    fn from(err: TransportError) -> Self {
        let kind = match err {
            TransportError::NotConnected => ErrorKind::State,
            TransportError::ProtocolError(_) => ErrorKind::Protocol,
            TransportError::ConfigurationError(_) => ErrorKind::Configuration,
            _ => ErrorKind::Transport,
        };
        P4Error::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_p4_error() {
        let err: P4Error = TransportError::ConnectionFailed("perforce:1666".into()).into();
        assert_eq!(err.kind, ErrorKind::Transport);
        assert_eq!(err.message, "Connection failed: perforce:1666");

        let err: P4Error = TransportError::NotConnected.into();
        assert_eq!(err.kind, ErrorKind::State);
    }
}
