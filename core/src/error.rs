//! Transport error taxonomy.
//!
//! Local, recoverable conditions (one oversize message, one malformed wire
//! property) are absorbed and reported per item; systemic conditions
//! (broker down, checkpoint store down, missing configuration) surface as
//! [`TransportError`] to the caller.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors surfaced by the transport to the dispatch runtime.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport was not configured completely. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The broker could not be reached or rejected the connection.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// A single message exceeds the broker's native batch capacity.
    #[error("Message of {size} bytes exceeds the batch capacity of {limit} bytes")]
    Oversize { size: usize, limit: usize },

    /// A wire property could not be translated.
    #[error("Mapping error on property '{key}': {reason}")]
    Mapping { key: String, reason: String },

    /// The checkpoint store could not be read or written.
    #[error("Checkpoint store error: {0}")]
    CheckpointStore(String),

    /// The event type is not present in the route table.
    #[error("Unknown event type: {0}")]
    UnknownEvent(String),

    /// The operation was cancelled before it could start.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type with the transport error.
pub type Result<T, E = TransportError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let error = TransportError::Connectivity("broker unreachable".to_string());
        assert!(error.to_string().contains("Connectivity"));

        let error = TransportError::Oversize { size: 2048, limit: 1024 };
        assert!(error.to_string().contains("2048"));
        assert!(error.to_string().contains("1024"));

        let error = TransportError::UnknownEvent("Ghost".to_string());
        assert!(error.to_string().contains("Ghost"));
    }
}
