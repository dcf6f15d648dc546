//! Core types for the CAN network codec library
//!
//! This module defines the shared error type raised while loading a network
//! description, and the timestamp type used by the live monitor.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Timestamp type used throughout the monitor
pub type Timestamp = DateTime<Utc>;

/// Result type for network loading operations
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors that can occur while loading or freezing a network description
///
/// All of these are load-time errors: they are reported before any monitor or
/// dispatcher state is built from the description.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported network schema version: {0}")]
    UnsupportedVersion(u32),

    #[error("Frozen network {path:?} contains an include of {file:?}")]
    FrozenInclude { path: PathBuf, file: PathBuf },

    #[error("Include cycle detected at {0:?}")]
    IncludeCycle(PathBuf),

    #[error("Duplicate message id: 0x{0:02X}")]
    DuplicateMessageId(u8),

    #[error("Duplicate message name: {0}")]
    DuplicateMessageName(String),

    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    #[error("Duplicate enum: {0}")]
    DuplicateEnum(String),

    #[error("Duplicate node instance id: 0x{0:02X}")]
    DuplicateInstanceId(u8),

    #[error("Duplicate node instance name: {0}")]
    DuplicateInstanceName(String),

    #[error("Node '{node}' references undefined message '{message}'")]
    UnknownMessage { node: String, message: String },

    #[error("Node instance '{instance}' references undefined node '{node}'")]
    UnknownNode { instance: String, node: String },

    #[error("Message '{message}' has priority 0x{priority:X}, which does not fit 4 bits")]
    InvalidPriority { message: String, priority: u8 },

    #[error("Invalid signal definition: {0}")]
    InvalidSignalDefinition(String),
}

impl NetworkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NetworkError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        NetworkError::Json {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = NetworkError::UnknownMessage {
            node: "Motor".to_string(),
            message: "Speed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Node 'Motor' references undefined message 'Speed'"
        );

        assert_eq!(
            NetworkError::DuplicateMessageId(0x1F).to_string(),
            "Duplicate message id: 0x1F"
        );
    }
}
