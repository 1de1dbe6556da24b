//! Error types for the fmlearn core library.
//!
//! Covers the failures that can happen before any training starts: reading
//! and validating the training configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::fid::SlotId;

/// The main error type for fmlearn-core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A configured slot id is outside the range the feature codec can pack.
    #[error("Invalid slot ID: {slot_id} (maximum is {max})")]
    InvalidSlotId {
        /// The offending slot id.
        slot_id: SlotId,
        /// The largest slot id accepted.
        max: SlotId,
    },

    /// Error during configuration validation.
    #[error("Configuration error: {message}")]
    Config {
        /// A description of the configuration error.
        message: String,
    },

    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path of the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`crate::config::TrainConfig`].
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for fmlearn-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidSlotId {
            slot_id: 1200,
            max: 999,
        };
        assert_eq!(err.to_string(), "Invalid slot ID: 1200 (maximum is 999)");

        let err = CoreError::Config {
            message: "shard_count must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Configuration error: shard_count must be positive"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: CoreError = parse.unwrap_err().into();
        assert!(matches!(err, CoreError::Json(_)));
    }
}
