//! Error types for parameter store operations.

use std::path::PathBuf;

use fmlearn_core::{Fid, SlotId};
use fmlearn_optimizer::OptimizerError;
use thiserror::Error;

/// Errors that can occur during parameter store operations.
#[derive(Error, Debug)]
pub enum HashTableError {
    /// An update touched an id that was never initialised.
    #[error("parameter not found: id {id} slot {slot}")]
    IdNotFound {
        /// The id that was not found.
        id: Fid,
        /// Slot reported by the caller.
        slot: SlotId,
    },

    /// The embedding dimension doesn't match the store configuration.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected embedding dimension.
        expected: usize,
        /// Actual embedding dimension provided.
        actual: usize,
    },

    /// The optimizer rejected an update.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// Reading or writing a model file failed.
    #[error("io error on {path}: {source}")]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A model file line that must be well formed was not.
    #[error("malformed model file {path} at line {line}: {message}")]
    Format {
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        message: String,
    },
}

/// A specialized Result type for parameter store operations.
pub type Result<T> = std::result::Result<T, HashTableError>;

impl HashTableError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HashTableError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HashTableError::IdNotFound { id: 42, slot: 7 };
        assert_eq!(err.to_string(), "parameter not found: id 42 slot 7");

        let err = HashTableError::DimensionMismatch {
            expected: 8,
            actual: 4,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 8, got 4");

        let err = HashTableError::Format {
            path: PathBuf::from("model.txt"),
            line: 2,
            message: "bad bias".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed model file model.txt at line 2: bad bias"
        );
    }
}
