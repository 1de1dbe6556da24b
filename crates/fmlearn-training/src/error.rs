//! Error types for the training runner.

use std::path::PathBuf;

use fmlearn_data::DataError;
use fmlearn_model::ModelError;
use thiserror::Error;

/// Errors surfaced by the runner.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// A path pattern is not valid glob syntax.
    #[error("Invalid path pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// A path pattern matched no file.
    #[error("No file matches {pattern:?}")]
    NoMatch { pattern: String },

    /// A matched file cannot be read.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result type alias for runner operations.
pub type Result<T> = std::result::Result<T, TrainingError>;
