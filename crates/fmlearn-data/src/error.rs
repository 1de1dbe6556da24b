//! Error types for the data crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum DataError {
    /// Reading or opening a data file failed.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The loader is still streaming another file.
    #[error("data loader is busy reading another file")]
    Busy,

    /// A pipeline thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Push on a closed queue.
    #[error("queue closed")]
    Closed,
}

/// Result type alias for data operations.
pub type Result<T> = std::result::Result<T, DataError>;
