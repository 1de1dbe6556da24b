//! Error types for the fmlearn-model crate.

use fmlearn_core::SlotId;
use fmlearn_hash_table::HashTableError;
use thiserror::Error;

/// Error type for engine operations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The feature list cannot be turned into an FFM field layout.
    #[error("Invalid field config: {message}")]
    FieldConfig {
        /// Description of the inconsistency.
        message: String,
    },

    /// A slot is configured more than once.
    #[error("Duplicate slot in feature list: {slot}")]
    DuplicateSlot {
        /// The repeated slot id.
        slot: SlotId,
    },

    /// Training was requested while the engine is in evaluation mode.
    #[error("engine is in eval mode, training is disabled")]
    EvalMode,

    /// Saving or loading the parameter store failed.
    #[error(transparent)]
    Store(#[from] HashTableError),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ModelError>;
