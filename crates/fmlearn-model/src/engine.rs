//! The engine interface shared by all model families.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use fmlearn_core::{FeatureConfig, Instance, ModelKind, PredictResult};
use fmlearn_hash_table::ParameterStore;
use tracing::error;

use crate::error::Result;

/// A trainable click model backed by a [`ParameterStore`].
///
/// All methods take `&self`: the store synchronises itself, so several
/// threads may train and predict on one engine at once. Within one call,
/// instances are processed in order and each instance sees the updates of
/// the ones before it.
pub trait Engine: Send + Sync {
    /// Model family of this engine.
    fn kind(&self) -> ModelKind;

    /// Runs one online update per instance.
    ///
    /// Missing parameters and size mismatches while updating are logged and
    /// skipped; they never abort the batch. The LR engine records its
    /// frequency-filter decision on each feature.
    ///
    /// # Errors
    ///
    /// [`ModelError::EvalMode`](crate::ModelError::EvalMode) when the engine
    /// is in eval mode.
    fn train(&self, instances: &mut [Instance]) -> Result<()>;

    /// Scores instances without creating parameters; unknown features
    /// contribute zero.
    fn predict(&self, instances: &[Instance]) -> Result<Vec<PredictResult>>;

    /// Turns evaluation mode on or off.
    fn set_eval_mode(&self, eval: bool);

    fn is_eval_mode(&self) -> bool;

    /// Writes the model to `path`.
    fn save(&self, path: &Path) -> Result<()>;

    /// Loads parameters from a file written by [`save`](Self::save).
    fn load(&self, path: &Path) -> Result<()>;

    /// The underlying parameter store.
    fn store(&self) -> &ParameterStore;
}

/// Output-layer gradient of the log loss: `p - 1` for clicks, `p` otherwise.
#[inline]
pub(crate) fn output_gradient(p: f32, label: i32) -> f32 {
    if label > 0 {
        p - 1.0
    } else {
        p
    }
}

/// First line of a saved model:
/// `"{emb_size}\t{num_fields}\t"` followed by tab separated `slot:field` pairs.
pub(crate) fn model_header(emb_size: usize, num_fields: usize, features: &[FeatureConfig]) -> String {
    let pairs: Vec<String> = features
        .iter()
        .map(|f| format!("{}:{}", f.slot_id, f.cross))
        .collect();
    format!("{emb_size}\t{num_fields}\t{}", pairs.join("\t"))
}

/// Logs a failed store update; the touch is skipped.
#[inline]
pub(crate) fn log_update_error<E: std::fmt::Display>(result: std::result::Result<(), E>) {
    if let Err(e) = result {
        error!("update parameter failed: {e}");
    }
}

/// Eval-mode flag shared by the engine implementations.
#[derive(Debug, Default)]
pub(crate) struct EvalFlag(AtomicBool);

impl EvalFlag {
    pub(crate) fn set(&self, eval: bool) {
        self.0.store(eval, Ordering::Relaxed);
    }

    pub(crate) fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
