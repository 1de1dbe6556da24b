//! Online click models for fmlearn.
//!
//! Three model families share the [`Engine`] interface:
//!
//! - [`LogisticRegression`] - bias plus one weight per feature, with a
//!   frequency filter in front of new features
//! - [`FactorizationMachine`] - adds a pairwise embedding interaction
//! - [`FieldAwareFactorizationMachine`] - embeddings specialised per field
//!
//! Engines are `Send + Sync` and meant to be shared across training threads
//! behind an `Arc`.
//!
//! # Example
//!
//! ```
//! use fmlearn_core::{Feature, Instance, ModelConfig, ModelKind};
//! use fmlearn_model::create_model;
//!
//! let model = create_model(ModelKind::Lr, &ModelConfig::default()).unwrap();
//!
//! let mut ins = Instance::new(1);
//! ins.features.push(Feature::new(101, 7, "user_7"));
//! let mut batch = vec![ins];
//!
//! model.train(&mut batch).unwrap();
//! let scores = model.predict(&batch).unwrap();
//! assert!(scores[0].score > 0.5);
//! ```

mod engine;
mod error;
mod ffm;
mod field;
mod fm;
mod lr;

pub use engine::Engine;
pub use error::{ModelError, Result};
pub use ffm::FieldAwareFactorizationMachine;
pub use field::FieldLayout;
pub use fm::FactorizationMachine;
pub use lr::LogisticRegression;

use fmlearn_core::{ModelConfig, ModelKind};
use tracing::info;

/// Builds the engine for `kind`.
///
/// # Errors
///
/// Only the FFM engine can fail, when its feature list is not a valid
/// [`FieldLayout`].
pub fn create_model(kind: ModelKind, config: &ModelConfig) -> Result<Box<dyn Engine>> {
    info!(
        model = %kind,
        optimizer = ?config.optimizer,
        emb_size = config.optim.emb_size,
        shards = config.shard_count,
        "Creating model"
    );
    Ok(match kind {
        ModelKind::Lr => Box::new(LogisticRegression::new(config)),
        ModelKind::Fm => Box::new(FactorizationMachine::new(config)),
        ModelKind::Ffm => Box::new(FieldAwareFactorizationMachine::new(config)?),
    })
}
