//! Core types for fmlearn.
//!
//! This crate provides the foundational types shared by every other fmlearn
//! crate:
//!
//! - **Feature ID (Fid) utilities**: hashing a `(slot, text)` pair into a
//!   feature id whose slot can be recovered from the id alone.
//! - **Records**: [`Feature`], [`Instance`] and [`PredictResult`].
//! - **Learned state**: [`Parameter`] and its scoring snapshot [`Weight`].
//! - **Configuration**: the JSON training configuration and its validation.
//! - **Error types**: structured error handling with detailed context.
//!
//! # Example
//!
//! ```
//! use fmlearn_core::fid::{encode, extract_slot};
//! use fmlearn_core::{Feature, Instance};
//!
//! let fid = encode(101, "user_7");
//! assert_eq!(extract_slot(fid), 101);
//!
//! let mut ins = Instance::new(1);
//! ins.features.push(Feature::new(101, fid, "user_7"));
//! assert!(ins.is_positive());
//! ```
//!
//! # Modules
//!
//! - [`fid`]: Feature ID types and the feature codec.
//! - [`feature`]: Features, instances and prediction results.
//! - [`parameter`]: Per-feature learned state.
//! - [`config`]: Training configuration.
//! - [`math`]: Vector helpers used by the engines.
//! - [`error`]: Error types for the library.

pub mod config;
pub mod error;
pub mod feature;
pub mod fid;
pub mod math;
pub mod parameter;

pub use config::{
    EvalGroup, FeatureConfig, FilterKind, ModelConfig, ModelKind, OptimConfig, OptimizerKind,
    TrainConfig, VecType,
};
pub use error::{CoreError, Result};
pub use feature::{Feature, Instance, PredictResult};
pub use fid::{Fid, SlotId};
pub use parameter::{Parameter, Weight};
