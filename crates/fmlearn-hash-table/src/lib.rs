//! Concurrent parameter storage for fmlearn.
//!
//! This crate holds the only shared mutable state of a training run: the
//! map from feature id to learned [`Parameter`](fmlearn_core::Parameter).
//!
//! # Overview
//!
//! The main components are:
//!
//! - [`ParameterStore`] - A sharded, mutex-protected map with lazy
//!   initialisation, optimizer-driven updates and text persistence
//! - [`FrequencyFilter`] - A sharded occurrence counter that holds back rare
//!   features
//! - [`CountMinSketch`] - The bounded-memory counter behind the sketch
//!   filter variant
//!
//! # Example
//!
//! ```
//! use fmlearn_core::{OptimConfig, OptimizerKind};
//! use fmlearn_hash_table::ParameterStore;
//! use fmlearn_optimizer::{create_optimizer, OptimizerConfig};
//!
//! let store = ParameterStore::new(61, 4);
//! let optimizer = create_optimizer(OptimizerConfig::from_optim(
//!     OptimizerKind::Ftrl,
//!     &OptimConfig::default(),
//! ));
//!
//! let weight = store.get_weight(42, 1, "user_42", true);
//! assert_eq!(weight.vec_w.len(), 4);
//! store.update(42, 1, 1, -0.5, optimizer.as_ref()).unwrap();
//! assert_eq!(store.get(42, 1, false).unwrap().show, 1);
//! ```

mod error;
mod filter;
mod persist;
mod sketch;
mod store;

pub use error::{HashTableError, Result};
pub use filter::{FrequencyFilter, DEFAULT_FILTER_SHARDS};
pub use persist::{format_vec, parse_vec};
pub use sketch::CountMinSketch;
pub use store::{ParameterStore, DEFAULT_SHARD_COUNT};
