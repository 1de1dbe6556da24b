//! Training orchestration for fmlearn.
//!
//! - [`runner`]: parallel train / predict over files, evaluation and the
//!   incremental train-then-test loop
//! - [`metrics`]: AUC, group AUC, log loss and weighted summaries
//! - [`paths`]: glob expansion of configured file lists
//!
//! # Example
//!
//! ```no_run
//! use fmlearn_core::TrainConfig;
//! use fmlearn_data::{DataLoader, InstanceParser};
//! use fmlearn_model::create_model;
//! use fmlearn_training::{evaluate, resolve_paths, train_parallel};
//!
//! let config = TrainConfig::from_file("conf/train.json").unwrap();
//! let engine = create_model(config.model, &config.model_config()).unwrap();
//! let loader = DataLoader::with_batch_size(InstanceParser::from_config(&config), config.batch_size);
//!
//! for path in resolve_paths(&config.train_list).unwrap() {
//!     train_parallel(engine.as_ref(), &loader, 4, &path).unwrap();
//! }
//! let test = resolve_paths(&config.predict_list).unwrap();
//! if let Some(report) = evaluate(engine.as_ref(), &loader, 4, &test).unwrap() {
//!     println!("auc = {:?}", report.auc);
//! }
//! ```

pub mod error;
pub mod metrics;
pub mod paths;
pub mod runner;

pub use error::{Result, TrainingError};
pub use metrics::{EvalReport, MeanStd};
pub use paths::resolve_paths;
pub use runner::{evaluate, incremental_eval, predict_parallel, train_parallel, EvalSummary};
