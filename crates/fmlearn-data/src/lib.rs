//! Sample ingestion for fmlearn.
//!
//! Files flow through three stages connected by [`BoundedQueue`]s:
//!
//! 1. a reader thread cuts the file into batches of raw lines,
//! 2. a pool of workers parses batches into [`Instance`](fmlearn_core::Instance)s,
//! 3. a joiner thread closes the output once every worker is done.
//!
//! Closing or dropping a [`Receiver`] stops the stages feeding it, and the
//! loader becomes free for the next file once its reader has stopped.
//!
//! # Example
//!
//! ```no_run
//! use fmlearn_core::TrainConfig;
//! use fmlearn_data::{DataLoader, InstanceParser};
//!
//! let config = TrainConfig::from_file("conf/train.json").unwrap();
//! let loader = DataLoader::with_batch_size(InstanceParser::from_config(&config), config.batch_size);
//!
//! let mut total = 0;
//! for batch in loader.parallel_iter("data/train.txt", 4).unwrap() {
//!     total += batch.len();
//! }
//! println!("{total} instances");
//! ```

mod error;
mod loader;
mod parser;
mod queue;

pub use error::{DataError, Result};
pub use loader::{DataLoader, LINE_QUEUE_CAPACITY};
pub use parser::InstanceParser;
pub use queue::{BoundedQueue, Receiver};
