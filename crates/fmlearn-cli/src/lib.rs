//! Command-line interface for fmlearn.
//!
//! ```bash
//! # Train an FFM model on the configured files and save it
//! fmlearn train --conf conf/ffm.json --model ffm --parallel 8 --save model.txt
//!
//! # Score the predict list with a saved model
//! fmlearn predict --conf conf/ffm.json --model ffm --load model.txt --output scores.tsv
//! ```
//!
//! Logging goes through `tracing`; set `RUST_LOG` (e.g. `RUST_LOG=debug`) to
//! change the level.

pub mod commands;

use clap::{Parser, Subcommand};

pub use commands::{ModelArg, PredictCommand, TrainCommand};

/// fmlearn - online LR / FM / FFM click models
#[derive(Parser, Debug)]
#[command(name = "fmlearn")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train on the configured files, then evaluate
    Train(TrainCommand),

    /// Score the predict list with a saved model
    Predict(PredictCommand),
}
