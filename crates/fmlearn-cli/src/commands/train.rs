//! Train command.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use fmlearn_training::{evaluate, incremental_eval, resolve_paths, train_parallel};
use tracing::info;

use super::{ModelArg, Session};

/// Train a model on the configured `train_list`.
///
/// After training the model is optionally saved, evaluated on
/// `predict_list`, and then run through every `eval_list` group
/// (incremental train-then-test).
///
/// # Example
///
/// ```bash
/// fmlearn train --conf conf/lr.json --parallel 8 --save lr.model
/// ```
#[derive(Args, Debug, Clone)]
pub struct TrainCommand {
    /// Training configuration (JSON)
    #[arg(long, short = 'c', env = "FMLEARN_CONF")]
    pub conf: PathBuf,

    /// Model family; defaults to the `model` field of the config
    #[arg(long, short = 'm', value_enum)]
    pub model: Option<ModelArg>,

    /// Number of parser/trainer threads
    #[arg(long, short = 'p', default_value = "1")]
    pub parallel: usize,

    /// Save the trained model to this file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Load a model from this file before training
    #[arg(long)]
    pub load: Option<PathBuf>,

    /// Write evaluation results to this file as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl TrainCommand {
    pub fn run(&self) -> Result<()> {
        let Session {
            config,
            engine,
            loader,
        } = Session::open(&self.conf, self.model, self.load.as_deref())?;
        let engine = engine.as_ref();

        let train_paths =
            resolve_paths(&config.train_list).context("Failed to resolve train_list")?;
        engine.set_eval_mode(false);

        let started = Instant::now();
        let mut trained = 0u64;
        for path in &train_paths {
            trained += train_parallel(engine, &loader, self.parallel, path)
                .with_context(|| format!("Failed to train on {}", path.display()))?;
        }
        info!(
            files = train_paths.len(),
            instances = trained,
            params = engine.store().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Training finished"
        );

        if let Some(path) = &self.save {
            engine
                .save(path)
                .with_context(|| format!("Failed to save model {}", path.display()))?;
        }

        let eval = if config.predict_list.is_empty() {
            None
        } else {
            let paths =
                resolve_paths(&config.predict_list).context("Failed to resolve predict_list")?;
            evaluate(engine, &loader, self.parallel, &paths).context("Evaluation failed")?
        };

        let incremental = if config.eval_list.is_empty() {
            None
        } else {
            incremental_eval(engine, &loader, self.parallel, &config.eval_list)
                .context("Incremental evaluation failed")?
        };

        if let Some(path) = &self.report {
            let report = serde_json::json!({
                "trained": trained,
                "eval": eval,
                "incremental": incremental,
            });
            fs::write(path, serde_json::to_string_pretty(&report)?)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            info!(path = %path.display(), "Wrote evaluation report");
        }
        Ok(())
    }
}
