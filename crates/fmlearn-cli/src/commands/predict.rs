//! Predict command.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use fmlearn_training::{predict_parallel, resolve_paths, EvalReport};
use tracing::info;

use super::{ModelArg, Session};

/// Score every sample of the configured `predict_list`.
///
/// Writes one `label<TAB>score<TAB>user_id` row per sample.
#[derive(Args, Debug, Clone)]
pub struct PredictCommand {
    /// Training configuration (JSON)
    #[arg(long, short = 'c', env = "FMLEARN_CONF")]
    pub conf: PathBuf,

    /// Saved model to score with
    #[arg(long)]
    pub load: PathBuf,

    /// Model family; defaults to the `model` field of the config
    #[arg(long, short = 'm', value_enum)]
    pub model: Option<ModelArg>,

    /// Number of parser/scorer threads
    #[arg(long, short = 'p', default_value = "1")]
    pub parallel: usize,

    /// Output file for the scores
    #[arg(long, short = 'o')]
    pub output: PathBuf,
}

impl PredictCommand {
    pub fn run(&self) -> Result<()> {
        let Session {
            config,
            engine,
            loader,
        } = Session::open(&self.conf, self.model, Some(&self.load))?;
        engine.set_eval_mode(true);

        let paths =
            resolve_paths(&config.predict_list).context("Failed to resolve predict_list")?;
        let mut results = Vec::new();
        for path in &paths {
            results.extend(
                predict_parallel(engine.as_ref(), &loader, self.parallel, path)
                    .with_context(|| format!("Failed to predict {}", path.display()))?,
            );
        }

        let file = File::create(&self.output)
            .with_context(|| format!("Failed to create {}", self.output.display()))?;
        let mut out = BufWriter::new(file);
        for r in &results {
            writeln!(out, "{}\t{}\t{}", r.label, r.score, r.user_id)?;
        }
        out.flush()
            .with_context(|| format!("Failed to write {}", self.output.display()))?;

        let report = EvalReport::from_results(&mut results);
        info!(
            output = %self.output.display(),
            count = report.count,
            auc = ?report.auc,
            "Wrote predictions"
        );
        Ok(())
    }
}
