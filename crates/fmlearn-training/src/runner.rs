//! Multi-threaded training, prediction and evaluation over sample files.
//!
//! Each call streams one file through [`DataLoader::parallel_iter`], so a
//! reader and `workers` parser threads feed parsed batches to `workers`
//! scoped threads that drive the shared [`Engine`]. The batch queue closes
//! when the call returns or unwinds, which stops the upstream stages.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use fmlearn_core::{EvalGroup, PredictResult};
use fmlearn_data::DataLoader;
use fmlearn_model::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::Result;
use crate::metrics::{weighted_mean_std, EvalReport, MeanStd};
use crate::paths::resolve_paths;

/// Outcome of an incremental evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalSummary {
    /// Report of every group that had test samples, in order.
    pub groups: Vec<EvalReport>,
    /// Sample-weighted statistics over the groups.
    pub auc: Option<MeanStd>,
    pub gauc: Option<MeanStd>,
    pub log_loss: Option<MeanStd>,
}

impl EvalSummary {
    fn from_reports(groups: Vec<EvalReport>) -> Self {
        let stat = |pick: fn(&EvalReport) -> Option<f64>| {
            let (values, weights): (Vec<f64>, Vec<f64>) = groups
                .iter()
                .filter_map(|r| pick(r).map(|v| (v, r.count as f64)))
                .unzip();
            weighted_mean_std(&values, Some(&weights))
        };
        Self {
            auc: stat(|r| r.auc),
            gauc: stat(|r| r.gauc),
            log_loss: stat(|r| Some(r.log_loss)),
            groups,
        }
    }
}

/// Trains `engine` on every well-formed line of `path`.
///
/// Returns the number of instances trained. Batches the engine rejects are
/// logged and skipped.
///
/// # Errors
///
/// Fails only when the file cannot be read (see [`DataLoader::parallel_iter`]).
pub fn train_parallel(
    engine: &dyn Engine,
    loader: &DataLoader,
    workers: usize,
    path: &Path,
) -> Result<u64> {
    let workers = workers.max(1);
    let started = Instant::now();
    let batches = loader.parallel_iter(path, workers)?;
    let batches = &batches;

    let trained: u64 = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                s.spawn(move || {
                    debug!(worker, "Train worker started");
                    let mut trained = 0u64;
                    while let Some(mut instances) = batches.pop() {
                        match engine.train(&mut instances) {
                            Ok(()) => trained += instances.len() as u64,
                            Err(e) => error!(worker, "train batch failed: {e}"),
                        }
                    }
                    trained
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| join_or_default(h, "train"))
            .sum()
    });

    info!(
        path = %path.display(),
        instances = trained,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Trained file"
    );
    Ok(trained)
}

/// Scores every well-formed line of `path`. Result order is unspecified.
///
/// # Errors
///
/// Fails only when the file cannot be read.
pub fn predict_parallel(
    engine: &dyn Engine,
    loader: &DataLoader,
    workers: usize,
    path: &Path,
) -> Result<Vec<PredictResult>> {
    let workers = workers.max(1);
    let batches = loader.parallel_iter(path, workers)?;
    let batches = &batches;

    let results = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                s.spawn(move || {
                    let mut results = Vec::new();
                    while let Some(instances) = batches.pop() {
                        match engine.predict(&instances) {
                            Ok(scores) => results.extend(scores),
                            Err(e) => error!(worker, "predict batch failed: {e}"),
                        }
                    }
                    results
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| join_or_default(h, "predict"))
            .collect::<Vec<_>>()
    });

    info!(path = %path.display(), count = results.len(), "Predicted file");
    Ok(results)
}

fn join_or_default<T: Default>(handle: thread::ScopedJoinHandle<'_, T>, kind: &str) -> T {
    handle.join().unwrap_or_else(|_| {
        error!(kind, "worker panicked");
        T::default()
    })
}

/// Puts `engine` in eval mode, scores `paths` and reports the metrics.
///
/// Returns `None` when the files hold no samples.
pub fn evaluate(
    engine: &dyn Engine,
    loader: &DataLoader,
    workers: usize,
    paths: &[PathBuf],
) -> Result<Option<EvalReport>> {
    engine.set_eval_mode(true);
    let mut results = Vec::new();
    for path in paths {
        results.extend(predict_parallel(engine, loader, workers, path)?);
    }
    if results.is_empty() {
        info!("No test samples");
        return Ok(None);
    }

    let report = EvalReport::from_results(&mut results);
    info!(
        count = report.count,
        auc = ?report.auc,
        gauc = ?report.gauc,
        log_loss = report.log_loss,
        "Evaluation finished"
    );
    Ok(Some(report))
}

/// Runs each group in turn: train on its `inc_train_list`, then evaluate on
/// its `inc_test_list`. The engine keeps learning across groups and is left
/// in training mode.
///
/// Returns `None` if no group produced test samples.
///
/// # Errors
///
/// Path resolution and file read failures abort the run.
pub fn incremental_eval(
    engine: &dyn Engine,
    loader: &DataLoader,
    workers: usize,
    groups: &[EvalGroup],
) -> Result<Option<EvalSummary>> {
    let mut reports = Vec::with_capacity(groups.len());
    for (index, group) in groups.iter().enumerate() {
        let train_paths = resolve_paths(&group.inc_train_list)?;
        let test_paths = resolve_paths(&group.inc_test_list)?;

        engine.set_eval_mode(false);
        let mut trained = 0;
        for path in &train_paths {
            trained += train_parallel(engine, loader, workers, path)?;
        }
        info!(group = index, trained, "Incremental training done");

        if let Some(report) = evaluate(engine, loader, workers, &test_paths)? {
            reports.push(report);
        }
    }
    engine.set_eval_mode(false);

    if reports.is_empty() {
        return Ok(None);
    }
    let summary = EvalSummary::from_reports(reports);
    info!(
        groups = summary.groups.len(),
        auc = ?summary.auc,
        gauc = ?summary.gauc,
        log_loss = ?summary.log_loss,
        "Incremental evaluation finished"
    );
    Ok(Some(summary))
}
