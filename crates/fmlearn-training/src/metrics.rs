//! Offline evaluation metrics over prediction results.

use fmlearn_core::{Fid, PredictResult};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

const LOG_LOSS_EPS: f64 = 1e-9;

/// Metrics of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    /// Number of scored samples.
    pub count: usize,
    /// Area under the ROC curve; `None` when only one label class was seen.
    pub auc: Option<f64>,
    /// Per-user AUC weighted by group size.
    pub gauc: Option<f64>,
    pub log_loss: f64,
}

impl EvalReport {
    /// Computes every metric; `results` are reordered by score.
    pub fn from_results(results: &mut [PredictResult]) -> Self {
        Self {
            count: results.len(),
            gauc: group_auc(results),
            log_loss: log_loss(results),
            auc: auc(results),
        }
    }
}

/// Weighted mean and standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std: f64,
}

/// Rank-sum AUC. Tied scores share their mean rank. Sorts `results` by score.
///
/// Returns `None` unless both positive and negative labels are present.
///
/// ```
/// use fmlearn_core::PredictResult;
/// use fmlearn_training::metrics::auc;
///
/// let mut results = vec![
///     PredictResult::new(1, 0.9, 0),
///     PredictResult::new(0, 0.2, 0),
///     PredictResult::new(1, 0.4, 0),
///     PredictResult::new(0, 0.6, 0),
/// ];
/// assert_eq!(auc(&mut results), Some(0.75));
/// ```
pub fn auc(results: &mut [PredictResult]) -> Option<f64> {
    results.sort_by(|a, b| a.score.total_cmp(&b.score));

    let mut positives = 0u64;
    let mut negatives = 0u64;
    let mut rank_sum = 0.0f64;
    let mut start = 0usize;
    while start < results.len() {
        let mut end = start;
        let mut group_positives = 0u64;
        while end < results.len() && results[end].score == results[start].score {
            if results[end].label > 0 {
                group_positives += 1;
            }
            end += 1;
        }
        // Ranks start + 1 ..= end share their mean.
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        rank_sum += group_positives as f64 * mean_rank;
        positives += group_positives;
        negatives += (end - start) as u64 - group_positives;
        start = end;
    }

    if positives == 0 || negatives == 0 {
        return None;
    }
    let p = positives as f64;
    Some((rank_sum - p * (p + 1.0) / 2.0) / p / negatives as f64)
}

/// AUC computed per `user_id` and averaged with group sizes as weights.
/// Groups holding a single label class are skipped; `None` if none remain.
pub fn group_auc(results: &[PredictResult]) -> Option<f64> {
    let mut groups: HashMap<Fid, Vec<PredictResult>> = HashMap::new();
    for r in results {
        groups.entry(r.user_id).or_default().push(*r);
    }

    let mut sum = 0.0;
    let mut weight = 0.0;
    for group in groups.values_mut() {
        if let Some(value) = auc(group) {
            sum += value * group.len() as f64;
            weight += group.len() as f64;
        }
    }
    (weight > 0.0).then(|| sum / weight)
}

/// Mean binary cross entropy with scores clipped to `[1e-9, 1 - 1e-9]`.
/// Zero for an empty slice.
pub fn log_loss(results: &[PredictResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let total: f64 = results
        .iter()
        .map(|r| {
            let p = f64::from(r.score).clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS);
            if r.label > 0 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / results.len() as f64
}

/// Weighted mean and population standard deviation of `values`. Without
/// weights every value counts once.
///
/// Returns `None` when there are no values or the weights sum to zero.
pub fn weighted_mean_std(values: &[f64], weights: Option<&[f64]>) -> Option<MeanStd> {
    let weight_of = |i: usize| weights.map_or(1.0, |w| w.get(i).copied().unwrap_or(0.0));

    let mut total = 0.0;
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        total += weight_of(i);
        sum += v * weight_of(i);
    }
    if total <= 0.0 {
        return None;
    }
    let mean = sum / total;
    let var = values
        .iter()
        .enumerate()
        .map(|(i, v)| (v - mean) * (v - mean) * weight_of(i))
        .sum::<f64>()
        / total;
    Some(MeanStd {
        mean,
        std: var.sqrt(),
    })
}
