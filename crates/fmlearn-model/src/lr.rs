//! Logistic regression with frequency filtering.
//!
//! ```text
//! p = sigmoid(bias + sum of w_i over admitted features)
//! ```
//!
//! During training a feature that is not yet in the model is only admitted
//! once the [`FrequencyFilter`] has seen it `filter_count` times. Its counter
//! is dropped as soon as the feature has a parameter.

use std::path::Path;

use fmlearn_core::fid::BIAS_FID;
use fmlearn_core::math::sigmoid;
use fmlearn_core::{FeatureConfig, Fid, Instance, ModelConfig, ModelKind, PredictResult};
use fmlearn_hash_table::{FrequencyFilter, ParameterStore};
use fmlearn_optimizer::{create_optimizer, OptimizerConfig, OptimizerDyn};

use crate::engine::{log_update_error, model_header, output_gradient, Engine, EvalFlag};
use crate::error::{ModelError, Result};

/// Logistic regression engine; its store holds scalar weights only.
pub struct LogisticRegression {
    store: ParameterStore,
    optimizer: Box<dyn OptimizerDyn>,
    filter: FrequencyFilter,
    filter_count: u64,
    features: Vec<FeatureConfig>,
    eval: EvalFlag,
}

impl LogisticRegression {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            store: ParameterStore::with_seed(config.shard_count, 0, config.seed),
            optimizer: create_optimizer(OptimizerConfig::from_optim(
                config.optimizer,
                &config.optim,
            )),
            filter: FrequencyFilter::new(config.filter_kind),
            filter_count: config.filter_count,
            features: config.features.clone(),
            eval: EvalFlag::default(),
        }
    }

    /// Marks features that are new to the model and not yet frequent enough.
    /// Features already in the store keep their current flag. Returns the
    /// ids that passed the filter on this call.
    fn apply_filter(&self, ins: &mut Instance) -> Vec<Fid> {
        let mut admitted = Vec::new();
        for feature in ins.features.iter_mut() {
            if self.store.contains(feature.id) {
                continue;
            }
            feature.filtered = !self.filter.count(feature.id, self.filter_count);
            if !feature.filtered && self.filter_count > 0 {
                admitted.push(feature.id);
            }
        }
        admitted
    }

    fn score(&self, ins: &Instance, init_if_missing: bool) -> f32 {
        let mut z = self.store.get_weight(BIAS_FID, 0, "", false).w;
        for feature in ins.features.iter().filter(|f| !f.filtered) {
            z += self
                .store
                .get_weight(feature.id, feature.slot, &feature.text, init_if_missing)
                .w;
        }
        sigmoid(z)
    }

    fn train_one(&self, ins: &mut Instance) {
        let admitted = self.apply_filter(ins);
        let grad = output_gradient(self.score(ins, true), ins.label);
        let optimizer = self.optimizer.as_ref();

        log_update_error(self.store.update(BIAS_FID, 0, ins.label, grad, optimizer));
        for feature in ins.features.iter().filter(|f| !f.filtered) {
            log_update_error(
                self.store
                    .update(feature.id, feature.slot, ins.label, grad, optimizer),
            );
        }
        for id in admitted {
            self.filter.forget(id);
        }
    }
}

impl Engine for LogisticRegression {
    fn kind(&self) -> ModelKind {
        ModelKind::Lr
    }

    fn train(&self, instances: &mut [Instance]) -> Result<()> {
        if self.eval.get() {
            return Err(ModelError::EvalMode);
        }
        for ins in instances.iter_mut() {
            self.train_one(ins);
        }
        Ok(())
    }

    fn predict(&self, instances: &[Instance]) -> Result<Vec<PredictResult>> {
        Ok(instances
            .iter()
            .map(|ins| PredictResult::new(ins.label, self.score(ins, false), ins.user_id))
            .collect())
    }

    fn set_eval_mode(&self, eval: bool) {
        self.eval.set(eval);
    }

    fn is_eval_mode(&self) -> bool {
        self.eval.get()
    }

    fn save(&self, path: &Path) -> Result<()> {
        self.store
            .persist(path, &model_header(0, 0, &self.features))?;
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<()> {
        self.store.restore(path)?;
        Ok(())
    }

    fn store(&self) -> &ParameterStore {
        &self.store
    }
}
