//! Factorization machine.
//!
//! Every feature has a scalar weight `w_i` and an embedding `v_i`. Pairwise
//! interactions are computed in linear time from the sum of embeddings:
//!
//! ```text
//! z = bias + sum_i (w_i - |v_i|^2 / 2) + |sum_i v_i|^2 / 2
//! p = sigmoid(z)
//! ```
//!
//! The gradient of `z` with respect to `v_i` is `sum_j v_j - v_i`.

use std::path::Path;

use fmlearn_core::fid::BIAS_FID;
use fmlearn_core::math::{add_assign, sigmoid, squared_norm};
use fmlearn_core::{FeatureConfig, Instance, ModelConfig, ModelKind, PredictResult, Weight};
use fmlearn_hash_table::ParameterStore;
use fmlearn_optimizer::{create_optimizer, OptimizerConfig, OptimizerDyn};

use crate::engine::{log_update_error, model_header, output_gradient, Engine, EvalFlag};
use crate::error::{ModelError, Result};

/// Factorization machine engine.
pub struct FactorizationMachine {
    store: ParameterStore,
    optimizer: Box<dyn OptimizerDyn>,
    emb_size: usize,
    features: Vec<FeatureConfig>,
    eval: EvalFlag,
}

/// Scoring intermediate kept for the backward pass.
struct Forward {
    p: f32,
    sum: Vec<f32>,
    weights: Vec<Weight>,
}

impl FactorizationMachine {
    pub fn new(config: &ModelConfig) -> Self {
        let emb_size = config.optim.emb_size;
        Self {
            store: ParameterStore::with_seed(config.shard_count, emb_size, config.seed),
            optimizer: create_optimizer(OptimizerConfig::from_optim(
                config.optimizer,
                &config.optim,
            )),
            emb_size,
            features: config.features.clone(),
            eval: EvalFlag::default(),
        }
    }

    fn forward(&self, ins: &Instance, init_if_missing: bool) -> Forward {
        let mut z = self.store.get_weight(BIAS_FID, 0, "", false).w;
        let mut sum = vec![0.0f32; self.emb_size];
        let mut weights = Vec::with_capacity(ins.features.len());
        for feature in &ins.features {
            let weight =
                self.store
                    .get_weight(feature.id, feature.slot, &feature.text, init_if_missing);
            z += weight.w - squared_norm(&weight.vec_w) / 2.0;
            add_assign(&mut sum, &weight.vec_w);
            weights.push(weight);
        }
        z += squared_norm(&sum) / 2.0;
        Forward {
            p: sigmoid(z),
            sum,
            weights,
        }
    }

    fn train_one(&self, ins: &Instance) {
        let Forward { p, sum, weights } = self.forward(ins, true);
        let grad = output_gradient(p, ins.label);
        let optimizer = self.optimizer.as_ref();

        log_update_error(self.store.update(BIAS_FID, 0, ins.label, grad, optimizer));
        for (feature, weight) in ins.features.iter().zip(weights) {
            let grad_vec: Vec<f32> = sum
                .iter()
                .zip(&weight.vec_w)
                .map(|(s, v)| grad * (s - v))
                .collect();
            log_update_error(self.store.update_weight_and_embedding(
                feature.id,
                feature.slot,
                ins.label,
                grad,
                &grad_vec,
                optimizer,
            ));
        }
    }
}

impl Engine for FactorizationMachine {
    fn kind(&self) -> ModelKind {
        ModelKind::Fm
    }

    fn train(&self, instances: &mut [Instance]) -> Result<()> {
        if self.eval.get() {
            return Err(ModelError::EvalMode);
        }
        for ins in instances.iter() {
            self.train_one(ins);
        }
        Ok(())
    }

    fn predict(&self, instances: &[Instance]) -> Result<Vec<PredictResult>> {
        Ok(instances
            .iter()
            .map(|ins| PredictResult::new(ins.label, self.forward(ins, false).p, ins.user_id))
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
            .persist(path, &model_header(self.emb_size, 0, &self.features))?;
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
