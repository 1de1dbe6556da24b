//! Field-aware factorization machine.
//!
//! Each feature `a` in field `f_a` keeps one sub-vector `v_a[g]` per field
//! `g`. Two features interact through the sub-vectors aimed at each other's
//! field:
//!
//! ```text
//! z = bias + sum_a w_a + sum_{a < b} <v_a[f_b], v_b[f_a]>
//! ```
//!
//! Scoring runs in linear time. Summing every fielded feature's embedding
//! into block `S[f_a]` of a `F x F x emb_size` buffer gives
//!
//! ```text
//! cross pairs (f != g):  sum_{f < g} <S[f][g], S[g][f]>
//! same-field pairs:      sum_f (|S[f][f]|^2 - sum_{a in f} |v_a[f]|^2) / 2
//! ```
//!
//! and the gradient of `z` with respect to `v_a[g]` is `S[g][f_a]` for
//! `g != f_a` and `S[f_a][f_a] - v_a[f_a]` otherwise.
//!
//! # References
//!
//! - [Field-aware Factorization Machines for CTR Prediction](https://www.csie.ntu.edu.tw/~cjlin/papers/ffm.pdf)

use std::path::Path;

use fmlearn_core::fid::BIAS_FID;
use fmlearn_core::math::{dot, scale, sigmoid};
use fmlearn_core::{FeatureConfig, Instance, ModelConfig, ModelKind, PredictResult};
use fmlearn_hash_table::ParameterStore;
use fmlearn_optimizer::{create_optimizer, OptimizerConfig, OptimizerDyn};
use tracing::info;

use crate::engine::{log_update_error, model_header, output_gradient, Engine, EvalFlag};
use crate::error::{ModelError, Result};
use crate::field::FieldLayout;

/// Field-aware factorization machine engine.
pub struct FieldAwareFactorizationMachine {
    store: ParameterStore,
    optimizer: Box<dyn OptimizerDyn>,
    layout: FieldLayout,
    features: Vec<FeatureConfig>,
    eval: EvalFlag,
}

struct Forward {
    p: f32,
    /// Embedding gradient of `z` per feature; `None` for unfielded ones.
    grads: Vec<Option<Vec<f32>>>,
}

impl FieldAwareFactorizationMachine {
    /// # Errors
    ///
    /// Fails when the feature list is not a valid [`FieldLayout`].
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let layout = FieldLayout::new(&config.features, config.optim.emb_size)?;
        info!(
            num_fields = layout.num_fields(),
            full_size = layout.full_size(),
            "Initialized ffm field layout"
        );
        Ok(Self {
            store: ParameterStore::with_seed(config.shard_count, layout.full_size(), config.seed),
            optimizer: create_optimizer(OptimizerConfig::from_optim(
                config.optimizer,
                &config.optim,
            )),
            layout,
            features: config.features.clone(),
            eval: EvalFlag::default(),
        })
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    fn forward(&self, ins: &Instance, init_if_missing: bool, with_grads: bool) -> Forward {
        let layout = &self.layout;
        let emb = layout.emb_size();
        let num_fields = layout.num_fields();
        let full = layout.full_size();

        let mut sums = vec![0.0f32; full * num_fields];
        let mut norms = vec![0.0f32; full];
        let mut z_linear = self.store.get_weight(BIAS_FID, 0, "", false).w;
        let mut weights = Vec::with_capacity(ins.features.len());

        for feature in &ins.features {
            let weight =
                self.store
                    .get_weight(feature.id, feature.slot, &feature.text, init_if_missing);
            let field = layout.field(feature.slot);
            if field > 0 && weight.vec_w.len() == full {
                let f = field - 1;
                let start = layout.block(f, 0);
                for (s, v) in sums[start..start + full].iter_mut().zip(&weight.vec_w) {
                    *s += v;
                }
                let own = &weight.vec_w[f * emb..(f + 1) * emb];
                for (n, v) in norms[f * emb..(f + 1) * emb].iter_mut().zip(own) {
                    *n += v * v;
                }
            }
            z_linear += weight.w;
            weights.push((field, weight));
        }

        let mut fm_score = 0.0f32;
        let mut ffm_score = 0.0f32;
        for i in 0..num_fields {
            let diag = layout.block(i, i);
            for k in 0..emb {
                fm_score += sums[diag + k] * sums[diag + k] - norms[i * emb + k];
            }
            for j in (i + 1)..num_fields {
                let ij = layout.block(i, j);
                let ji = layout.block(j, i);
                ffm_score += dot(&sums[ij..ij + emb], &sums[ji..ji + emb]);
            }
        }
        let z = z_linear + (ffm_score + fm_score / 2.0);

        let grads = if with_grads {
            weights
                .iter()
                .map(|(field, weight)| {
                    (*field > 0 && weight.vec_w.len() == full)
                        .then(|| self.embedding_grad(*field, &sums, &weight.vec_w))
                })
                .collect()
        } else {
            Vec::new()
        };

        Forward {
            p: sigmoid(z),
            grads,
        }
    }

    /// Gradient of `z` with respect to the full embedding of a feature in
    /// `field` (1-based).
    fn embedding_grad(&self, field: usize, sums: &[f32], vec_w: &[f32]) -> Vec<f32> {
        let layout = &self.layout;
        let emb = layout.emb_size();
        let fi = field - 1;
        let mut grad = vec![0.0f32; layout.full_size()];
        for fj in 0..layout.num_fields() {
            let inner = fj * emb;
            let out = &mut grad[inner..inner + emb];
            if fj == fi {
                let own = layout.block(fi, fj);
                for k in 0..emb {
                    out[k] = sums[own + k] - vec_w[inner + k];
                }
            } else {
                let dual = layout.block(fj, fi);
                out.copy_from_slice(&sums[dual..dual + emb]);
            }
        }
        grad
    }

    fn train_one(&self, ins: &Instance) {
        let Forward { p, grads } = self.forward(ins, true, true);
        let grad = output_gradient(p, ins.label);
        let optimizer = self.optimizer.as_ref();

        log_update_error(self.store.update(BIAS_FID, 0, ins.label, grad, optimizer));
        for (feature, grad_vec) in ins.features.iter().zip(grads) {
            let result = match grad_vec {
                Some(mut grad_vec) => {
                    scale(&mut grad_vec, grad);
                    self.store.update_weight_and_embedding(
                        feature.id,
                        feature.slot,
                        ins.label,
                        grad,
                        &grad_vec,
                        optimizer,
                    )
                }
                None => self
                    .store
                    .update(feature.id, feature.slot, ins.label, grad, optimizer),
            };
            log_update_error(result);
        }
    }
}

impl Engine for FieldAwareFactorizationMachine {
    fn kind(&self) -> ModelKind {
        ModelKind::Ffm
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
            .map(|ins| {
                PredictResult::new(ins.label, self.forward(ins, false, false).p, ins.user_id)
            })
            .collect())
    }

    fn set_eval_mode(&self, eval: bool) {
        self.eval.set(eval);
    }

    fn is_eval_mode(&self) -> bool {
        self.eval.get()
    }

    fn save(&self, path: &Path) -> Result<()> {
        let header = model_header(
            self.layout.emb_size(),
            self.layout.num_fields(),
            &self.features,
        );
        self.store.persist(path, &header)?;
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
