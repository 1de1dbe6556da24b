//! FTRL (Follow The Regularized Leader) optimizer.
//!
//! FTRL is an online learning algorithm that is particularly effective
//! for training sparse models. It produces sparser models than other
//! optimizers due to its L1 regularization.
//!
//! # Example
//!
//! ```
//! use fmlearn_core::Parameter;
//! use fmlearn_optimizer::{Ftrl, FtrlParams, Optimizer};
//!
//! let params = FtrlParams { alpha: 0.1, beta: 1.0, l1: 0.1, l2: 0.1 };
//! let ftrl = Ftrl::with_params(params, params);
//!
//! let mut param = Parameter::default();
//! param.w = 1.0;
//! ftrl.update(0.1, &mut param);
//! assert!((param.z + 0.9).abs() < 1e-6);
//! assert!((param.w - 0.0720721).abs() < 1e-6);
//! ```

use fmlearn_core::Parameter;
use serde::{Deserialize, Serialize};

use crate::{check_embedding_size, Optimizer, OptimizerConfig, OptimizerError};

/// Hyperparameters of one FTRL-Proximal update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FtrlParams {
    /// Learning rate.
    pub alpha: f32,
    /// Learning rate smoothing.
    pub beta: f32,
    /// L1 regularization strength.
    pub l1: f32,
    /// L2 regularization strength.
    pub l2: f32,
}

impl FtrlParams {
    /// Runs one FTRL-Proximal step on a single coordinate:
    ///
    /// ```text
    /// sigma = (sqrt(n + g^2) - sqrt(n)) / alpha
    /// z = z + g - sigma * w
    /// n = n + g^2
    /// if |z| < l1:
    ///     w = 0
    /// else:
    ///     w = -(z - sign(z) * l1) / ((beta + sqrt(n)) / alpha + l2)
    /// ```
    #[inline]
    pub fn step(&self, grad: f32, z: &mut f32, n: &mut f32, w: &mut f32) {
        let sigma = (sqrt32(*n + grad * grad) - sqrt32(*n)) / self.alpha;
        *z += grad - sigma * *w;
        *n += grad * grad;
        let sign = if *z < 0.0 { -1.0 } else { 1.0 };
        if sign * *z < self.l1 {
            *w = 0.0;
        } else {
            *w = -(*z - sign * self.l1) / ((self.beta + sqrt32(*n)) / self.alpha + self.l2);
        }
    }
}

#[inline]
fn sqrt32(x: f32) -> f32 {
    f64::from(x).sqrt() as f32
}

/// FTRL optimizer for sparse model training.
///
/// Scalar weights and embedding coordinates use separate hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ftrl {
    weight: FtrlParams,
    embedding: FtrlParams,
    /// Configuration used to create this optimizer.
    config: OptimizerConfig,
}

impl Ftrl {
    /// Creates a new FTRL optimizer with the given parameters.
    pub fn with_params(weight: FtrlParams, embedding: FtrlParams) -> Self {
        Self {
            weight,
            embedding,
            config: OptimizerConfig::Ftrl { weight, embedding },
        }
    }

    pub fn weight_params(&self) -> &FtrlParams {
        &self.weight
    }

    pub fn embedding_params(&self) -> &FtrlParams {
        &self.embedding
    }
}

impl Optimizer for Ftrl {
    fn new(config: OptimizerConfig) -> Result<Self, OptimizerError> {
        match config {
            OptimizerConfig::Ftrl { weight, embedding } => {
                if weight.alpha <= 0.0 || embedding.alpha <= 0.0 {
                    return Err(OptimizerError::InvalidParameter(
                        "ftrl alpha must be positive".to_string(),
                    ));
                }
                Ok(Self::with_params(weight, embedding))
            }
            _ => Err(OptimizerError::ConfigMismatch {
                expected: "Ftrl".to_string(),
                got: config.name().to_string(),
            }),
        }
    }

    fn update(&self, grad: f32, parameter: &mut Parameter) {
        self.weight
            .step(grad, &mut parameter.z, &mut parameter.n, &mut parameter.w);
    }

    fn update_embedding(
        &self,
        grad: &[f32],
        parameter: &mut Parameter,
    ) -> Result<(), OptimizerError> {
        check_embedding_size(grad, parameter, true)?;
        let coords = parameter
            .vec_z
            .iter_mut()
            .zip(parameter.vec_n.iter_mut())
            .zip(parameter.vec_w.iter_mut());
        for (g, ((z, n), w)) in grad.iter().zip(coords) {
            self.embedding.step(*g, z, n, w);
        }
        Ok(())
    }

    fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}
