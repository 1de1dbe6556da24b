//! Stochastic Gradient Descent (SGD) optimizer.
//!
//! # Example
//!
//! ```
//! use fmlearn_core::Parameter;
//! use fmlearn_optimizer::{Optimizer, OptimizerConfig, Sgd};
//!
//! let sgd = Sgd::new(OptimizerConfig::Sgd { learning_rate: 0.01, l2_reg: 0.0 }).unwrap();
//! let mut param = Parameter::zeroed(1, 1, 2);
//! param.vec_w = vec![1.0, 2.0];
//! sgd.update_embedding(&[0.1, 0.2], &mut param).unwrap();
//! ```

use fmlearn_core::Parameter;
use serde::{Deserialize, Serialize};

use crate::{check_embedding_size, Optimizer, OptimizerConfig, OptimizerError};

/// Stochastic Gradient Descent optimizer.
///
/// Updates weights using the formula:
/// `w = (1 - 2 * l2_reg * learning_rate) * w - learning_rate * gradient`
///
/// Scalar weights and embeddings share the same step size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sgd {
    /// Learning rate for gradient updates.
    learning_rate: f32,
    /// L2 regularization strength.
    l2_reg: f32,
    /// Configuration used to create this optimizer.
    config: OptimizerConfig,
}

impl Sgd {
    /// Creates a new SGD optimizer with the given learning rate and decay.
    pub fn with_params(learning_rate: f32, l2_reg: f32) -> Self {
        Self {
            learning_rate,
            l2_reg,
            config: OptimizerConfig::Sgd {
                learning_rate,
                l2_reg,
            },
        }
    }

    #[inline]
    fn step(&self, w: f32, grad: f32) -> f32 {
        (1.0 - 2.0 * self.l2_reg * self.learning_rate) * w - grad * self.learning_rate
    }
}

impl Optimizer for Sgd {
    fn new(config: OptimizerConfig) -> Result<Self, OptimizerError> {
        match config {
            OptimizerConfig::Sgd {
                learning_rate,
                l2_reg,
            } => Ok(Self::with_params(learning_rate, l2_reg)),
            _ => Err(OptimizerError::ConfigMismatch {
                expected: "Sgd".to_string(),
                got: config.name().to_string(),
            }),
        }
    }

    fn update(&self, grad: f32, parameter: &mut Parameter) {
        parameter.w = self.step(parameter.w, grad);
    }

    fn update_embedding(
        &self,
        grad: &[f32],
        parameter: &mut Parameter,
    ) -> Result<(), OptimizerError> {
        check_embedding_size(grad, parameter, false)?;
        for (w, g) in parameter.vec_w.iter_mut().zip(grad) {
            *w = self.step(*w, *g);
        }
        Ok(())
    }

    fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FtrlParams;

    #[test]
    fn test_sgd_update() {
        let sgd = Sgd::with_params(0.1, 0.0);
        let mut param = Parameter {
            w: 1.0,
            ..Default::default()
        };
        sgd.update(1.0, &mut param);
        assert!((param.w - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_sgd_l2_decay() {
        let sgd = Sgd::with_params(0.1, 0.5);
        let mut param = Parameter {
            w: 2.0,
            ..Default::default()
        };
        sgd.update(0.0, &mut param);
        // (1 - 2 * 0.5 * 0.1) * 2.0
        assert!((param.w - 1.8).abs() < 1e-6);
    }

    #[test]
    fn test_sgd_embedding_update() {
        let sgd = Sgd::with_params(0.1, 0.0);
        let mut param = Parameter::zeroed(1, 1, 3);
        param.vec_w = vec![1.0, 2.0, 3.0];
        sgd.update_embedding(&[1.0, 1.0, 1.0], &mut param).unwrap();
        for (got, want) in param.vec_w.iter().zip([0.9f32, 1.9, 2.9]) {
            assert!((got - want).abs() < 1e-6);
        }
        assert!(sgd.update_embedding(&[1.0], &mut param).is_err());
    }

    #[test]
    fn test_sgd_config_mismatch() {
        let params = FtrlParams {
            alpha: 0.1,
            beta: 1.0,
            l1: 0.0,
            l2: 0.0,
        };
        let result = Sgd::new(OptimizerConfig::Ftrl {
            weight: params,
            embedding: params,
        });
        assert!(matches!(
            result,
            Err(OptimizerError::ConfigMismatch { .. })
        ));
    }
}
