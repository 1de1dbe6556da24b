//! Parameter optimizers for fmlearn.
//!
//! An optimizer turns a gradient into new values for one [`Parameter`]: the
//! scalar weight through [`Optimizer::update`] and the embedding through
//! [`Optimizer::update_embedding`]. Optimizers keep no per-feature state of
//! their own; the accumulators live inside the parameter, so one optimizer
//! instance is shared by every training thread.
//!
//! # Available Optimizers
//!
//! - [`Ftrl`] - FTRL-Proximal, the default
//! - [`Sgd`] - Stochastic Gradient Descent with L2 decay
//!
//! # Example
//!
//! ```
//! use fmlearn_core::Parameter;
//! use fmlearn_optimizer::{Optimizer, OptimizerConfig, Sgd};
//!
//! let config = OptimizerConfig::Sgd { learning_rate: 0.1, l2_reg: 0.0 };
//! let sgd = Sgd::new(config).unwrap();
//!
//! let mut param = Parameter::default();
//! param.w = 1.0;
//! sgd.update(0.5, &mut param);
//! assert!((param.w - 0.95).abs() < 1e-6);
//! ```

use fmlearn_core::{OptimConfig, OptimizerKind, Parameter};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod ftrl;
mod sgd;

pub use ftrl::{Ftrl, FtrlParams};
pub use sgd::Sgd;

/// Errors that can occur when working with optimizers.
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// Configuration type does not match the optimizer type.
    #[error("Config mismatch: expected {expected}, got {got}")]
    ConfigMismatch { expected: String, got: String },

    /// Invalid configuration parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The embedding gradient and the parameter's embedding state differ in
    /// length.
    #[error(
        "embedding size mismatch: grad={grad}, emb_w={emb_w}, emb_z={emb_z}, emb_n={emb_n}"
    )]
    DimensionMismatch {
        grad: usize,
        emb_w: usize,
        emb_z: usize,
        emb_n: usize,
    },
}

/// Configuration for the supported optimizer types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptimizerConfig {
    /// Stochastic Gradient Descent configuration.
    Sgd {
        /// Step size.
        learning_rate: f32,
        /// L2 decay; each step scales the weight by `1 - 2 * l2_reg * learning_rate`.
        l2_reg: f32,
    },

    /// FTRL configuration.
    Ftrl {
        /// Hyperparameters for scalar weights.
        weight: FtrlParams,
        /// Hyperparameters for embedding coordinates.
        embedding: FtrlParams,
    },
}

impl OptimizerConfig {
    /// Returns the name of the optimizer type.
    pub fn name(&self) -> &'static str {
        match self {
            OptimizerConfig::Sgd { .. } => "Sgd",
            OptimizerConfig::Ftrl { .. } => "Ftrl",
        }
    }

    /// Builds the optimizer configuration selected by `kind` from the
    /// training hyperparameters.
    pub fn from_optim(kind: OptimizerKind, optim: &OptimConfig) -> Self {
        match kind {
            OptimizerKind::Sgd => OptimizerConfig::Sgd {
                learning_rate: optim.alpha,
                l2_reg: optim.l2,
            },
            OptimizerKind::Ftrl => OptimizerConfig::Ftrl {
                weight: FtrlParams {
                    alpha: optim.alpha,
                    beta: optim.beta,
                    l1: optim.l1,
                    l2: optim.l2,
                },
                embedding: FtrlParams {
                    alpha: optim.emb_alpha,
                    beta: optim.emb_beta,
                    l1: optim.emb_l1,
                    l2: optim.emb_l2,
                },
            },
        }
    }
}

/// Trait for parameter optimizers.
///
/// Implementations must be stateless with respect to individual parameters so
/// that a single instance can be shared across threads.
pub trait Optimizer: Sized + Send + Sync {
    /// Creates a new optimizer from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizerError::ConfigMismatch`] if the configuration type
    /// does not match the optimizer type.
    fn new(config: OptimizerConfig) -> Result<Self, OptimizerError>;

    /// Applies a scalar gradient to `parameter.w` and its accumulators.
    fn update(&self, grad: f32, parameter: &mut Parameter);

    /// Applies a gradient vector to the parameter's embedding.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizerError::DimensionMismatch`] and leaves the parameter
    /// untouched if `grad` and the embedding state differ in length.
    fn update_embedding(&self, grad: &[f32], parameter: &mut Parameter)
        -> Result<(), OptimizerError>;

    /// Returns a reference to the optimizer's configuration.
    fn config(&self) -> &OptimizerConfig;
}

/// Dynamic dispatch version of the Optimizer trait.
pub trait OptimizerDyn: Send + Sync {
    fn update(&self, grad: f32, parameter: &mut Parameter);

    fn update_embedding(&self, grad: &[f32], parameter: &mut Parameter)
        -> Result<(), OptimizerError>;

    fn config(&self) -> &OptimizerConfig;
}

impl<T: Optimizer> OptimizerDyn for T {
    fn update(&self, grad: f32, parameter: &mut Parameter) {
        Optimizer::update(self, grad, parameter)
    }

    fn update_embedding(
        &self,
        grad: &[f32],
        parameter: &mut Parameter,
    ) -> Result<(), OptimizerError> {
        Optimizer::update_embedding(self, grad, parameter)
    }

    fn config(&self) -> &OptimizerConfig {
        Optimizer::config(self)
    }
}

/// Creates an optimizer from the given configuration.
///
/// # Example
///
/// ```
/// use fmlearn_core::{OptimConfig, OptimizerKind};
/// use fmlearn_optimizer::{create_optimizer, OptimizerConfig};
///
/// let config = OptimizerConfig::from_optim(OptimizerKind::Ftrl, &OptimConfig::default());
/// let optimizer = create_optimizer(config);
/// assert_eq!(optimizer.config().name(), "Ftrl");
/// ```
pub fn create_optimizer(config: OptimizerConfig) -> Box<dyn OptimizerDyn> {
    match config {
        OptimizerConfig::Sgd {
            learning_rate,
            l2_reg,
        } => Box::new(Sgd::with_params(learning_rate, l2_reg)),
        OptimizerConfig::Ftrl { weight, embedding } => {
            Box::new(Ftrl::with_params(weight, embedding))
        }
    }
}

pub(crate) fn check_embedding_size(
    grad: &[f32],
    parameter: &Parameter,
    check_accumulators: bool,
) -> Result<(), OptimizerError> {
    let len = grad.len();
    let consistent = parameter.vec_w.len() == len
        && (!check_accumulators || (parameter.vec_z.len() == len && parameter.vec_n.len() == len));
    if consistent {
        Ok(())
    } else {
        Err(OptimizerError::DimensionMismatch {
            grad: len,
            emb_w: parameter.vec_w.len(),
            emb_z: parameter.vec_z.len(),
            emb_n: parameter.vec_n.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimizer_config_name() {
        let sgd = OptimizerConfig::Sgd {
            learning_rate: 0.01,
            l2_reg: 0.0,
        };
        assert_eq!(sgd.name(), "Sgd");

        let ftrl = OptimizerConfig::from_optim(OptimizerKind::Ftrl, &OptimConfig::default());
        assert_eq!(ftrl.name(), "Ftrl");
    }

    #[test]
    fn test_from_optim_splits_embedding_params() {
        let optim = OptimConfig {
            alpha: 0.1,
            beta: 1.0,
            l1: 0.2,
            l2: 0.3,
            emb_alpha: 0.01,
            emb_beta: 2.0,
            emb_l1: 0.0,
            emb_l2: 0.4,
            emb_size: 4,
        };
        match OptimizerConfig::from_optim(OptimizerKind::Ftrl, &optim) {
            OptimizerConfig::Ftrl { weight, embedding } => {
                assert_eq!(weight.alpha, 0.1);
                assert_eq!(weight.l1, 0.2);
                assert_eq!(embedding.alpha, 0.01);
                assert_eq!(embedding.beta, 2.0);
                assert_eq!(embedding.l2, 0.4);
            }
            other => panic!("unexpected config {other:?}"),
        }
        assert_eq!(
            OptimizerConfig::from_optim(OptimizerKind::Sgd, &optim),
            OptimizerConfig::Sgd {
                learning_rate: 0.1,
                l2_reg: 0.3
            }
        );
    }

    #[test]
    fn test_create_optimizer() {
        let optimizer = create_optimizer(OptimizerConfig::Sgd {
            learning_rate: 0.5,
            l2_reg: 0.0,
        });

        let mut param = Parameter::zeroed(1, 1, 2);
        param.w = 1.0;
        param.vec_w = vec![1.0, 2.0];
        optimizer.update(1.0, &mut param);
        optimizer.update_embedding(&[1.0, 1.0], &mut param).unwrap();

        assert_eq!(param.w, 0.5);
        assert_eq!(param.vec_w, vec![0.5, 1.5]);
    }

    #[test]
    fn test_embedding_size_mismatch_is_reported() {
        let optimizer = create_optimizer(OptimizerConfig::from_optim(
            OptimizerKind::Ftrl,
            &OptimConfig::default(),
        ));
        let mut param = Parameter::zeroed(1, 1, 3);
        let before = param.clone();
        let err = optimizer.update_embedding(&[0.1, 0.2], &mut param).unwrap_err();
        assert!(matches!(
            err,
            OptimizerError::DimensionMismatch { grad: 2, emb_w: 3, .. }
        ));
        assert_eq!(param, before);
    }
}
