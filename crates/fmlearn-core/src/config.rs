//! Training configuration.
//!
//! The whole run is described by one JSON document deserialised into
//! [`TrainConfig`]. Engines only see the [`ModelConfig`] subset derived from
//! it, so nothing downstream reads process-wide settings.
//!
//! # Example
//!
//! ```
//! use fmlearn_core::config::{ModelKind, TrainConfig};
//!
//! let config = TrainConfig::from_json_str(r#"{
//!     "optim_config": {"alpha": 0.05, "beta": 1.0, "l1": 0.1, "l2": 0.1, "emb_size": 4},
//!     "feature_list": [
//!         {"slot_id": 101, "name": "UserId", "cross": 1, "vec_type": "left"},
//!         {"slot_id": 102, "name": "ItemId", "cross": 2, "vec_type": "right"}
//!     ],
//!     "model": "ffm"
//! }"#).unwrap();
//!
//! assert_eq!(config.model, ModelKind::Ffm);
//! assert_eq!(config.shard_count, 61);
//! assert_eq!(config.feature_list.len(), 2);
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CoreError, Result};
use crate::fid::{SlotId, MAX_SLOT_ID};

/// Default number of parameter store shards.
pub const DEFAULT_SHARD_COUNT: usize = 61;

/// Default number of raw lines per pipeline batch.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Default slot carrying the user id.
pub const DEFAULT_UID_SLOT: SlotId = 101;

/// Default slot carrying the item id.
pub const DEFAULT_ITEM_SLOT: SlotId = 102;

/// Optimizer hyperparameters.
///
/// The `emb_*` values apply to embedding coordinates, the rest to scalar
/// weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimConfig {
    pub alpha: f32,
    pub beta: f32,
    pub l1: f32,
    pub l2: f32,
    pub emb_alpha: f32,
    pub emb_beta: f32,
    pub emb_l1: f32,
    pub emb_l2: f32,
    /// Embedding length per feature (per field for FFM).
    pub emb_size: usize,
}

impl Default for OptimConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            beta: 1.0,
            l1: 0.1,
            l2: 0.1,
            emb_alpha: 0.05,
            emb_beta: 1.0,
            emb_l1: 0.0,
            emb_l2: 0.1,
            emb_size: 8,
        }
    }
}

/// Which side of an FFM field interaction a slot sits on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VecType {
    #[default]
    Left,
    Right,
}

/// Declaration of one input slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub slot_id: SlotId,
    #[serde(default)]
    pub name: String,
    /// 1-based FFM field; 0 keeps the slot out of field interactions.
    #[serde(default)]
    pub cross: u32,
    #[serde(default)]
    pub vec_type: VecType,
}

impl FeatureConfig {
    pub fn new(slot_id: SlotId, name: impl Into<String>, cross: u32, vec_type: VecType) -> Self {
        Self {
            slot_id,
            name: name.into(),
            cross,
            vec_type,
        }
    }
}

/// Model family to train.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Lr,
    Fm,
    Ffm,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Lr => "lr",
            ModelKind::Fm => "fm",
            ModelKind::Ffm => "ffm",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lr" => Ok(ModelKind::Lr),
            "fm" => Ok(ModelKind::Fm),
            "ffm" => Ok(ModelKind::Ffm),
            other => Err(CoreError::Config {
                message: format!("unknown model kind {other:?}"),
            }),
        }
    }
}

/// Update rule applied to parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    Ftrl,
    Sgd,
}

/// Frequency filter implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Exact per-key counters.
    #[default]
    Exact,
    /// Count-min sketch, bounded memory and may over-count.
    Sketch,
}

/// One step of the incremental evaluation loop: train on the first list,
/// then evaluate on the second.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalGroup {
    pub inc_train_list: Vec<String>,
    pub inc_test_list: Vec<String>,
}

/// Everything a training run is configured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub optim_config: OptimConfig,
    pub feature_list: Vec<FeatureConfig>,
    /// Glob patterns of training files.
    pub train_list: Vec<String>,
    /// Glob patterns of evaluation files.
    pub predict_list: Vec<String>,
    pub eval_list: Vec<EvalGroup>,
    /// Feature values are numeric ids rather than text to hash.
    pub is_feature_signed: bool,
    /// Occurrences a new feature needs before the LR engine trains it.
    pub filter_count: u64,
    pub filter_kind: FilterKind,
    pub optimizer: OptimizerKind,
    pub model: ModelKind,
    pub uid_slot: SlotId,
    pub item_slot: SlotId,
    pub shard_count: usize,
    /// Seeds embedding initialisation for reproducible runs.
    pub seed: Option<u64>,
    pub batch_size: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            optim_config: OptimConfig::default(),
            feature_list: Vec::new(),
            train_list: Vec::new(),
            predict_list: Vec::new(),
            eval_list: Vec::new(),
            is_feature_signed: false,
            filter_count: 0,
            filter_kind: FilterKind::default(),
            optimizer: OptimizerKind::default(),
            model: ModelKind::default(),
            uid_slot: DEFAULT_UID_SLOT,
            item_slot: DEFAULT_ITEM_SLOT,
            shard_count: DEFAULT_SHARD_COUNT,
            seed: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl TrainConfig {
    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        info!(
            path = %path.display(),
            features = config.feature_list.len(),
            model = %config.model,
            "Loaded training config"
        );
        Ok(config)
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that cannot be trained.
    pub fn validate(&self) -> Result<()> {
        for feature in &self.feature_list {
            check_slot(feature.slot_id)?;
        }
        check_slot(self.uid_slot)?;
        check_slot(self.item_slot)?;

        if self.shard_count == 0 {
            return Err(config_error("shard_count must be positive"));
        }
        if self.batch_size == 0 {
            return Err(config_error("batch_size must be positive"));
        }
        if self.optim_config.alpha <= 0.0 {
            return Err(config_error("optim_config.alpha must be positive"));
        }
        if self.model != ModelKind::Lr {
            if self.optim_config.emb_size == 0 {
                return Err(config_error("optim_config.emb_size must be positive"));
            }
            if self.optim_config.emb_alpha <= 0.0 {
                return Err(config_error("optim_config.emb_alpha must be positive"));
            }
        }
        Ok(())
    }

    /// The subset of settings the engines are built from.
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            optim: self.optim_config.clone(),
            features: self.feature_list.clone(),
            optimizer: self.optimizer,
            filter_count: self.filter_count,
            filter_kind: self.filter_kind,
            shard_count: self.shard_count,
            seed: self.seed,
        }
    }
}

fn check_slot(slot_id: SlotId) -> Result<()> {
    if slot_id > MAX_SLOT_ID {
        return Err(CoreError::InvalidSlotId {
            slot_id,
            max: MAX_SLOT_ID,
        });
    }
    Ok(())
}

fn config_error(message: &str) -> CoreError {
    CoreError::Config {
        message: message.to_string(),
    }
}

/// Settings an engine is constructed from.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub optim: OptimConfig,
    pub features: Vec<FeatureConfig>,
    pub optimizer: OptimizerKind,
    pub filter_count: u64,
    pub filter_kind: FilterKind,
    pub shard_count: usize,
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        TrainConfig::default().model_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "optim_config": {
            "alpha": 0.1, "beta": 1.0, "l1": 0.1, "l2": 0.1,
            "emb_alpha": 0.05, "emb_beta": 1.0, "emb_l1": 0.0, "emb_l2": 0.1,
            "emb_size": 4
        },
        "feature_list": [
            {"slot_id": 101, "name": "UserId", "cross": 1, "vec_type": "left"},
            {"slot_id": 102, "name": "ItemId", "cross": 2, "vec_type": "right"}
        ],
        "train_list": ["data/train_*.txt"],
        "predict_list": ["data/test.txt"],
        "eval_list": [{"inc_train_list": ["a"], "inc_test_list": ["b"]}],
        "filter_count": 3,
        "filter_kind": "sketch",
        "optimizer": "sgd",
        "model": "fm",
        "seed": 11
    }"#;

    #[test]
    fn test_parse_full_config() {
        let config = TrainConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.optim_config.alpha, 0.1);
        assert_eq!(config.optim_config.emb_size, 4);
        assert_eq!(config.feature_list[1].slot_id, 102);
        assert_eq!(config.feature_list[1].cross, 2);
        assert_eq!(config.feature_list[1].vec_type, VecType::Right);
        assert_eq!(config.eval_list[0].inc_test_list, vec!["b".to_string()]);
        assert_eq!(config.filter_kind, FilterKind::Sketch);
        assert_eq!(config.optimizer, OptimizerKind::Sgd);
        assert_eq!(config.model, ModelKind::Fm);
        assert_eq!(config.uid_slot, DEFAULT_UID_SLOT);
        assert_eq!(config.item_slot, DEFAULT_ITEM_SLOT);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);

        let model = config.model_config();
        assert_eq!(model.filter_count, 3);
        assert_eq!(model.seed, Some(11));
        assert_eq!(model.features.len(), 2);
    }

    #[test]
    fn test_defaults_from_empty_object() {
        let config = TrainConfig::from_json_str("{}").unwrap();
        assert_eq!(config, TrainConfig::default());
        assert_eq!(config.shard_count, DEFAULT_SHARD_COUNT);
        assert!(!config.is_feature_signed);
    }

    #[test]
    fn test_rejects_large_slot() {
        let err = TrainConfig::from_json_str(r#"{"feature_list": [{"slot_id": 1000}]}"#)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidSlotId { slot_id: 1000, .. }));

        let err = TrainConfig::from_json_str(r#"{"uid_slot": 4096}"#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSlotId { slot_id: 4096, .. }));
    }

    #[test]
    fn test_rejects_zero_sizes() {
        assert!(TrainConfig::from_json_str(r#"{"shard_count": 0}"#).is_err());
        assert!(TrainConfig::from_json_str(r#"{"batch_size": 0}"#).is_err());
        assert!(TrainConfig::from_json_str(
            r#"{"model": "ffm", "optim_config": {"emb_size": 0}}"#
        )
        .is_err());
        // LR never allocates embeddings.
        assert!(TrainConfig::from_json_str(r#"{"optim_config": {"emb_size": 0}}"#).is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = TrainConfig::from_file(file.path()).unwrap();
        assert_eq!(config.model, ModelKind::Fm);

        let err = TrainConfig::from_file("/nonexistent/fmlearn.json").unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }

    #[test]
    fn test_model_kind_from_str() {
        assert_eq!("LR".parse::<ModelKind>().unwrap(), ModelKind::Lr);
        assert_eq!("ffm".parse::<ModelKind>().unwrap(), ModelKind::Ffm);
        assert!("gbdt".parse::<ModelKind>().is_err());
        assert_eq!(ModelKind::Fm.to_string(), "fm");
    }
}
