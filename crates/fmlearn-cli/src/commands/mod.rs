//! Subcommand implementations.
//!
//! - [`train`]: train, save and evaluate a model
//! - [`predict`]: write scores for the predict list

mod predict;
mod train;

pub use predict::PredictCommand;
pub use train::TrainCommand;

use std::path::Path;

use anyhow::{bail, Context, Result};
use fmlearn_core::{ModelKind, TrainConfig};
use fmlearn_data::{DataLoader, InstanceParser};
use fmlearn_model::{create_model, Engine};
use tracing::info;

/// Model family selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModelArg {
    Lr,
    Fm,
    Ffm,
}

impl From<ModelArg> for ModelKind {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Lr => ModelKind::Lr,
            ModelArg::Fm => ModelKind::Fm,
            ModelArg::Ffm => ModelKind::Ffm,
        }
    }
}

/// Loaded configuration with the engine and loader built from it.
struct Session {
    config: TrainConfig,
    engine: Box<dyn Engine>,
    loader: DataLoader,
}

impl Session {
    fn open(conf: &Path, model: Option<ModelArg>, load: Option<&Path>) -> Result<Self> {
        let config = TrainConfig::from_file(conf)
            .with_context(|| format!("Failed to load config {}", conf.display()))?;
        let kind = model.map(ModelKind::from).unwrap_or(config.model);
        if kind != ModelKind::Lr && config.optim_config.emb_size == 0 {
            bail!("model {kind} needs optim_config.emb_size > 0");
        }

        let engine = create_model(kind, &config.model_config())
            .with_context(|| format!("Failed to build {kind} model"))?;
        if let Some(path) = load {
            info!(path = %path.display(), "Loading model");
            engine
                .load(path)
                .with_context(|| format!("Failed to load model {}", path.display()))?;
        }
        let loader =
            DataLoader::with_batch_size(InstanceParser::from_config(&config), config.batch_size);

        info!(model = %kind, conf = %conf.display(), "Initialized model and loader");
        Ok(Self {
            config,
            engine,
            loader,
        })
    }
}
