//! Model persistence
//!
//! A saved model is two files sharing one stem: `<stem>.json` holds the
//! architecture config and `<stem>.mpk` holds the weights. Weights are stored
//! at full precision so a reloaded model reproduces the same logits.

use std::path::{Path, PathBuf};

use burn::{
    config::Config,
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::backend::Backend,
};
use tracing::info;

use crate::model::cnn::{FlowerClassifier, FlowerClassifierConfig};
use crate::utils::error::{FlowerError, Result, ResultExt};

type WeightsRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Path of the architecture config for a model stem
pub fn config_path(path: &Path) -> PathBuf {
    path.with_extension("json")
}

/// Path of the weights file for a model stem
pub fn weights_path(path: &Path) -> PathBuf {
    path.with_extension("mpk")
}

/// Save architecture and weights under `path`, creating parent directories
pub fn save_model<B: Backend>(
    model: &FlowerClassifier<B>,
    config: &FlowerClassifierConfig,
    path: &Path,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    config.save(config_path(path))?;

    model
        .clone()
        .save_file(path.to_path_buf(), &WeightsRecorder::new())
        .map_err(|e| FlowerError::Model(format!("Failed to save weights: {:?}", e)))?;

    info!("Model saved to {:?}", weights_path(path));
    Ok(())
}

/// Rebuild a model from its saved config and load its weights
pub fn load_model<B: Backend>(
    path: &Path,
    device: &B::Device,
) -> Result<(FlowerClassifier<B>, FlowerClassifierConfig)> {
    let config_file = config_path(path);
    if !config_file.exists() {
        return Err(FlowerError::PathNotFound(config_file));
    }
    let weights_file = weights_path(path);
    if !weights_file.exists() {
        return Err(FlowerError::PathNotFound(weights_file));
    }

    let config = FlowerClassifierConfig::load(&config_file)
        .with_context(|| format!("Failed to read model config {:?}", config_file))?;
    config.validate().map_err(FlowerError::Config)?;

    let model = FlowerClassifier::<B>::new(&config, device)
        .load_file(path.to_path_buf(), &WeightsRecorder::new(), device)
        .map_err(|e| FlowerError::Model(format!("Failed to load weights: {:?}", e)))?;

    info!("Model loaded from {:?}", weights_file);
    Ok((model, config))
}
