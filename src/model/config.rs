//! Training Configuration
//!
//! Hyperparameters and paths for a training run. Defaults:
//! 180x180 images, batch size 128, 10 epochs,
//! 20% validation split with seed 123.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataset::SplitConfig;
use crate::model::cnn::FlowerClassifierConfig;
use crate::utils::error::{FlowerError, Result};
use crate::IMAGE_SIZE;

/// Configuration for a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Directory with one subdirectory of images per class
    pub data_dir: PathBuf,

    /// Model file stem; `.json` and `.mpk` are appended when saving
    pub model_path: PathBuf,

    /// Directory for the history JSON and chart
    pub output_dir: PathBuf,

    /// Number of passes over the training subset
    pub epochs: usize,

    /// Samples per optimizer step
    pub batch_size: usize,

    /// Adam learning rate
    pub learning_rate: f64,

    /// Image height after resizing
    pub image_height: usize,

    /// Image width after resizing
    pub image_width: usize,

    /// Fraction of images withheld for validation
    pub validation_split: f64,

    /// Seed for the train/validation shuffle
    pub seed: u64,

    /// Number of classes; taken from the dataset when unset
    pub num_classes: Option<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("images"),
            model_path: PathBuf::from("model/myFlower1"),
            output_dir: PathBuf::from("output"),
            epochs: 10,
            batch_size: 128,
            learning_rate: 0.001,
            image_height: IMAGE_SIZE,
            image_width: IMAGE_SIZE,
            validation_split: 0.2,
            seed: 123,
            num_classes: None,
        }
    }
}

impl TrainingConfig {
    /// Validate hyperparameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(FlowerError::Config("epochs must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(FlowerError::Config("batch_size must be > 0".to_string()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(FlowerError::Config(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if self.image_height == 0 || self.image_width == 0 {
            return Err(FlowerError::Config("image size must be > 0".to_string()));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(FlowerError::Config(format!(
                "validation_split must be in [0.0, 1.0), got {}",
                self.validation_split
            )));
        }
        if self.num_classes == Some(0) {
            return Err(FlowerError::Config("num_classes must be > 0".to_string()));
        }
        Ok(())
    }

    /// Split settings derived from this config
    pub fn split_config(&self) -> Result<SplitConfig> {
        SplitConfig::new(self.validation_split, self.seed)
    }

    /// Model architecture for `num_classes` outputs at this image size
    pub fn model_config(&self, num_classes: usize) -> FlowerClassifierConfig {
        FlowerClassifierConfig::new(num_classes)
            .with_image_height(self.image_height)
            .with_image_width(self.image_width)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FlowerError::PathNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.epochs, 10);
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.image_height, 180);
        assert_eq!(config.validation_split, 0.2);
        assert_eq!(config.seed, 123);
        assert_eq!(config.model_path, PathBuf::from("model/myFlower1"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = TrainingConfig::default();
        config.epochs = 0;
        assert!(config.validate().is_err());

        config = TrainingConfig::default();
        config.validation_split = 1.0;
        assert!(config.validate().is_err());

        config = TrainingConfig::default();
        config.learning_rate = f64::NAN;
        assert!(config.validate().is_err());

        config = TrainingConfig::default();
        config.num_classes = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.json");

        std::fs::write(&path, r#"{ "epochs": 3, "batch_size": 16 }"#).unwrap();
        let config = TrainingConfig::load(&path).unwrap();
        assert_eq!(config.epochs, 3);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.seed, 123);

        config.save(&path).unwrap();
        assert_eq!(TrainingConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let result = TrainingConfig::load(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(FlowerError::PathNotFound(_))));
    }

    #[test]
    fn test_model_config_follows_image_size() {
        let mut config = TrainingConfig::default();
        config.image_height = 64;
        config.image_width = 48;

        let model = config.model_config(5);
        assert_eq!(model.num_classes, 5);
        assert_eq!(model.image_height, 64);
        assert_eq!(model.image_width, 48);
    }
}
