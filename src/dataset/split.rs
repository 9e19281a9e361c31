//! Train/validation split
//!
//! The full sample list is shuffled with a seeded ChaCha RNG and the tail
//! `validation_split` fraction is held out for validation. Two runs with the
//! same seed over the same directory tree produce identical subsets.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::loader::{FlowerDataset, ImageSample};
use crate::utils::error::{FlowerError, Result};

/// Configuration for dataset splitting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitConfig {
    /// Fraction of samples withheld for validation
    pub validation_split: f64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Shuffle before splitting
    pub shuffle: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            validation_split: 0.2,
            seed: 123,
            shuffle: true,
        }
    }
}

impl SplitConfig {
    /// Create a validated split configuration
    pub fn new(validation_split: f64, seed: u64) -> Result<Self> {
        if !(0.0..1.0).contains(&validation_split) {
            return Err(FlowerError::Config(format!(
                "validation_split must be in [0.0, 1.0), got {}",
                validation_split
            )));
        }

        Ok(Self {
            validation_split,
            seed,
            shuffle: true,
        })
    }

    /// Number of validation samples out of `total`
    pub fn validation_count(&self, total: usize) -> usize {
        (self.validation_split * total as f64).floor() as usize
    }
}

/// Training and validation subsets of one dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSplit {
    pub training: Vec<ImageSample>,
    pub validation: Vec<ImageSample>,
    /// Class names shared by both subsets, indexed by label
    pub class_names: Vec<String>,
    pub config: SplitConfig,
}

impl DatasetSplit {
    /// Split a loaded dataset
    pub fn from_dataset(dataset: &FlowerDataset, config: SplitConfig) -> Result<Self> {
        Self::from_samples(dataset.samples.clone(), dataset.class_names.clone(), config)
    }

    /// Split an explicit sample list
    pub fn from_samples(
        mut samples: Vec<ImageSample>,
        class_names: Vec<String>,
        config: SplitConfig,
    ) -> Result<Self> {
        let total = samples.len();
        if total == 0 {
            return Err(FlowerError::Dataset(
                "No images provided for splitting".to_string(),
            ));
        }

        if config.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
            samples.shuffle(&mut rng);
        }

        let num_val = config.validation_count(total);
        let num_train = total - num_val;
        if num_train == 0 {
            return Err(FlowerError::Dataset(format!(
                "validation_split {} leaves no training samples out of {}",
                config.validation_split, total
            )));
        }

        let validation = samples.split_off(num_train);
        let training = samples;

        info!(
            "Using {} files for training, {} files for validation",
            training.len(),
            validation.len()
        );

        Ok(Self {
            training,
            validation,
            class_names,
            config,
        })
    }

    /// `(path, label)` pairs of the training subset
    pub fn training_pairs(&self) -> Vec<(std::path::PathBuf, usize)> {
        self.training.iter().map(|s| (s.path.clone(), s.label)).collect()
    }

    /// `(path, label)` pairs of the validation subset
    pub fn validation_pairs(&self) -> Vec<(std::path::PathBuf, usize)> {
        self.validation.iter().map(|s| (s.path.clone(), s.label)).collect()
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }
}
