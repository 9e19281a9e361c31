//! # Flower Classifier
//!
//! Trains a small convolutional network to recognise flower species from a
//! directory tree of photos (`images/<class_name>/*.jpg`) using the Burn
//! framework.
//!
//! ## Modules
//!
//! - `dataset`: Directory scanning, the seeded train/validation split, and Burn batching
//! - `model`: CNN architecture, training configuration, and model persistence
//! - `training`: Training loop, validation, and the end-to-end pipeline
//! - `utils`: Logging, errors, and the training history chart
//! - `backend`: Backend selection (NdArray by default, CUDA behind a feature)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flower_classifier::backend::TrainingBackend;
//! use flower_classifier::training::{run_training, TrainingConfig};
//!
//! let report = run_training::<TrainingBackend>(&TrainingConfig::default())?;
//! println!("final val accuracy: {:?}", report.history.final_val_accuracy());
//! ```

pub mod backend;
pub mod dataset;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::loader::FlowerDataset;
pub use dataset::split::{DatasetSplit, SplitConfig};
pub use dataset::{FlowerBatch, FlowerBatcher, FlowerBurnDataset, FlowerItem};
pub use model::checkpoint::{load_model, save_model};
pub use model::cnn::{FlowerClassifier, FlowerClassifierConfig};
pub use model::config::TrainingConfig;
pub use training::{run_training, Trainer, TrainingHistory, TrainingReport};
pub use utils::error::{FlowerError, Result};

/// Default image height and width
pub const IMAGE_SIZE: usize = 180;
