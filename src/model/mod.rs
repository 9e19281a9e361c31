//! Model module
//!
//! The CNN architecture, training hyperparameters and on-disk persistence.

pub mod checkpoint;
pub mod cnn;
pub mod config;

pub use checkpoint::{load_model, save_model};
pub use cnn::{FlowerClassifier, FlowerClassifierConfig, ModelSummary};
pub use config::TrainingConfig;
