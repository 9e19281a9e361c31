//! Training module
//!
//! - `history`: per-epoch loss/accuracy sequences
//! - `trainer`: the epoch loop and the end-to-end `run_training` pipeline

pub mod history;
pub mod trainer;

pub use crate::model::config::TrainingConfig;
pub use history::{EpochMetrics, TrainingHistory};
pub use trainer::{evaluate, run_training, Trainer, TrainingReport};
