//! Per-epoch training history

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::Result;

/// Loss and accuracy of one pass over a dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Sample-weighted mean cross-entropy
    pub loss: f64,
    /// Fraction of correct predictions in `[0, 1]`
    pub accuracy: f64,
}

/// Four aligned per-epoch sequences, one entry per completed epoch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub accuracy: Vec<f64>,
    pub loss: Vec<f64>,
    pub val_accuracy: Vec<f64>,
    pub val_loss: Vec<f64>,
}

impl TrainingHistory {
    /// Append one epoch
    pub fn push(&mut self, loss: f64, accuracy: f64, val_loss: f64, val_accuracy: f64) {
        self.loss.push(loss);
        self.accuracy.push(accuracy);
        self.val_loss.push(val_loss);
        self.val_accuracy.push(val_accuracy);
    }

    /// Append one epoch from training and validation metrics
    pub fn record(&mut self, train: EpochMetrics, val: EpochMetrics) {
        self.push(train.loss, train.accuracy, val.loss, val.accuracy);
    }

    /// Number of recorded epochs
    pub fn len(&self) -> usize {
        self.loss.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loss.is_empty()
    }

    /// Validation accuracy of the last epoch
    pub fn final_val_accuracy(&self) -> Option<f64> {
        self.val_accuracy.last().copied()
    }

    /// Highest validation accuracy and its 0-indexed epoch
    pub fn best_val_accuracy(&self) -> Option<(usize, f64)> {
        self.val_accuracy
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (i, acc)| match best {
                Some((_, b)) if b >= acc => best,
                _ => Some((i, acc)),
            })
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
