//! Dataset module for flower image handling
//!
//! This module provides:
//! - Scanning a class-per-directory image tree (`loader`)
//! - A seeded train/validation split (`split`)
//! - Burn `Dataset`/`Batcher` integration (`burn_dataset`)
//! - Pixel rescaling helpers

pub mod burn_dataset;
pub mod loader;
pub mod split;

pub use burn_dataset::{batch_indices, FlowerBatch, FlowerBatcher, FlowerBurnDataset, FlowerItem};
pub use loader::{count_images, DatasetStats, FlowerDataset, ImageSample};
pub use split::{DatasetSplit, SplitConfig};

/// Multiplier that maps 8-bit intensities into `[0, 1]`
pub const RESCALE_FACTOR: f32 = 1.0 / 255.0;

/// Rescale a buffer of `[0, 255]` intensities into `[0, 1]` in place
pub fn normalize_pixels(pixels: &mut [f32]) {
    for p in pixels.iter_mut() {
        *p *= RESCALE_FACTOR;
    }
}

/// Smallest and largest value of a buffer, `None` when empty
pub fn value_range(values: &[f32]) -> Option<(f32, f32)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
