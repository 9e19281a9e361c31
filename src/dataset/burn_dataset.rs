//! Burn Dataset Integration
//!
//! Implements Burn's `Dataset` trait and `Batcher` for the flower images.
//! Items keep raw `[0, 255]` intensities in HWC order; rescaling happens in the
//! model's first layer.

use std::ops::Range;
use std::path::{Path, PathBuf};

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::imageops::FilterType;
use image::ImageReader;
use serde::{Deserialize, Serialize};

use crate::utils::error::{FlowerError, Result};

/// Number of color channels fed to the model
pub const CHANNELS: usize = 3;

/// A single decoded image ready for batching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlowerItem {
    /// Image data as flattened HWC array `[H * W * 3]`, values in `[0, 255]`
    pub image: Vec<f32>,
    /// Class label
    pub label: usize,
    /// Image path (for logging)
    pub path: String,
}

impl FlowerItem {
    /// Decode an image, resize it exactly to `height x width` and flatten it
    pub fn from_path(path: &Path, label: usize, height: usize, width: usize) -> Result<Self> {
        let img = ImageReader::open(path)
            .map_err(|e| load_error(path, e))?
            .with_guessed_format()
            .map_err(|e| load_error(path, e))?
            .decode()
            .map_err(|e| load_error(path, e))?
            .resize_exact(width as u32, height as u32, FilterType::Triangle)
            .to_rgb8();

        // RgbImage is row-major RGB, which is already HWC
        let image: Vec<f32> = img.into_raw().into_iter().map(f32::from).collect();

        Ok(Self {
            image,
            label,
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Create from pre-loaded image data
    pub fn from_data(image: Vec<f32>, label: usize, path: String) -> Self {
        Self { image, label, path }
    }
}

fn load_error(path: &Path, err: impl std::fmt::Display) -> FlowerError {
    FlowerError::ImageLoad(path.to_path_buf(), err.to_string())
}

/// Flower images implementing Burn's `Dataset` trait.
///
/// Images are decoded on demand in `get`, so iterating twice decodes twice.
#[derive(Debug, Clone)]
pub struct FlowerBurnDataset {
    samples: Vec<(PathBuf, usize)>,
    height: usize,
    width: usize,
}

impl FlowerBurnDataset {
    pub fn new(samples: Vec<(PathBuf, usize)>, height: usize, width: usize) -> Self {
        Self {
            samples,
            height,
            width,
        }
    }

    /// Load an item, surfacing decode failures instead of hiding them
    pub fn try_get(&self, index: usize) -> Result<FlowerItem> {
        let (path, label) = self.samples.get(index).ok_or_else(|| {
            FlowerError::Dataset(format!(
                "index {} out of bounds for dataset of {}",
                index,
                self.samples.len()
            ))
        })?;
        FlowerItem::from_path(path, *label, self.height, self.width)
    }

    /// Load every item of a batch range
    pub fn load_range(&self, range: Range<usize>) -> Result<Vec<FlowerItem>> {
        range.map(|i| self.try_get(i)).collect()
    }
}

impl Dataset<FlowerItem> for FlowerBurnDataset {
    fn get(&self, index: usize) -> Option<FlowerItem> {
        self.try_get(index).ok()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Contiguous index ranges covering `0..len` in steps of `batch_size`.
///
/// The final range is shorter when `len` is not a multiple of `batch_size`.
pub fn batch_indices(len: usize, batch_size: usize) -> impl Iterator<Item = Range<usize>> {
    let step = batch_size.max(1);
    (0..len).step_by(step).map(move |start| start..(start + step).min(len))
}

/// A batch of flower images
#[derive(Clone, Debug)]
pub struct FlowerBatch<B: Backend> {
    /// Images with shape `[batch_size, height, width, 3]`, raw intensities
    pub images: Tensor<B, 4>,
    /// Labels with shape `[batch_size]`
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher stacking `FlowerItem`s into a `FlowerBatch`
#[derive(Clone, Debug)]
pub struct FlowerBatcher {
    height: usize,
    width: usize,
}

impl FlowerBatcher {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }
}

impl<B: Backend> Batcher<B, FlowerItem, FlowerBatch<B>> for FlowerBatcher {
    fn batch(&self, items: Vec<FlowerItem>, device: &B::Device) -> FlowerBatch<B> {
        let batch_size = items.len();

        let mut images_data = Vec::with_capacity(batch_size * self.height * self.width * CHANNELS);
        for item in &items {
            images_data.extend_from_slice(&item.image);
        }

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, self.height, self.width, CHANNELS]),
            device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        FlowerBatch { images, targets }
    }
}
