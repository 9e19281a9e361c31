//! Training loop for the flower classifier
//!
//! A hand-written loop over Burn's autodiff API rather than the high-level
//! `Learner`: cross-entropy on logits, Adam updates, and a validation pass
//! with the inner (non-autodiff) backend after every epoch.

use std::path::PathBuf;
use std::time::Instant;

use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::{AutodiffModule, Module},
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion, Int, Tensor,
    },
};
use chrono::Local;
use colored::Colorize;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dataset::{
    batch_indices, count_images, normalize_pixels, value_range, DatasetSplit, FlowerBatch,
    FlowerBatcher, FlowerBurnDataset, FlowerDataset,
};
use crate::model::checkpoint::{save_model, weights_path};
use crate::model::cnn::FlowerClassifier;
use crate::model::config::TrainingConfig;
use crate::training::history::{EpochMetrics, TrainingHistory};
use crate::utils::charts::generate_history_chart;
use crate::utils::error::{FlowerError, Result};
use crate::utils::logging::TrainingLogger;
use crate::utils::{format_duration, format_number};

/// File name of the serialized history inside the output directory
pub const HISTORY_FILE: &str = "history.json";

/// File name of the accuracy/loss chart inside the output directory
pub const CHART_FILE: &str = "training_history.svg";

/// Epsilon added to Adam's second-moment denominator
pub const ADAM_EPSILON: f32 = 1e-7;

/// Running loss/accuracy totals over one pass
#[derive(Debug, Default)]
struct MetricAccumulator {
    loss_sum: f64,
    correct: usize,
    seen: usize,
}

impl MetricAccumulator {
    /// Add a batch whose mean loss is `batch_loss`
    fn add(&mut self, batch_loss: f64, correct: usize, batch_len: usize) {
        self.loss_sum += batch_loss * batch_len as f64;
        self.correct += correct;
        self.seen += batch_len;
    }

    fn finish(&self) -> EpochMetrics {
        if self.seen == 0 {
            return EpochMetrics::default();
        }
        EpochMetrics {
            loss: self.loss_sum / self.seen as f64,
            accuracy: self.correct as f64 / self.seen as f64,
        }
    }
}

/// Number of rows whose arg-max logit equals the target
fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let [batch_size, _] = logits.dims();
    let predictions = logits.argmax(1).reshape([batch_size]);
    let correct: i64 = predictions
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem();
    correct as usize
}

/// Trainer for the FlowerClassifier model
pub struct Trainer<B: AutodiffBackend> {
    model: FlowerClassifier<B>,
    config: TrainingConfig,
    batcher: FlowerBatcher,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(model: FlowerClassifier<B>, config: TrainingConfig, device: B::Device) -> Self {
        let batcher = FlowerBatcher::new(config.image_height, config.image_width);
        Self {
            model,
            config,
            batcher,
            device,
        }
    }

    /// Train for `config.epochs` epochs, validating after each one.
    ///
    /// Returns one history entry per completed epoch. A non-finite batch loss
    /// stops training with [`FlowerError::NonFiniteLoss`].
    pub fn fit(
        &mut self,
        train: &FlowerBurnDataset,
        val: &FlowerBurnDataset,
    ) -> Result<TrainingHistory> {
        if train.is_empty() {
            return Err(FlowerError::Training("Training subset is empty".to_string()));
        }
        if val.is_empty() {
            return Err(FlowerError::Training(
                "Validation subset is empty; increase validation_split or add images".to_string(),
            ));
        }

        let mut optimizer = AdamConfig::new().with_epsilon(ADAM_EPSILON).init();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut order: Vec<usize> = (0..train.len()).collect();

        let mut history = TrainingHistory::default();
        let mut logger = TrainingLogger::new(self.config.epochs);

        for epoch in 0..self.config.epochs {
            logger.start_epoch(epoch);
            println!(
                "{}",
                format!("Epoch {}/{}", epoch + 1, self.config.epochs)
                    .yellow()
                    .bold()
            );

            order.shuffle(&mut rng);
            let train_metrics = self.train_epoch(&mut optimizer, train, &order, epoch)?;

            let val_metrics = evaluate(
                &self.model.valid(),
                val,
                &self.batcher,
                self.config.batch_size,
                &self.device,
            )?;

            println!(
                "  {} loss: {:.4} - accuracy: {:.4} - val_loss: {:.4} - val_accuracy: {:.4}",
                "→".cyan(),
                train_metrics.loss,
                train_metrics.accuracy,
                val_metrics.loss,
                val_metrics.accuracy
            );

            logger.end_epoch(
                train_metrics.loss,
                train_metrics.accuracy,
                val_metrics.loss,
                val_metrics.accuracy,
            );
            history.record(train_metrics, val_metrics);
        }

        if let Some(final_acc) = history.final_val_accuracy() {
            logger.log_complete(final_acc);
        }

        Ok(history)
    }

    fn train_epoch<O>(
        &mut self,
        optimizer: &mut O,
        dataset: &FlowerBurnDataset,
        order: &[usize],
        epoch: usize,
    ) -> Result<EpochMetrics>
    where
        O: Optimizer<FlowerClassifier<B>, B>,
    {
        let batch_size = self.config.batch_size;
        let num_batches = order.len().div_ceil(batch_size);
        let mut metrics = MetricAccumulator::default();

        for (batch_idx, range) in batch_indices(order.len(), batch_size).enumerate() {
            let items = order[range]
                .iter()
                .map(|&i| dataset.try_get(i))
                .collect::<Result<Vec<_>>>()?;
            let batch: FlowerBatch<B> =
                Batcher::<B, _, _>::batch(&self.batcher, items, &self.device);
            let batch_len = batch.targets.dims()[0];

            let output = self.model.forward(batch.images);
            let loss = CrossEntropyLossConfig::new()
                .init(&output.device())
                .forward(output.clone(), batch.targets.clone());

            let loss_value: f64 = loss.clone().into_scalar().elem();
            if !loss_value.is_finite() {
                warn!("Loss became {} at batch {}", loss_value, batch_idx + 1);
                return Err(FlowerError::NonFiniteLoss {
                    epoch: epoch + 1,
                    batch: batch_idx + 1,
                });
            }

            let correct = count_correct(output.detach(), batch.targets);
            metrics.add(loss_value, correct, batch_len);

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);
            self.model = optimizer.step(self.config.learning_rate, self.model.clone(), grads);

            debug!(
                "  Batch {}/{}: loss = {:.4}, running acc = {:.4}",
                batch_idx + 1,
                num_batches,
                loss_value,
                metrics.finish().accuracy
            );
        }

        Ok(metrics.finish())
    }

    pub fn into_model(self) -> FlowerClassifier<B> {
        self.model
    }
}

/// Loss and accuracy of `model` over a whole dataset, in dataset order
pub fn evaluate<B: Backend>(
    model: &FlowerClassifier<B>,
    dataset: &FlowerBurnDataset,
    batcher: &FlowerBatcher,
    batch_size: usize,
    device: &B::Device,
) -> Result<EpochMetrics> {
    let mut metrics = MetricAccumulator::default();
    let loss_fn = CrossEntropyLossConfig::new().init(device);

    for range in batch_indices(dataset.len(), batch_size) {
        let items = dataset.load_range(range)?;
        let batch: FlowerBatch<B> = Batcher::<B, _, _>::batch(batcher, items, device);
        let batch_len = batch.targets.dims()[0];

        let output = model.forward(batch.images);
        let loss = loss_fn.forward(output.clone(), batch.targets.clone());
        let loss_value: f64 = loss.into_scalar().elem();

        metrics.add(loss_value, count_correct(output, batch.targets), batch_len);
    }

    Ok(metrics.finish())
}

/// Outcome of a full training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub history: TrainingHistory,
    pub class_names: Vec<String>,
    pub train_samples: usize,
    pub val_samples: usize,
    /// Stem passed to `save_model`
    pub model_path: PathBuf,
    pub history_path: PathBuf,
    pub chart_path: PathBuf,
    pub started_at: String,
    pub duration_secs: f64,
}

/// Run the whole pipeline described by `config`.
///
/// Scans `data_dir`, splits it, trains the CNN, saves the model under
/// `model_path` and writes the history and its chart into `output_dir`.
///
/// # Type Parameters
/// * `B` - The autodiff backend to use (e.g., `Autodiff<NdArray>` or `Autodiff<Cuda>`)
pub fn run_training<B: AutodiffBackend>(config: &TrainingConfig) -> Result<TrainingReport> {
    config.validate()?;

    let started = Instant::now();
    let started_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let device = B::Device::default();

    println!("{}", "Initializing Training...".green().bold());
    println!("  Data directory: {:?}", config.data_dir);
    println!("  Device: {:?}", device);
    println!("  Images found: {}", format_number(count_images(&config.data_dir)));

    // Scan dataset
    let dataset = FlowerDataset::new(&config.data_dir)?;
    let num_classes = dataset.num_classes();
    if let Some(expected) = config.num_classes {
        if expected != num_classes {
            return Err(FlowerError::Config(format!(
                "num_classes is {} but {:?} has {} class directories",
                expected, config.data_dir, num_classes
            )));
        }
    }

    println!();
    dataset.get_stats().print();
    println!("  Class names: {:?}", dataset.class_names);

    let split = DatasetSplit::from_dataset(&dataset, config.split_config()?)?;
    println!();
    println!("{}", "Dataset Splits:".cyan().bold());
    println!("  Training samples:   {}", split.training.len());
    println!("  Validation samples: {}", split.validation.len());

    let train_dataset = FlowerBurnDataset::new(
        split.training_pairs(),
        config.image_height,
        config.image_width,
    );
    let val_dataset = FlowerBurnDataset::new(
        split.validation_pairs(),
        config.image_height,
        config.image_width,
    );

    // First batch diagnostics
    let batcher = FlowerBatcher::new(config.image_height, config.image_width);
    if let Some(range) = batch_indices(train_dataset.len(), config.batch_size).next() {
        let items = train_dataset.load_range(range)?;
        let mut first_image = items.first().map(|item| item.image.clone()).unwrap_or_default();
        let batch: FlowerBatch<B> = Batcher::<B, _, _>::batch(&batcher, items, &device);

        println!();
        println!("{}", "First Batch:".cyan().bold());
        println!("  Image batch shape: {:?}", batch.images.dims());
        println!("  Label batch shape: {:?}", batch.targets.dims());

        normalize_pixels(&mut first_image);
        if let Some((lo, hi)) = value_range(&first_image) {
            println!("  Normalized pixel range: {:.4} .. {:.4}", lo, hi);
        }
    }

    // Model
    let model_config = config.model_config(num_classes);
    model_config.validate().map_err(FlowerError::Config)?;
    let model = FlowerClassifier::<B>::new(&model_config, &device);

    println!();
    println!("{}", "Model:".cyan().bold());
    println!("{}", model.summary(&model_config));
    info!(
        "Created model with {} parameters for {} classes",
        format_number(model.num_params()),
        num_classes
    );

    println!();
    println!("{}", "Training Configuration:".cyan().bold());
    println!("  Epochs:        {}", config.epochs);
    println!("  Batch size:    {}", config.batch_size);
    println!("  Learning rate: {}", config.learning_rate);
    println!("  Image size:    {}x{}", config.image_height, config.image_width);
    println!();

    println!("{}", "Starting Training...".green().bold());
    let mut trainer = Trainer::new(model, config.clone(), device);
    let history = trainer.fit(&train_dataset, &val_dataset)?;
    let model = trainer.into_model();

    println!();
    println!("{}", "Saving Model...".cyan());
    save_model(&model, &model_config, &config.model_path)?;
    println!("  Saved to: {:?}", weights_path(&config.model_path));

    let history_path = config.output_dir.join(HISTORY_FILE);
    history.save_json(&history_path)?;

    let chart_path = config.output_dir.join(CHART_FILE);
    generate_history_chart(&history, &chart_path)?;
    info!("Training history chart written to {:?}", chart_path);
    println!("  Chart: {:?}", chart_path);

    let duration_secs = started.elapsed().as_secs_f64();
    println!();
    println!("{}", "Training Complete!".green().bold());
    if let Some((epoch, acc)) = history.best_val_accuracy() {
        println!(
            "  Best validation accuracy: {:.2}% (epoch {})",
            acc * 100.0,
            epoch + 1
        );
    }
    println!("  Total time: {}", format_duration(duration_secs));

    Ok(TrainingReport {
        history,
        class_names: split.class_names.clone(),
        train_samples: split.training.len(),
        val_samples: split.validation.len(),
        model_path: config.model_path.clone(),
        history_path,
        chart_path,
        started_at,
        duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::FlowerItem;
    use crate::model::cnn::FlowerClassifierConfig;
    use burn::backend::Autodiff;
    use burn_ndarray::NdArray;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    type TestBackend = NdArray;
    type TestAutodiffBackend = Autodiff<NdArray>;

    const SIZE: usize = 16;

    fn write_samples(dir: &Path, per_class: usize) -> Vec<(PathBuf, usize)> {
        let colors = [[220u8, 30, 40], [30, 200, 60]];
        let mut samples = Vec::new();
        for (label, color) in colors.iter().enumerate() {
            for i in 0..per_class {
                let path = dir.join(format!("c{}_{}.png", label, i));
                RgbImage::from_pixel(20, 20, Rgb(*color)).save(&path).unwrap();
                samples.push((path, label));
            }
        }
        samples
    }

    fn small_model<B: Backend>(device: &B::Device) -> FlowerClassifier<B> {
        let config = FlowerClassifierConfig::new(2)
            .with_image_height(SIZE)
            .with_image_width(SIZE);
        FlowerClassifier::new(&config, device)
    }

    fn small_config(epochs: usize) -> TrainingConfig {
        TrainingConfig {
            epochs,
            batch_size: 3,
            image_height: SIZE,
            image_width: SIZE,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_accumulator_weights_by_samples() {
        let mut acc = MetricAccumulator::default();
        acc.add(1.0, 3, 4);
        acc.add(4.0, 0, 1);

        let metrics = acc.finish();
        assert!((metrics.loss - 1.6).abs() < 1e-12);
        assert!((metrics.accuracy - 0.6).abs() < 1e-12);
        assert_eq!(MetricAccumulator::default().finish(), EpochMetrics::default());
    }

    #[test]
    fn test_count_correct() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats(
            [[2.0, 0.1], [0.3, 0.9], [5.0, -1.0]],
            &device,
        );
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 1], &device);

        assert_eq!(count_correct(logits, targets), 2);
    }

    #[test]
    fn test_evaluate_covers_every_sample() {
        let dir = tempfile::tempdir().unwrap();
        let samples = write_samples(dir.path(), 4);
        let dataset = FlowerBurnDataset::new(samples, SIZE, SIZE);
        let device = Default::default();
        let model = small_model::<TestBackend>(&device);

        let metrics = evaluate(&model, &dataset, &FlowerBatcher::new(SIZE, SIZE), 3, &device)
            .unwrap();

        assert!(metrics.loss.is_finite() && metrics.loss > 0.0);
        assert!((0.0..=1.0).contains(&metrics.accuracy));
        // two classes of four identical images each
        assert!([0.0, 0.5, 1.0].contains(&metrics.accuracy));
    }

    #[test]
    fn test_fit_records_one_entry_per_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let mut train = write_samples(dir.path(), 5);
        let val = train.split_off(7);

        let train = FlowerBurnDataset::new(train, SIZE, SIZE);
        let val = FlowerBurnDataset::new(val, SIZE, SIZE);

        let device = Default::default();
        let model = small_model::<TestAutodiffBackend>(&device);
        let mut trainer = Trainer::new(model, small_config(3), device);

        let history = trainer.fit(&train, &val).unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(history.accuracy.len(), 3);
        assert_eq!(history.val_accuracy.len(), 3);
        assert_eq!(history.val_loss.len(), 3);
        assert!(history.loss.iter().all(|l| l.is_finite()));
    }

    #[test]
    fn test_fit_rejects_empty_validation() {
        let dir = tempfile::tempdir().unwrap();
        let train = FlowerBurnDataset::new(write_samples(dir.path(), 2), SIZE, SIZE);
        let val = FlowerBurnDataset::new(Vec::new(), SIZE, SIZE);

        let device = Default::default();
        let mut trainer = Trainer::new(
            small_model::<TestAutodiffBackend>(&device),
            small_config(1),
            device,
        );

        assert!(matches!(
            trainer.fit(&train, &val),
            Err(FlowerError::Training(_))
        ));
    }

    #[test]
    fn test_diverging_learning_rate_stops_with_non_finite_loss() {
        let dir = tempfile::tempdir().unwrap();
        let mut train = write_samples(dir.path(), 4);
        let val = train.split_off(6);

        let train = FlowerBurnDataset::new(train, SIZE, SIZE);
        let val = FlowerBurnDataset::new(val, SIZE, SIZE);

        let config = TrainingConfig {
            batch_size: 2,
            learning_rate: 1e30,
            ..small_config(3)
        };
        let device = Default::default();
        let mut trainer = Trainer::new(small_model::<TestAutodiffBackend>(&device), config, device);

        let result = trainer.fit(&train, &val);

        assert!(
            matches!(result, Err(FlowerError::NonFiniteLoss { epoch, batch }) if epoch >= 1 && batch >= 1),
            "expected a non-finite loss error, got {:?}",
            result.map(|h| h.len())
        );
    }

    #[test]
    fn test_adam_epsilon() {
        assert_eq!(ADAM_EPSILON, 1e-7);
    }

    #[test]
    fn test_fit_surfaces_unreadable_images() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.jpg");
        std::fs::write(&broken, b"not an image").unwrap();

        let train = FlowerBurnDataset::new(vec![(broken, 0)], SIZE, SIZE);
        let val = FlowerBurnDataset::new(write_samples(dir.path(), 1), SIZE, SIZE);

        let device = Default::default();
        let mut trainer = Trainer::new(
            small_model::<TestAutodiffBackend>(&device),
            small_config(1),
            device,
        );

        assert!(matches!(
            trainer.fit(&train, &val),
            Err(FlowerError::ImageLoad(_, _))
        ));
    }

    #[test]
    fn test_in_memory_items_batch_on_inner_backend() {
        let device = Default::default();
        let items = vec![FlowerItem::from_data(vec![0.0; SIZE * SIZE * 3], 1, "x".into())];
        let batch: FlowerBatch<TestBackend> =
            Batcher::<TestBackend, _, _>::batch(&FlowerBatcher::new(SIZE, SIZE), items, &device);
        let logits = small_model::<TestBackend>(&device).forward(batch.images);
        assert_eq!(logits.dims(), [1, 2]);
    }
}
