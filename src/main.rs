//! Flower Classifier CLI
//!
//! Entry point for training the flower CNN and inspecting a dataset directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use flower_classifier::backend::{backend_name, default_device, TrainingBackend};
use flower_classifier::dataset::{count_images, DatasetSplit, FlowerDataset, SplitConfig};
use flower_classifier::training::{run_training, TrainingConfig};
use flower_classifier::utils::logging::{init_logging, LogConfig};

/// Flower image classification with a small CNN
///
/// Trains on a directory with one subdirectory of photos per flower class.
#[derive(Parser, Debug)]
#[command(name = "flower_classifier")]
#[command(version)]
#[command(about = "Train a flower image classifier with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train the classifier and save the model, history and chart
    Train(TrainArgs),

    /// Show dataset statistics and split sizes
    Stats {
        /// Path to the dataset directory
        #[arg(short, long, default_value = "images")]
        data_dir: PathBuf,

        /// Fraction of images withheld for validation
        #[arg(long, default_value = "0.2")]
        validation_split: f64,

        /// Random seed for the split
        #[arg(long, default_value = "123")]
        seed: u64,
    },
}

/// Flags override values from `--config`, which override the defaults
#[derive(Args, Debug)]
struct TrainArgs {
    /// JSON file with a training configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the dataset directory [default: images]
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Model file stem; .json and .mpk are appended [default: model/myFlower1]
    #[arg(short, long)]
    model_path: Option<PathBuf>,

    /// Directory for history.json and the chart [default: output]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of training epochs [default: 10]
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Batch size [default: 128]
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Adam learning rate [default: 0.001]
    #[arg(short, long)]
    learning_rate: Option<f64>,

    /// Image height after resizing [default: 180]
    #[arg(long)]
    image_height: Option<usize>,

    /// Image width after resizing [default: 180]
    #[arg(long)]
    image_width: Option<usize>,

    /// Fraction of images withheld for validation [default: 0.2]
    #[arg(long)]
    validation_split: Option<f64>,

    /// Random seed for the split and epoch shuffling [default: 123]
    #[arg(long)]
    seed: Option<u64>,

    /// Expected number of classes; must match the dataset
    #[arg(long)]
    num_classes: Option<usize>,
}

impl TrainArgs {
    fn into_config(self) -> Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::load(path)
                .with_context(|| format!("Failed to load config {:?}", path))?,
            None => TrainingConfig::default(),
        };

        if let Some(v) = self.data_dir {
            config.data_dir = v;
        }
        if let Some(v) = self.model_path {
            config.model_path = v;
        }
        if let Some(v) = self.output_dir {
            config.output_dir = v;
        }
        if let Some(v) = self.epochs {
            config.epochs = v;
        }
        if let Some(v) = self.batch_size {
            config.batch_size = v;
        }
        if let Some(v) = self.learning_rate {
            config.learning_rate = v;
        }
        if let Some(v) = self.image_height {
            config.image_height = v;
        }
        if let Some(v) = self.image_width {
            config.image_width = v;
        }
        if let Some(v) = self.validation_split {
            config.validation_split = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if self.num_classes.is_some() {
            config.num_classes = self.num_classes;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Train(args) => {
            let config = args.into_config()?;
            cmd_train(&config)?;
        }
        Commands::Stats {
            data_dir,
            validation_split,
            seed,
        } => {
            cmd_stats(&data_dir, validation_split, seed)?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ==============================================
   Flower Classifier
   Small CNN image classification with Burn
 =============================================="#
            .green()
    );
    println!("  Backend: {} ({:?})", backend_name(), default_device());
    println!();
}

fn cmd_train(config: &TrainingConfig) -> Result<()> {
    info!("Starting training with {:?}", config);

    let report = run_training::<TrainingBackend>(config)?;

    println!();
    println!("{}", "Outputs:".cyan().bold());
    println!("  Model:   {:?}", report.model_path);
    println!("  History: {:?}", report.history_path);
    println!("  Chart:   {:?}", report.chart_path);

    Ok(())
}

fn cmd_stats(data_dir: &Path, validation_split: f64, seed: u64) -> Result<()> {
    println!("{}", "Dataset Statistics".cyan().bold());
    println!("  Data directory: {:?}", data_dir);
    println!("  *.jpg files:    {}", count_images(data_dir));

    let dataset = FlowerDataset::new(data_dir)?;
    dataset.get_stats().print();

    let split = DatasetSplit::from_dataset(&dataset, SplitConfig::new(validation_split, seed)?)?;
    println!();
    println!("{}", "Split:".cyan().bold());
    println!("  Training samples:   {}", split.training.len());
    println!("  Validation samples: {}", split.validation.len());

    Ok(())
}
