//! Logging Module
//!
//! Structured logging through the `tracing` crate, plus a small epoch logger
//! used by the training loop.

use std::time::Instant;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Most verbose level that is displayed
    pub level: Level,
    /// Whether to include target (module path)
    pub include_target: bool,
    /// Whether to include thread IDs
    pub include_thread_ids: bool,
    /// Whether to use ANSI colors
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            include_target: false,
            include_thread_ids: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    /// Debug level with module paths and thread IDs, for `--verbose`
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            include_target: true,
            include_thread_ids: true,
            ..Self::default()
        }
    }
}

/// Install the global tracing subscriber.
///
/// Returns an error message if a subscriber was already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), String> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level)
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_thread_ids(config.include_thread_ids)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}

/// Per-epoch timing logger for the training loop
pub struct TrainingLogger {
    epoch: usize,
    total_epochs: usize,
    epoch_start: Instant,
    training_start: Instant,
}

impl TrainingLogger {
    pub fn new(total_epochs: usize) -> Self {
        Self {
            epoch: 0,
            total_epochs,
            epoch_start: Instant::now(),
            training_start: Instant::now(),
        }
    }

    /// Log start of an epoch (0-indexed)
    pub fn start_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
        self.epoch_start = Instant::now();

        tracing::debug!("Epoch {}/{} started", epoch + 1, self.total_epochs);
    }

    /// Log end of an epoch with its four tracked metrics
    pub fn end_epoch(&self, loss: f64, accuracy: f64, val_loss: f64, val_accuracy: f64) {
        let epoch_time = self.epoch_start.elapsed();
        let total_time = self.training_start.elapsed();

        let epochs_remaining = self.total_epochs.saturating_sub(self.epoch + 1);
        let avg_epoch_time = total_time.as_secs_f64() / (self.epoch + 1) as f64;
        let eta_secs = epochs_remaining as f64 * avg_epoch_time;

        tracing::info!(
            "Epoch {}/{} completed in {:.1}s | loss: {:.4} | accuracy: {:.4} | val_loss: {:.4} | val_accuracy: {:.4} | ETA: {:.0}s",
            self.epoch + 1,
            self.total_epochs,
            epoch_time.as_secs_f64(),
            loss,
            accuracy,
            val_loss,
            val_accuracy,
            eta_secs
        );
    }

    /// Log training completion
    pub fn log_complete(&self, final_val_accuracy: f64) {
        tracing::info!(
            "Training complete! {} epochs in {:.1}s | Final val accuracy: {:.2}%",
            self.total_epochs,
            self.training_start.elapsed().as_secs_f64(),
            final_val_accuracy * 100.0
        );
    }
}
