//! Error Handling Module
//!
//! Defines the error type for the flower classifier library.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for flower classifier operations
#[derive(Error, Debug)]
pub enum FlowerError {
    /// Error loading or decoding an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// The dataset directory contains no usable images
    #[error("No images found under '{0}'")]
    EmptyDataset(PathBuf),

    /// Error with model construction or persistence
    #[error("Model error: {0}")]
    Model(String),

    /// Error while training
    #[error("Training error: {0}")]
    Training(String),

    /// Loss became NaN or infinite
    #[error("Non-finite loss at epoch {epoch}, batch {batch}")]
    NonFiniteLoss { epoch: usize, batch: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

impl From<serde_json::Error> for FlowerError {
    fn from(err: serde_json::Error) -> Self {
        FlowerError::Serialization(err.to_string())
    }
}

/// Convenience Result type for flower classifier operations
pub type Result<T> = std::result::Result<T, FlowerError>;

/// Extension trait for adding context to foreign errors
pub trait ResultExt<T> {
    /// Wrap the error with a lazily built message
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| FlowerError::InvalidInput(format!("{}: {}", f(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlowerError::Dataset("test error".to_string());
        assert_eq!(format!("{}", err), "Dataset error: test error");
    }

    #[test]
    fn test_non_finite_loss_display() {
        let err = FlowerError::NonFiniteLoss { epoch: 3, batch: 7 };
        assert_eq!(err.to_string(), "Non-finite loss at epoch 3, batch 7");
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/path/to/rose.jpg");
        let err = FlowerError::ImageLoad(path, "truncated file".to_string());
        assert!(format!("{}", err).contains("rose.jpg"));
    }

    #[test]
    fn test_result_with_context() {
        let result: std::result::Result<i32, std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));

        let err = result
            .with_context(|| format!("Failed to read {}", "model.json"))
            .unwrap_err();
        assert!(matches!(err, FlowerError::InvalidInput(_)));
        assert!(err.to_string().contains("Failed to read model.json: file not found"));
    }
}
