//! CNN Model Architecture for Flower Classification
//!
//! A small sequential network built with Burn:
//! rescaling, three conv/pool blocks with doubling filter counts, then two
//! dense layers ending in one logit per class.

use std::fmt;

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

use crate::dataset::RESCALE_FACTOR;

/// Number of conv/pool blocks in the feature extractor
pub const NUM_CONV_BLOCKS: usize = 3;

/// Configuration for the FlowerClassifier CNN model
#[derive(Config, Debug)]
pub struct FlowerClassifierConfig {
    /// Number of output classes
    pub num_classes: usize,

    /// Input image height
    #[config(default = "180")]
    pub image_height: usize,

    /// Input image width
    #[config(default = "180")]
    pub image_width: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Filters of the first block; each following block doubles it
    #[config(default = "16")]
    pub base_filters: usize,

    /// Convolution kernel size
    #[config(default = "3")]
    pub kernel_size: usize,

    /// Units in the dense hidden layer
    #[config(default = "128")]
    pub hidden_units: usize,
}

impl FlowerClassifierConfig {
    /// Output channels of each conv block: 16 -> 32 -> 64 by default
    pub fn conv_filters(&self) -> [usize; NUM_CONV_BLOCKS] {
        [
            self.base_filters,
            self.base_filters * 2,
            self.base_filters * 4,
        ]
    }

    /// Spatial size `(height, width)` after all pooling stages
    pub fn feature_map_size(&self) -> (usize, usize) {
        let mut h = self.image_height;
        let mut w = self.image_width;
        for _ in 0..NUM_CONV_BLOCKS {
            h /= 2;
            w /= 2;
        }
        (h, w)
    }

    /// Length of the flattened feature vector fed to the dense layers
    pub fn flattened_features(&self) -> usize {
        let (h, w) = self.feature_map_size();
        self.conv_filters()[NUM_CONV_BLOCKS - 1] * h * w
    }

    /// Check the configuration can produce a non-empty feature map
    pub fn validate(&self) -> Result<(), String> {
        if self.num_classes == 0 {
            return Err("num_classes must be > 0".to_string());
        }
        if self.base_filters == 0 || self.hidden_units == 0 || self.in_channels == 0 {
            return Err("layer widths must be > 0".to_string());
        }
        if self.kernel_size % 2 == 0 {
            return Err("kernel_size must be odd for same padding".to_string());
        }
        let (h, w) = self.feature_map_size();
        if h == 0 || w == 0 {
            return Err(format!(
                "image size {}x{} is too small for {} pooling stages",
                self.image_height, self.image_width, NUM_CONV_BLOCKS
            ));
        }
        Ok(())
    }
}

/// Multiplies every input value by a fixed factor
#[derive(Module, Clone, Debug)]
pub struct Rescaling {
    pub scale: f64,
}

impl Rescaling {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    pub fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        x.mul_scalar(self.scale)
    }
}

/// Conv2d (same padding) -> ReLU -> MaxPool2d(2x2, stride 2)
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub relu: Relu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        device: &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Self {
            conv,
            relu: Relu::new(),
            pool,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Flower classifier CNN
///
/// Architecture:
/// - Rescaling(1/255) on raw NHWC input, then NHWC -> NCHW
/// - 3 convolutional blocks (16, 32, 64 filters), each halving the spatial size
/// - Flatten
/// - Dense(128) + ReLU
/// - Dense(num_classes), raw logits
#[derive(Module, Debug)]
pub struct FlowerClassifier<B: Backend> {
    pub rescaling: Rescaling,

    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,

    pub fc1: Linear<B>,
    pub fc2: Linear<B>,

    num_classes: usize,
}

impl<B: Backend> FlowerClassifier<B> {
    /// Create a new FlowerClassifier with freshly initialized weights
    pub fn new(config: &FlowerClassifierConfig, device: &B::Device) -> Self {
        let [f1, f2, f3] = config.conv_filters();
        let k = config.kernel_size;

        let conv1 = ConvBlock::new(config.in_channels, f1, k, device); // 180 -> 90
        let conv2 = ConvBlock::new(f1, f2, k, device); // 90 -> 45
        let conv3 = ConvBlock::new(f2, f3, k, device); // 45 -> 22

        let fc1 = LinearConfig::new(config.flattened_features(), config.hidden_units).init(device);
        let fc2 = LinearConfig::new(config.hidden_units, config.num_classes).init(device);

        Self {
            rescaling: Rescaling::new(RESCALE_FACTOR as f64),
            conv1,
            conv2,
            conv3,
            fc1,
            fc2,
            num_classes: config.num_classes,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `images` - Raw intensities with shape `[batch, height, width, channels]`
    ///
    /// # Returns
    /// * Logits with shape `[batch, num_classes]`
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.rescaling.forward(images);
        let x = x.permute([0, 3, 1, 2]);

        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);

        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.fc1.forward(x);
        let x = Relu::new().forward(x);
        self.fc2.forward(x)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Layer-by-layer summary for a model built from `config`
    pub fn summary(&self, config: &FlowerClassifierConfig) -> ModelSummary {
        let mut layers = Vec::new();
        let mut h = config.image_height;
        let mut w = config.image_width;

        layers.push(LayerSummary::new(
            "rescaling",
            "Rescaling",
            vec![h, w, config.in_channels],
            0,
        ));

        let blocks = [&self.conv1, &self.conv2, &self.conv3];
        for (i, (block, filters)) in blocks.iter().zip(config.conv_filters()).enumerate() {
            layers.push(LayerSummary::new(
                &format!("conv2d_{}", i + 1),
                "Conv2D",
                vec![h, w, filters],
                block.conv.num_params(),
            ));
            h /= 2;
            w /= 2;
            layers.push(LayerSummary::new(
                &format!("max_pooling2d_{}", i + 1),
                "MaxPooling2D",
                vec![h, w, filters],
                0,
            ));
        }

        layers.push(LayerSummary::new(
            "flatten",
            "Flatten",
            vec![config.flattened_features()],
            0,
        ));
        layers.push(LayerSummary::new(
            "dense_1",
            "Dense",
            vec![config.hidden_units],
            self.fc1.num_params(),
        ));
        layers.push(LayerSummary::new(
            "dense_2",
            "Dense",
            vec![config.num_classes],
            self.fc2.num_params(),
        ));

        ModelSummary {
            layers,
            total_params: self.num_params(),
        }
    }
}

/// One row of a model summary
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSummary {
    pub name: String,
    pub kind: String,
    /// Output shape without the batch dimension
    pub output_shape: Vec<usize>,
    pub params: usize,
}

impl LayerSummary {
    fn new(name: &str, kind: &str, output_shape: Vec<usize>, params: usize) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            output_shape,
            params,
        }
    }
}

/// Per-layer output shapes and parameter counts
#[derive(Debug, Clone)]
pub struct ModelSummary {
    pub layers: Vec<LayerSummary>,
    pub total_params: usize,
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "_".repeat(65);
        writeln!(f, "{}", rule)?;
        writeln!(f, "{:<30}{:<25}{:>10}", "Layer (type)", "Output Shape", "Param #")?;
        writeln!(f, "{}", "=".repeat(65))?;
        for layer in &self.layers {
            let dims: Vec<String> = layer.output_shape.iter().map(|d| d.to_string()).collect();
            let shape = format!("(None, {})", dims.join(", "));
            writeln!(
                f,
                "{:<30}{:<25}{:>10}",
                format!("{} ({})", layer.name, layer.kind),
                shape,
                layer.params
            )?;
        }
        writeln!(f, "{}", "=".repeat(65))?;
        writeln!(f, "Total params: {}", self.total_params)?;
        write!(f, "{}", rule)
    }
}
