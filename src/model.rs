use crate::dataset::{Cifar100Batch, IMAGE_BYTES, IMAGE_DEPTH, IMAGE_SIZE};
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::loss::CrossEntropyLossConfig;
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Initializer, Linear, LinearConfig, Relu};
use burn::prelude::*;
use burn::train::ClassificationOutput;

/// LeNet-style classifier: two valid-padded convolution/pooling stages
/// followed by three dense layers, scores one per fine-grained class.
#[derive(Config, Debug)]
pub struct LeNetConfig {
    #[config(default = 100)]
    pub num_classes: usize,
    #[config(default = 6)]
    pub conv_channels: usize,
    #[config(default = 5)]
    pub kernel_size: usize,
    #[config(default = 2)]
    pub pool_size: usize,
    #[config(default = 120)]
    pub fc1_units: usize,
    #[config(default = 84)]
    pub fc2_units: usize,
}

impl LeNetConfig {
    /// Side length left after one valid convolution and one pooling pass.
    fn stage_output(&self, size: usize) -> usize {
        (size - self.kernel_size + 1) / self.pool_size
    }

    /// Flattened feature count handed to the first dense layer.
    pub fn feature_len(&self) -> usize {
        let side = self.stage_output(self.stage_output(IMAGE_SIZE));
        self.conv_channels * side * side
    }

    /// Returns the initialized model. Weights and biases of every stage are
    /// Xavier-uniform.
    pub fn init<B: Backend>(&self, device: &B::Device) -> LeNet<B> {
        let xavier = Initializer::XavierUniform { gain: 1.0 };
        LeNet {
            conv1: Conv2dConfig::new(
                [IMAGE_DEPTH, self.conv_channels],
                [self.kernel_size; 2],
            )
            .with_initializer(xavier.clone())
            .init(device),
            conv2: Conv2dConfig::new(
                [self.conv_channels, self.conv_channels],
                [self.kernel_size; 2],
            )
            .with_initializer(xavier.clone())
            .init(device),
            pool: MaxPool2dConfig::new([self.pool_size; 2])
                .with_strides([self.pool_size; 2])
                .init(),
            fc1: LinearConfig::new(self.feature_len(), self.fc1_units)
                .with_initializer(xavier.clone())
                .init(device),
            fc2: LinearConfig::new(self.fc1_units, self.fc2_units)
                .with_initializer(xavier.clone())
                .init(device),
            output: LinearConfig::new(self.fc2_units, self.num_classes)
                .with_initializer(xavier)
                .init(device),
            activation: Relu::new(),
        }
    }
}

#[derive(Module, Debug)]
pub struct LeNet<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub pool: MaxPool2d,
    pub fc1: Linear<B>,
    pub fc2: Linear<B>,
    pub output: Linear<B>,
    pub activation: Relu,
}

impl<B: Backend> LeNet<B> {
    /// Maps flat pixel rows to raw per-class scores.
    ///
    /// # Shapes
    /// input [batch_size, IMAGE_BYTES], output [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch_size, row_len] = x.dims();
        assert_eq!(row_len, IMAGE_BYTES);

        let x = x.reshape([batch_size, IMAGE_DEPTH, IMAGE_SIZE, IMAGE_SIZE]);
        let x = self.activation.forward(self.conv1.forward(x));
        let x = self.pool.forward(x);
        let x = self.activation.forward(self.conv2.forward(x));
        let x = self.pool.forward(x);

        let x = x.flatten(1, 3);
        let x = self.activation.forward(self.fc1.forward(x));
        let x = self.activation.forward(self.fc2.forward(x));
        self.output.forward(x)
    }

    pub fn forward_classification(&self, batch: Cifar100Batch<B>) -> ClassificationOutput<B> {
        let targets = batch.targets;
        let logits = self.forward(batch.images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets.clone());

        ClassificationOutput::new(loss, logits, targets)
    }
}
