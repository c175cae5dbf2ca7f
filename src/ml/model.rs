// ============================================================
// Layer 5 — Digit Classifier
// ============================================================
// Two convolution blocks followed by two linear layers:
//
//   [N,1,28,28] → conv 5x5 → pool → [N,10,12,12]
//               → conv 5x5 → pool → [N,20,4,4]
//               → flatten 320 → 50 → 10 → log-softmax
//
// The optional batch-norm / dropout stages are chosen once by
// NetConfig and stored as Option fields on the blocks.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{log_softmax, relu},
};

use crate::data::batcher::MnistBatch;
use crate::domain::sample::NUM_CLASSES;
use crate::ml::stages::{BatchNorm, ChannelDropout, Dropout, Mode, Stage};

/// Flattened size after the second conv block: 20 channels × 4 × 4
pub const FLAT_FEATURES: usize = 320;
const HIDDEN: usize = 50;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct NetConfig {
    /// Batch norm after both conv layers and the hidden linear layer
    #[config(default = false)]
    pub batch_norm: bool,
    /// Channel dropout after the second conv layer
    #[config(default = false)]
    pub conv_dropout: bool,
    /// Dropout after the hidden linear layer
    #[config(default = true)]
    pub fc_dropout: bool,
    #[config(default = 0.5)]
    pub dropout_prob: f64,
}

impl NetConfig {
    /// Configuration with every optional branch disabled
    #[cfg(test)]
    pub fn plain() -> Self {
        Self::new().with_fc_dropout(false)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Net<B> {
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let norm = |features: usize| self.batch_norm.then(|| BatchNorm::new(features, device));

        let block1 = ConvBlock {
            conv:    Conv2dConfig::new([1, 10], [5, 5]).init(device),
            dropout: None,
            norm:    norm(10),
            pool:    pool.clone(),
        };
        let block2 = ConvBlock {
            conv:    Conv2dConfig::new([10, 20], [5, 5]).init(device),
            dropout: self.conv_dropout.then(|| ChannelDropout::new(self.dropout_prob)),
            norm:    norm(20),
            pool,
        };
        let hidden = DenseBlock {
            linear:  LinearConfig::new(FLAT_FEATURES, HIDDEN).init(device),
            norm:    norm(HIDDEN),
            dropout: self.fc_dropout.then(|| Dropout::new(self.dropout_prob)),
        };
        let output = LinearConfig::new(HIDDEN, NUM_CLASSES).init(device);

        Net { block1, block2, hidden, output }
    }
}

/// conv → [channel dropout] → [batch norm] → max-pool(2) → relu
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv:    Conv2d<B>,
    pub dropout: Option<ChannelDropout>,
    pub norm:    Option<BatchNorm<B>>,
    pub pool:    MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>, mode: Mode) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.dropout.apply(x, mode);
        let x = self.norm.apply(x, mode);
        relu(self.pool.forward(x))
    }
}

/// linear → [batch norm] → relu → [dropout]
#[derive(Module, Debug)]
pub struct DenseBlock<B: Backend> {
    pub linear:  Linear<B>,
    pub norm:    Option<BatchNorm<B>>,
    pub dropout: Option<Dropout>,
}

impl<B: Backend> DenseBlock<B> {
    pub fn forward(&self, x: Tensor<B, 2>, mode: Mode) -> Tensor<B, 2> {
        let x = self.norm.apply(self.linear.forward(x), mode);
        self.dropout.apply(relu(x), mode)
    }
}

#[derive(Module, Debug)]
pub struct Net<B: Backend> {
    pub block1: ConvBlock<B>,
    pub block2: ConvBlock<B>,
    pub hidden: DenseBlock<B>,
    pub output: Linear<B>,
}

impl<B: Backend> Net<B> {
    /// images: [batch, 1, 28, 28] → class log-probabilities [batch, 10]
    pub fn forward(&self, images: Tensor<B, 4>, mode: Mode) -> Tensor<B, 2> {
        let x = self.block1.forward(images, mode); // [batch, 10, 12, 12]
        let x = self.block2.forward(x, mode);      // [batch, 20, 4, 4]

        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.hidden.forward(x, mode);
        log_softmax(self.output.forward(x), 1)
    }

    /// Forward pass plus mean negative log-likelihood against the batch targets.
    pub fn forward_loss(&self, batch: MnistBatch<B>, mode: Mode) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let output = self.forward(batch.images, mode);
        let loss   = nll_loss(output.clone(), batch.targets, Reduction::Mean);
        (loss, output)
    }

    /// Shapes of every trainable tensor, in a fixed order:
    /// conv1, [bn1], conv2, [bn2], fc1, [bn3], fc2.
    pub fn parameter_shapes(&self) -> Vec<Vec<usize>> {
        fn norm_shapes<B: Backend>(norm: &Option<BatchNorm<B>>, shapes: &mut Vec<Vec<usize>>) {
            if let Some(norm) = norm {
                shapes.push(norm.gamma.val().dims().to_vec());
                shapes.push(norm.beta.val().dims().to_vec());
            }
        }

        let mut shapes = Vec::new();

        for block in [&self.block1, &self.block2] {
            shapes.push(block.conv.weight.val().dims().to_vec());
            if let Some(bias) = &block.conv.bias {
                shapes.push(bias.val().dims().to_vec());
            }
            norm_shapes(&block.norm, &mut shapes);
        }

        for (linear, norm) in [(&self.hidden.linear, &self.hidden.norm), (&self.output, &None)] {
            shapes.push(linear.weight.val().dims().to_vec());
            if let Some(bias) = &linear.bias {
                shapes.push(bias.val().dims().to_vec());
            }
            norm_shapes(norm, &mut shapes);
        }

        shapes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Mean,
    Sum,
}

/// Negative log-likelihood of `targets` under `log_probs` [batch, classes].
pub fn nll_loss<B: Backend>(
    log_probs: Tensor<B, 2>,
    targets:   Tensor<B, 1, Int>,
    reduction: Reduction,
) -> Tensor<B, 1> {
    let [batch_size, _] = log_probs.dims();
    let picked = log_probs
        .gather(1, targets.reshape([batch_size, 1]))
        .reshape([batch_size])
        .neg();

    match reduction {
        Reduction::Mean => picked.mean(),
        Reduction::Sum  => picked.sum(),
    }
}
