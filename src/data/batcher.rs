// ============================================================
// Layer 4 — MNIST Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<DigitSample>
// into the two tensors a training step needs.
//
// How batching works here:
//   Input:  Vec of N DigitSamples, 784 bytes each
//   Output: MnistBatch with images [N, 1, 28, 28] (normalised)
//           and targets [N]
//
//   All normalised pixels are flattened into one Vec<f32>
//   in sample order, then shaped as [N, C=1, H, W].

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::preprocessor::Normalizer;
use crate::domain::sample::{DigitSample, IMAGE_HEIGHT, IMAGE_WIDTH};

// ─── MnistBatch ───────────────────────────────────────────────────────────────
/// A batch of digits ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct MnistBatch<B: Backend> {
    /// Normalised images — shape: [batch_size, 1, 28, 28]
    pub images: Tensor<B, 4>,

    /// True class of each image — shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> MnistBatch<B> {
    /// Number of samples in this batch
    pub fn len(&self) -> usize {
        self.targets.dims()[0]
    }
}

// ─── MnistBatcher ─────────────────────────────────────────────────────────────
/// Stateless apart from the normalisation statistics, so the
/// same batcher serves both the autodiff and the inner backend.
#[derive(Clone, Debug)]
pub struct MnistBatcher {
    normalizer: Normalizer,
}

impl MnistBatcher {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }
}

impl Default for MnistBatcher {
    /// Standardised with the MNIST training-set mean and std
    fn default() -> Self {
        Self::new(Normalizer::default())
    }
}

impl<B: Backend> Batcher<B, DigitSample, MnistBatch<B>> for MnistBatcher {
    fn batch(&self, items: Vec<DigitSample>, device: &B::Device) -> MnistBatch<B> {
        let batch_size = items.len();

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| self.normalizer.image(&s.pixels))
            .collect();

        let labels: Vec<i64> = items
            .iter()
            .map(|s| s.label as i64)
            .collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, 1, IMAGE_HEIGHT, IMAGE_WIDTH])
                .convert::<B::FloatElem>(),
            device,
        );

        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]).convert::<B::IntElem>(),
            device,
        );

        MnistBatch { images, targets }
    }
}
