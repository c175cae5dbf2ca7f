// ============================================================
// Layer 2 — Inspect
// ============================================================
// Loads the test partition through the same shuffled loader the
// experiment evaluates with and reports what its first batch
// looks like: tensor shape and the leading labels. Useful to
// confirm the data directory is complete before a long run.

use anyhow::{Context, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};
use std::sync::Arc;

use crate::application::experiment::ExperimentConfig;
use crate::data::{
    batcher::{MnistBatch, MnistBatcher},
    dataset::MnistDataset,
};
use crate::domain::traits::{DigitSource, Split};

/// Shape and leading labels of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPreview {
    /// [batch, channels, height, width]
    pub shape:  [usize; 4],
    pub labels: Vec<i64>,
    /// Smallest and largest normalised pixel value in the batch
    pub pixel_range: (f32, f32),
}

pub struct InspectUseCase {
    config: ExperimentConfig,
}

impl InspectUseCase {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    /// Build the first test batch and keep up to `count` of its labels.
    pub fn first_test_batch<B: Backend>(
        &self,
        source: &impl DigitSource,
        count:  usize,
        device: &B::Device,
    ) -> Result<BatchPreview> {
        let samples = source
            .load(Split::Test)
            .context("Failed to load test partition")?;
        tracing::info!("Loaded {} test samples", samples.len());

        let loader: Arc<dyn DataLoader<B, MnistBatch<B>>> =
            DataLoaderBuilder::new(MnistBatcher::default())
                .batch_size(self.config.batch_size_test)
                .shuffle(self.config.seed)
                .set_device(device.clone())
                .build(MnistDataset::new(samples));

        let batch = loader
            .iter()
            .next()
            .context("Test partition is empty")?;

        let shape  = batch.images.dims();
        let labels = batch
            .targets
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| anyhow::anyhow!("Cannot read batch labels: {e:?}"))?;

        let pixel_min = batch.images.clone().min().into_scalar().elem::<f32>();
        let pixel_max = batch.images.max().into_scalar().elem::<f32>();

        Ok(BatchPreview {
            shape,
            labels: labels.into_iter().take(count).collect(),
            pixel_range: (pixel_min, pixel_max),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::data::preprocessor::{MNIST_MEAN, MNIST_STD};
    use crate::domain::sample::{DigitSample, IMAGE_PIXELS};

    struct TestOnly(Vec<DigitSample>);

    impl DigitSource for TestOnly {
        fn load(&self, split: Split) -> Result<Vec<DigitSample>> {
            match split {
                Split::Test  => Ok(self.0.clone()),
                Split::Train => anyhow::bail!("train partition not available"),
            }
        }
    }

    fn digits(n: usize) -> Vec<DigitSample> {
        (0..n)
            .map(|i| {
                let value = if i % 2 == 0 { 0 } else { 255 };
                DigitSample::new(vec![value; IMAGE_PIXELS], (i % 10) as u8)
            })
            .collect()
    }

    #[test]
    fn test_first_batch_is_capped_at_test_batch_size() {
        let source = TestOnly(digits(1_500));
        let preview = InspectUseCase::new(ExperimentConfig::default())
            .first_test_batch::<NdArray>(&source, 6, &Default::default())
            .unwrap();

        assert_eq!(preview.shape, [1000, 1, 28, 28]);
        assert_eq!(preview.labels.len(), 6);
        assert!(preview.labels.iter().all(|l| (0..10).contains(l)));

        let lo = (0.0 - MNIST_MEAN) / MNIST_STD;
        let hi = (1.0 - MNIST_MEAN) / MNIST_STD;
        assert!((preview.pixel_range.0 - lo).abs() < 1e-5);
        assert!((preview.pixel_range.1 - hi).abs() < 1e-5);
    }

    #[test]
    fn test_small_partition_yields_partial_batch() {
        let source = TestOnly(digits(7));
        let preview = InspectUseCase::new(ExperimentConfig::default())
            .first_test_batch::<NdArray>(&source, 20, &Default::default())
            .unwrap();

        assert_eq!(preview.shape[0], 7);
        assert_eq!(preview.labels.len(), 7);
    }

    #[test]
    fn test_empty_partition_errors() {
        let source = TestOnly(Vec::new());
        let err = InspectUseCase::new(ExperimentConfig::default())
            .first_test_batch::<NdArray>(&source, 5, &Default::default())
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
