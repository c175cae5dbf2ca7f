use burn::data::dataset::Dataset;

use crate::domain::sample::DigitSample;

/// One MNIST partition held in memory (60k train images are ~47MB).
pub struct MnistDataset {
    samples: Vec<DigitSample>,
}

impl MnistDataset {
    pub fn new(samples: Vec<DigitSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// Number of batches an epoch yields, counting a final partial batch
    pub fn num_batches(&self, batch_size: usize) -> usize {
        self.samples.len().div_ceil(batch_size)
    }
}

impl Dataset<DigitSample> for MnistDataset {
    fn get(&self, index: usize) -> Option<DigitSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
