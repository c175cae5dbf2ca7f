// ============================================================
// Layer 4 — Pixel Normaliser
// ============================================================
// Converts raw pixel bytes into the float inputs the network
// expects, in two steps per pixel:
//
//   1. scale 0..=255 into 0.0..=1.0
//   2. standardise with the dataset-wide mean and std
//
//   x = (p / 255 - 0.1307) / 0.3081
//
// The constants are the mean and standard deviation of the
// MNIST training set and are used for both partitions.

/// Mean pixel intensity of the MNIST training set (after /255)
pub const MNIST_MEAN: f32 = 0.1307;

/// Standard deviation of pixel intensity of the MNIST training set
pub const MNIST_STD: f32 = 0.3081;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    mean: f32,
    std:  f32,
}

impl Normalizer {
    /// Normaliser with explicit statistics
    pub fn new(mean: f32, std: f32) -> Self {
        assert!(std > 0.0, "standard deviation must be positive, got {std}");
        Self { mean, std }
    }

    /// Normalise a single raw pixel
    pub fn pixel(&self, p: u8) -> f32 {
        (p as f32 / 255.0 - self.mean) / self.std
    }

    /// Normalise a whole image, preserving pixel order
    pub fn image(&self, pixels: &[u8]) -> Vec<f32> {
        pixels.iter().map(|&p| self.pixel(p)).collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(MNIST_MEAN, MNIST_STD)
    }
}
