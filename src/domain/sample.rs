// ============================================================
// Layer 3 — DigitSample Domain Type
// ============================================================
// One MNIST example exactly as it is stored on disk:
// 784 grayscale bytes (row-major 28x28) and a class label.
//
// Normalisation to float happens later in the batcher, so a
// sample stays cheap to clone and never changes after loading.

use serde::{Deserialize, Serialize};

/// Image height in pixels
pub const IMAGE_HEIGHT: usize = 28;
/// Image width in pixels
pub const IMAGE_WIDTH: usize = 28;
/// Number of pixels in one image
pub const IMAGE_PIXELS: usize = IMAGE_HEIGHT * IMAGE_WIDTH;
/// Number of digit classes (0-9)
pub const NUM_CLASSES: usize = 10;

/// A labelled 28x28 grayscale digit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitSample {
    /// Raw pixel intensities 0..=255, row-major
    pub pixels: Vec<u8>,

    /// The digit shown in the image, 0..=9
    pub label: u8,
}

impl DigitSample {
    /// Create a new sample.
    ///
    /// # Panics
    /// Panics if `pixels` is not exactly 784 bytes or the label
    /// is not a valid class. Loaders validate both before calling.
    pub fn new(pixels: Vec<u8>, label: u8) -> Self {
        assert_eq!(
            pixels.len(),
            IMAGE_PIXELS,
            "a digit image must have {} pixels, got {}",
            IMAGE_PIXELS,
            pixels.len()
        );
        assert!(
            (label as usize) < NUM_CLASSES,
            "label {} is outside 0..{}",
            label,
            NUM_CLASSES
        );
        Self { pixels, label }
    }
}
