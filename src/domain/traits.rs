// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer asks for "the training partition" or
// "the test partition" without knowing whether the samples
// come from IDX files on disk or from memory in a test.

use anyhow::Result;
use crate::domain::sample::DigitSample;

// ─── Split ────────────────────────────────────────────────────────────────────
/// The two fixed dataset partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// 60,000 training images
    Train,
    /// 10,000 held-out test images
    Test,
}

impl Split {
    /// File-name prefix used by the IDX distribution
    pub fn file_prefix(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test  => "t10k",
        }
    }
}

// ─── DigitSource ──────────────────────────────────────────────────────────────
/// Any component that can produce the samples of a partition.
///
/// Implementations:
///   - MnistFiles → IDX files under a local directory, downloaded on demand
pub trait DigitSource {
    /// Load every sample of the given partition, in storage order.
    fn load(&self, split: Split) -> Result<Vec<DigitSample>>;
}
