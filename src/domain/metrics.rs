// ============================================================
// Layer 3 — Metrics Record
// ============================================================
// The driver keeps four append-only sequences while the
// experiment runs. They are what a learning-curve plot needs:
//
//   train_counter[i], train_losses[i] — one point every
//       `log_interval` training batches
//   test_counter[i],  test_losses[i]  — one point per
//       evaluation (baseline + once per epoch)
//
// test_counter is known up front: evaluation i happens after
// i full passes over the training set.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub train_losses:  Vec<f64>,
    pub train_counter: Vec<usize>,
    pub test_losses:   Vec<f64>,
    pub test_counter:  Vec<usize>,
}

impl MetricsRecord {
    /// Create an empty record with the test x-axis precomputed
    /// for `epochs` epochs over `train_len` samples.
    pub fn new(epochs: usize, train_len: usize) -> Self {
        Self {
            test_counter: (0..=epochs).map(|i| i * train_len).collect(),
            ..Self::default()
        }
    }

    /// Append one training loss point.
    pub fn record_train(&mut self, step: usize, loss: f64) {
        self.train_counter.push(step);
        self.train_losses.push(loss);
    }

    /// Append one evaluation loss.
    pub fn record_test(&mut self, loss: f64) {
        self.test_losses.push(loss);
    }

    /// Iterate (samples_seen, test_loss) pairs recorded so far
    pub fn test_points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.test_counter.iter().copied().zip(self.test_losses.iter().copied())
    }

    /// Iterate (step, train_loss) pairs recorded so far
    pub fn train_points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.train_counter.iter().copied().zip(self.train_losses.iter().copied())
    }
}

/// Synthetic step index used as the x-coordinate of a training loss:
/// samples consumed in earlier epochs plus `batch_index` full batches.
pub fn train_step_counter(
    epoch:       usize,
    batch_index: usize,
    batch_size:  usize,
    train_len:   usize,
) -> usize {
    batch_index * batch_size + (epoch - 1) * train_len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_is_precomputed() {
        let m = MetricsRecord::new(3, 60_000);
        assert_eq!(m.test_counter, vec![0, 60_000, 120_000, 180_000]);
        assert!(m.test_losses.is_empty());
    }

    #[test]
    fn test_train_step_counter() {
        assert_eq!(train_step_counter(1, 0, 64, 60_000), 0);
        assert_eq!(train_step_counter(1, 10, 64, 60_000), 640);
        assert_eq!(train_step_counter(2, 10, 64, 60_000), 60_640);
    }

    #[test]
    fn test_points_pair_up() {
        let mut m = MetricsRecord::new(1, 100);
        m.record_test(2.3);
        m.record_train(0, 2.31);
        m.record_train(640, 1.9);
        assert_eq!(m.test_points().collect::<Vec<_>>(), vec![(0, 2.3)]);
        assert_eq!(m.train_points().count(), 2);
    }
}
