// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Streams the experiment's loss curves to two CSV files as the
// run progresses, so a crashed run still leaves its history.
//
// train_metrics.csv — one row per logged training batch
//   step,loss
//   0,2.301742
//   640,2.254031
//
// test_metrics.csv — one row per evaluation (epoch 0 = baseline)
//   samples_seen,avg_loss,correct,total,accuracy
//   0,2.303120,1032,10000,10.320000
//
// `step` / `samples_seen` count training samples consumed so
// far, giving both files a shared x-axis.
//
// Both files are truncated when the logger is created: each
// run owns its results directory.

use anyhow::{Context, Result};
use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::ml::trainer::EvalSummary;

const TRAIN_FILE:   &str = "train_metrics.csv";
const TEST_FILE:    &str = "test_metrics.csv";
const TRAIN_HEADER: &str = "step,loss";
const TEST_HEADER:  &str = "samples_seen,avg_loss,correct,total,accuracy";

/// Appends training and evaluation metrics to CSV files.
pub struct MetricsLogger {
    train_path: PathBuf,
    test_path:  PathBuf,
}

impl MetricsLogger {
    /// Create fresh CSV files (header only) inside `dir`.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let train_path = dir.join(TRAIN_FILE);
        let test_path  = dir.join(TEST_FILE);

        for (path, header) in [(&train_path, TRAIN_HEADER), (&test_path, TEST_HEADER)] {
            let mut f = File::create(path)
                .with_context(|| format!("Cannot create '{}'", path.display()))?;
            writeln!(f, "{header}")?;
            tracing::debug!("Created metrics CSV: '{}'", path.display());
        }

        Ok(Self { train_path, test_path })
    }

    /// Append one logged training point.
    pub fn log_train(&self, step: usize, loss: f64) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.train_path)?;
        writeln!(f, "{},{:.6}", step, loss)?;
        Ok(())
    }

    /// Append the result of one evaluation pass.
    pub fn log_test(&self, samples_seen: usize, summary: &EvalSummary) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.test_path)?;
        writeln!(
            f,
            "{},{:.6},{},{},{:.6}",
            samples_seen,
            summary.avg_loss,
            summary.correct,
            summary.total,
            summary.accuracy_pct(),
        )?;

        tracing::debug!(
            "Logged evaluation at {} samples: avg_loss={:.4}",
            samples_seen,
            summary.avg_loss,
        );
        Ok(())
    }

    pub fn train_path(&self) -> &Path {
        &self.train_path
    }

    pub fn test_path(&self) -> &Path {
        &self.test_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("mnist-experiment-metrics-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_new_writes_headers_only() {
        let dir = scratch_dir("headers");
        let logger = MetricsLogger::new(&dir).unwrap();

        assert_eq!(fs::read_to_string(logger.train_path()).unwrap(), "step,loss\n");
        assert_eq!(
            fs::read_to_string(logger.test_path()).unwrap(),
            "samples_seen,avg_loss,correct,total,accuracy\n"
        );
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_rows_are_appended_in_order() {
        let dir = scratch_dir("rows");
        let logger = MetricsLogger::new(&dir).unwrap();

        logger.log_train(0, 2.5).unwrap();
        logger.log_train(640, 1.25).unwrap();
        let summary = EvalSummary { avg_loss: 0.5, correct: 9_000, total: 10_000, batches: 10 };
        logger.log_test(60_000, &summary).unwrap();

        let train = fs::read_to_string(logger.train_path()).unwrap();
        assert_eq!(train, "step,loss\n0,2.500000\n640,1.250000\n");

        let test = fs::read_to_string(logger.test_path()).unwrap();
        let rows: Vec<&str> = test.lines().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], "60000,0.500000,9000,10000,90.000000");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_new_truncates_previous_run() {
        let dir = scratch_dir("truncate");
        let first = MetricsLogger::new(&dir).unwrap();
        first.log_train(0, 1.0).unwrap();

        let second = MetricsLogger::new(&dir).unwrap();
        assert_eq!(fs::read_to_string(second.train_path()).unwrap(), "step,loss\n");
        fs::remove_dir_all(&dir).unwrap();
    }
}
