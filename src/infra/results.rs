// ============================================================
// Layer 6 — Results Directory
// ============================================================
// Everything an experiment run leaves behind:
//
//   results/
//     experiment_config.json  ← settings the run used
//     train_metrics.csv       ← written by MetricsLogger
//     test_metrics.csv        ← written by MetricsLogger

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::experiment::ExperimentConfig;

const CONFIG_FILE: &str = "experiment_config.json";

/// The directory that receives a run's configuration and metrics.
pub struct ResultsDir {
    dir: PathBuf,
}

impl ResultsDir {
    /// Open the results directory, creating it (and parents) if missing.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create results directory '{}'", dir.display()))?;
        tracing::debug!("Results directory ready: '{}'", dir.display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Write the experiment configuration as pretty JSON.
    pub fn save_config(&self, cfg: &ExperimentConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved experiment config to '{}'", path.display());
        Ok(())
    }
}
