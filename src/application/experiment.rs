// ============================================================
// Layer 2 — Experiment
// ============================================================
// Runs the fixed schedule end to end:
//
//   Step 1: Seed the backend            (Layer 5 - ml)
//   Step 2: Prepare results directory   (Layer 6 - infra)
//   Step 3: Load both partitions        (Layer 4 - data)
//   Step 4: Build the two data loaders  (Layer 4 - data)
//   Step 5: Build model and optimiser   (Layer 5 - ml)
//   Step 6: Baseline evaluation         (Layer 5 - ml)
//   Step 7: Train / evaluate per epoch  (Layer 5 - ml)
//
// The driver is generic over the autodiff backend so tests can
// run the same code path on small in-memory partitions.

use anyhow::{Context, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::{AutodiffModule, Module},
    optim::{momentum::MomentumConfig, SgdConfig},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data::{batcher::{MnistBatch, MnistBatcher}, dataset::MnistDataset, loader::MnistFiles};
use crate::domain::metrics::MetricsRecord;
use crate::domain::traits::{DigitSource, Split};
use crate::infra::{metrics::MetricsLogger, results::ResultsDir};
use crate::ml::{
    model::{Net, NetConfig},
    trainer::{evaluate, train_epoch, EpochPlan},
    TrainBackend,
};

// ─── Experiment Configuration ─────────────────────────────────────────────────
// The fixed hyperparameters of the run. Only the two directories
// are exposed on the command line; the rest are constants that are
// saved alongside the results for reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub data_dir:         String,
    pub results_dir:      String,
    pub batch_size_train: usize,
    pub batch_size_test:  usize,
    pub learning_rate:    f64,
    pub momentum:         f64,
    pub epochs:           usize,
    pub log_interval:     usize,
    pub seed:             u64,
    pub net:              NetConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            data_dir:         "files".to_string(),
            results_dir:      "results".to_string(),
            batch_size_train: 64,
            batch_size_test:  1000,
            learning_rate:    0.01,
            momentum:         0.5,
            epochs:           3,
            log_interval:     10,
            seed:             1,
            net:              NetConfig::new(),
        }
    }
}

// ─── Experiment ───────────────────────────────────────────────────────────────
pub struct Experiment {
    config: ExperimentConfig,
}

impl Experiment {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    /// Run the experiment on the default backend against the MNIST files
    /// under `data_dir`, downloading them if needed.
    pub fn execute(&self) -> Result<MetricsRecord> {
        let device = Default::default();
        let source = MnistFiles::new(&self.config.data_dir);
        self.run_with::<TrainBackend>(&source, &device)
    }

    pub fn run_with<B: AutodiffBackend>(
        &self,
        source: &impl DigitSource,
        device: &B::Device,
    ) -> Result<MetricsRecord> {
        let cfg = &self.config;

        // ── Step 1: Seed before anything random is constructed ────────────────
        B::seed(device, cfg.seed);

        // ── Step 2: Results directory, config, fresh CSV logs ─────────────────
        let results = ResultsDir::create(&cfg.results_dir)?;
        results.save_config(cfg)?;
        let logger = MetricsLogger::new(results.path())?;

        // ── Step 3: Load both partitions ──────────────────────────────────────
        let train_dataset = MnistDataset::new(
            source.load(Split::Train).context("Failed to load training partition")?,
        );
        let test_dataset = MnistDataset::new(
            source.load(Split::Test).context("Failed to load test partition")?,
        );
        let train_len   = train_dataset.sample_count();
        let num_batches = train_dataset.num_batches(cfg.batch_size_train);
        tracing::info!(
            "Loaded {} training and {} test samples",
            train_len,
            test_dataset.sample_count()
        );

        // ── Step 4: Data loaders ──────────────────────────────────────────────
        // No worker threads: batch order depends only on the seed.
        let train_loader: Arc<dyn DataLoader<B, MnistBatch<B>>> =
            DataLoaderBuilder::new(MnistBatcher::default())
                .batch_size(cfg.batch_size_train)
                .shuffle(cfg.seed)
                .set_device(device.clone())
                .build(train_dataset);

        let test_loader: Arc<dyn DataLoader<B::InnerBackend, MnistBatch<B::InnerBackend>>> =
            DataLoaderBuilder::new(MnistBatcher::default())
                .batch_size(cfg.batch_size_test)
                .shuffle(cfg.seed)
                .set_device(device.clone())
                .build(test_dataset);

        // ── Step 5: Model and SGD with momentum ───────────────────────────────
        let mut model: Net<B> = cfg.net.init(device);
        tracing::info!(
            "Model ready: {} parameters (batch_norm={}, conv_dropout={}, fc_dropout={})",
            model.num_params(),
            cfg.net.batch_norm,
            cfg.net.conv_dropout,
            cfg.net.fc_dropout,
        );
        for shape in model.parameter_shapes() {
            tracing::debug!("  parameter {:?}", shape);
        }

        let mut optim = SgdConfig::new()
            .with_momentum(Some(
                MomentumConfig::new()
                    .with_momentum(cfg.momentum)
                    .with_dampening(0.0),
            ))
            .init::<B, Net<B>>();

        let mut record = MetricsRecord::new(cfg.epochs, train_len);

        // ── Step 6: Baseline evaluation of the untrained model ────────────────
        let summary = evaluate(&model.valid(), test_loader.iter(), &mut record);
        logger.log_test(record.test_counter[0], &summary)?;

        // ── Step 7: Alternate one training epoch and one evaluation ───────────
        for epoch in 1..=cfg.epochs {
            let plan = EpochPlan {
                epoch,
                learning_rate: cfg.learning_rate,
                batch_size:    cfg.batch_size_train,
                log_interval:  cfg.log_interval,
                train_len,
                num_batches,
            };

            let logged_before = record.train_counter.len();
            model = train_epoch(model, &mut optim, train_loader.iter(), &plan, &mut record);
            for (step, loss) in record.train_points().skip(logged_before) {
                logger.log_train(step, loss)?;
            }

            let summary = evaluate(&model.valid(), test_loader.iter(), &mut record);
            logger.log_test(record.test_counter[epoch], &summary)?;

            tracing::info!(
                "Epoch {}/{} done: test avg_loss={:.4}, accuracy={:.2}%",
                epoch,
                cfg.epochs,
                summary.avg_loss,
                summary.accuracy_pct(),
            );
        }

        tracing::info!("Metrics written to '{}'", results.path().display());
        Ok(record)
    }
}
