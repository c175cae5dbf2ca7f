// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and delegates everything else to Layer 2.
//
//   1. `train`   — runs the fixed MNIST schedule
//   2. `inspect` — previews the first test batch

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InspectArgs, TrainArgs};

use crate::domain::metrics::MetricsRecord;

#[derive(Parser, Debug)]
#[command(
    name = "mnist-experiment",
    version = "0.1.0",
    about = "Train and evaluate a small convolutional MNIST classifier."
)]
pub struct Cli {
    /// The subcommand to run (train or inspect)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the matching use case; the CLI layer never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Inspect(args) => run_inspect(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::experiment::Experiment;

    tracing::info!("Starting experiment with MNIST data in: {}", args.data_dir);

    let record = Experiment::new(args.into()).execute()?;

    if let Some(line) = final_test_loss(&record) {
        tracing::info!("{line}");
    }
    Ok(())
}

/// Diagnostic summary of the last evaluation, if any ran.
fn final_test_loss(record: &MetricsRecord) -> Option<String> {
    record
        .test_points()
        .last()
        .map(|(samples, loss)| format!("Final test loss after {} training samples: {:.4}", samples, loss))
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::{
        experiment::ExperimentConfig,
        inspect::InspectUseCase,
    };
    use crate::data::loader::MnistFiles;
    use crate::ml::InnerBackend;

    let config = ExperimentConfig {
        data_dir: args.data_dir.clone(),
        ..ExperimentConfig::default()
    };
    let source  = MnistFiles::new(&args.data_dir);
    let preview = InspectUseCase::new(config)
        .first_test_batch::<InnerBackend>(&source, args.count, &Default::default())?;

    println!("First test batch: images {:?}", preview.shape);
    println!("Leading labels:   {:?}", preview.labels);
    println!(
        "Pixel range:      [{:.4}, {:.4}]",
        preview.pixel_range.0, preview.pixel_range.1
    );
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_test_loss_uses_last_evaluation() {
        let mut record = MetricsRecord::new(3, 60_000);
        assert_eq!(final_test_loss(&record), None);

        for loss in [2.3, 0.4, 0.25, 0.125] {
            record.record_test(loss);
        }
        assert_eq!(
            final_test_loss(&record).as_deref(),
            Some("Final test loss after 180000 training samples: 0.1250")
        );
    }
}
