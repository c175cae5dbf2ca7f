// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `inspect`.
//
// Only filesystem locations are flags. The hyperparameters are
// the fixed constants of ExperimentConfig::default() and are
// recorded in the results directory instead.

use clap::{Args, Subcommand};
use crate::application::experiment::ExperimentConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the digit classifier for three epochs and evaluate after each
    Train(TrainArgs),

    /// Show the shape and first labels of the first test batch
    Inspect(InspectArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding (or receiving) MNIST/raw/*.gz
    #[arg(long, default_value = "files")]
    pub data_dir: String,

    /// Directory receiving the experiment config and metric CSVs
    #[arg(long, default_value = "results")]
    pub results_dir: String,
}

/// Convert CLI TrainArgs into the application-layer ExperimentConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for ExperimentConfig {
    fn from(a: TrainArgs) -> Self {
        ExperimentConfig {
            data_dir:    a.data_dir,
            results_dir: a.results_dir,
            ..ExperimentConfig::default()
        }
    }
}

/// All arguments for the `inspect` command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Directory holding (or receiving) MNIST/raw/*.gz
    #[arg(long, default_value = "files")]
    pub data_dir: String,

    /// How many leading labels to print
    #[arg(long, default_value_t = 10)]
    pub count: usize,
}
