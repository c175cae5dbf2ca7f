// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Filesystem concerns shared by the application layer:
//
//   results.rs — The results directory and the experiment
//                configuration saved into it as JSON, so a
//                run can be matched to its settings later.
//
//   metrics.rs — CSV logs of the training loss curve and the
//                per-evaluation test results, the raw data
//                behind the loss plots.
//
// No model weights or optimiser state are ever written.

/// Results directory and experiment config persistence
pub mod results;

/// Training / test metrics CSV logger
pub mod metrics;
