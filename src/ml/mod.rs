// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network and optimisation code lives here.
//
//   stages.rs  — Mode plus the optional pipeline stages
//                (batch norm, dropout, channel dropout)
//   model.rs   — The two-conv / two-linear digit classifier
//                and the negative log-likelihood loss
//   trainer.rs — One training epoch and one evaluation pass

/// Explicit train/eval mode and optional regularisation stages
pub mod stages;

/// Convolutional classifier architecture
pub mod model;

/// Training and evaluation loops
pub mod trainer;

/// Backend the experiment evaluates on (no autodiff)
#[cfg(not(feature = "wgpu"))]
pub type InnerBackend = burn::backend::NdArray;
#[cfg(feature = "wgpu")]
pub type InnerBackend = burn::backend::Wgpu;

/// Backend the experiment trains on
pub type TrainBackend = burn::backend::Autodiff<InnerBackend>;
