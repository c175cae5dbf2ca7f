// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the IDX files on disk to tensor batches:
//
//   IDX .gz files
//       │
//       ▼
//   MnistFiles        → downloads if missing, decodes samples
//       │
//       ▼
//   MnistDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   MnistBatcher      → normalises and stacks into tensors
//       │
//       ▼
//   DataLoader        → seeded, reshuffled every pass

/// Downloads and parses the MNIST IDX files
pub mod loader;

/// Pixel scaling and standardisation
pub mod preprocessor;

/// Implements Burn's Dataset trait over in-memory samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
