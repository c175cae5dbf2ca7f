// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each.
//
// Rules for this layer:
//   - No tensor math or model code here (Layer 5)
//   - No argument parsing here (Layer 1)
//   - File formats belong to Layers 4 and 6
//   - Only workflow coordination

// The full train / evaluate schedule
pub mod experiment;

// Peek at the first test batch
pub mod inspect;
