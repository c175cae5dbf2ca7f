// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the experiment itself:
//
//   sample.rs  — one labelled 28x28 digit image
//   metrics.rs — append-only loss logs kept by the driver
//   traits.rs  — the DigitSource abstraction over dataset storage
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits

// A single labelled digit image
pub mod sample;

// Training / test loss logs
pub mod metrics;

// Core abstractions (traits) that other layers implement
pub mod traits;
