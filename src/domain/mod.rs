// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits describing the core concepts:
//
//   snapshot.rs — ParameterSnapshot, the learnable state of a
//                 model as named flat tensors
//   accuracy.rs — AccuracyTally / AccuracyResult for evaluation
//   traits.rs   — StateDict, implemented by the network
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O or network calls
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// Named parameter tensors and compatibility checks
pub mod snapshot;

/// Correct / total counting and the integer percentage
pub mod accuracy;

/// Core abstractions that other layers implement
pub mod traits;
