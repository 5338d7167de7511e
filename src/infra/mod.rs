// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence that doesn't belong to any one
// business layer:
//
//   checkpoint.rs — Saving and loading ParameterSnapshots as
//                   safetensors files, plus the JSON run config
//                   written next to each checkpoint.
//
//   metrics.rs    — Training progress logging. Appends the mean
//                   loss of every logging window to a CSV file.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling)

/// Parameter snapshot persistence
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
