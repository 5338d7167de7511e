// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that runs tensors through the network.
//
//   model.rs     — The CIFAR-10 convolutional network
//                  conv(3→6,5) → relu → pool
//                  conv(6→16,5) → relu → pool
//                  fc(400→120) → relu → fc(120→84) → relu → fc(84→10)
//                  plus conversion to and from ParameterSnapshot
//
//   trainer.rs   — The training loop: forward pass, cross-entropy
//                  loss, backward pass, SGD-with-momentum step,
//                  progress logging and the final checkpoint
//
//   evaluator.rs — Accuracy over the test split, run on the
//                  non-autodiff backend
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            LeCun et al. (1998) Gradient-Based Learning

/// Convolutional network architecture
pub mod model;

/// Training loop with progress logging and checkpointing
pub mod trainer;

/// Test split accuracy
pub mod evaluator;

// ─── Backends ─────────────────────────────────────────────────────────────────
// CPU by default; `--features wgpu` moves both training and
// evaluation onto the GPU.
#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

/// Gradient-recording wrapper around `InferBackend`
pub type TrainBackend = burn::backend::Autodiff<InferBackend>;
