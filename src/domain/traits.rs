// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// StateDict is the seam between a concrete network and the
// rest of the system: trainer, evaluator and checkpoint store
// only ever see ParameterSnapshots going in and out.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::collections::BTreeMap;

use crate::domain::snapshot::ParameterSnapshot;

// ─── StateDict ────────────────────────────────────────────────────────────────
/// A model whose learnable state can be read out as a snapshot
/// and replaced from one.
pub trait StateDict: Sized {
    type Error;

    /// Name → shape of every parameter this architecture owns.
    /// A snapshot must match this exactly to be loadable.
    fn parameter_shapes() -> BTreeMap<String, Vec<usize>>;

    /// Copy every parameter out into a snapshot.
    fn state_dict(&self) -> Result<ParameterSnapshot, Self::Error>;

    /// Replace every parameter with the snapshot's values.
    /// Must fail without modifying anything if keys or shapes
    /// disagree with `parameter_shapes()`.
    fn load_state_dict(self, snapshot: &ParameterSnapshot) -> Result<Self, Self::Error>;
}
