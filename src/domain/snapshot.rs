// ============================================================
// Layer 3 — Parameter Snapshot
// ============================================================
// The complete learnable state of a network at one instant:
// an ordered mapping from parameter name to a flat tensor.
//
//   "conv1.bias"   → shape [6],           6 values
//   "conv1.weight" → shape [6, 3, 5, 5],  450 values
//   ...
//
// Snapshots are plain Rust data (no Burn types), so the
// checkpoint store and the tests can build and compare them
// without a backend.
//
// Invariants:
//   - values.len() == product(shape) for every entry
//   - entries are kept sorted by name (BTreeMap)
//
// Reference: Rust Book §8 (Hash Maps / collections)
//            Rust Book §9 (Recoverable Errors with Result)

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised when a snapshot does not fit a model architecture.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("parameter '{name}' has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        name:     String,
        expected: Vec<usize>,
        found:    Vec<usize>,
    },

    #[error("parameter '{0}' is missing from the snapshot")]
    MissingParameter(String),

    #[error("snapshot contains unexpected parameter '{0}'")]
    UnexpectedParameter(String),

    #[error("parameter '{name}' declares shape {shape:?} ({expected} values) but holds {found} values")]
    LengthMismatch {
        name:     String,
        shape:    Vec<usize>,
        expected: usize,
        found:    usize,
    },
}

// ─── TensorSnapshot ───────────────────────────────────────────────────────────
/// One parameter tensor: its shape and its values in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSnapshot {
    shape:  Vec<usize>,
    values: Vec<f32>,
}

impl TensorSnapshot {
    /// Dimensions of the tensor, outermost first
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Flat row-major values
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Number of scalar values (product of the shape)
    pub fn numel(&self) -> usize {
        self.values.len()
    }

    pub fn into_parts(self) -> (Vec<usize>, Vec<f32>) {
        (self.shape, self.values)
    }
}

// ─── ParameterSnapshot ────────────────────────────────────────────────────────
/// Ordered name → tensor mapping covering every learnable parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSnapshot {
    entries: BTreeMap<String, TensorSnapshot>,
}

impl ParameterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a parameter.
    ///
    /// Fails with `LengthMismatch` when the number of values does
    /// not equal the product of the shape.
    pub fn insert(
        &mut self,
        name:   impl Into<String>,
        shape:  Vec<usize>,
        values: Vec<f32>,
    ) -> Result<(), SnapshotError> {
        let name     = name.into();
        let expected = shape.iter().product::<usize>();
        if values.len() != expected {
            return Err(SnapshotError::LengthMismatch {
                name,
                shape,
                expected,
                found: values.len(),
            });
        }
        self.entries.insert(name, TensorSnapshot { shape, values });
        Ok(())
    }

    /// Remove a parameter and hand back ownership of its tensor
    pub fn take(&mut self, name: &str) -> Option<TensorSnapshot> {
        self.entries.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TensorSnapshot)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of scalar parameters across all tensors
    pub fn num_values(&self) -> usize {
        self.entries.values().map(TensorSnapshot::numel).sum()
    }

    /// Name → shape view of the snapshot
    pub fn shapes(&self) -> BTreeMap<String, Vec<usize>> {
        self.entries
            .iter()
            .map(|(name, t)| (name.clone(), t.shape.clone()))
            .collect()
    }

    /// True when no value is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.entries
            .values()
            .all(|t| t.values.iter().all(|v| v.is_finite()))
    }

    /// Verify that this snapshot can initialise a model whose
    /// parameters have exactly the `expected` names and shapes.
    ///
    /// Checks are made in name order, so the first reported error
    /// is deterministic.
    pub fn check_against(
        &self,
        expected: &BTreeMap<String, Vec<usize>>,
    ) -> Result<(), SnapshotError> {
        for (name, shape) in expected {
            let Some(found) = self.entries.get(name) else {
                return Err(SnapshotError::MissingParameter(name.clone()));
            };
            if found.shape != *shape {
                return Err(SnapshotError::ShapeMismatch {
                    name:     name.clone(),
                    expected: shape.clone(),
                    found:    found.shape.clone(),
                });
            }
        }

        if let Some(extra) = self.entries.keys().find(|k| !expected.contains_key(*k)) {
            return Err(SnapshotError::UnexpectedParameter(extra.clone()));
        }

        Ok(())
    }
}
