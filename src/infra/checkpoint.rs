// ============================================================
// Layer 6 — Checkpoint Store
// ============================================================
// Saves and restores ParameterSnapshots as safetensors files.
//
// What gets written per checkpoint:
//   1. <path>               — every parameter as a named f32 tensor,
//                             header metadata {"format", "parameters"}
//   2. <path stem>.json     — the TrainConfig of the run (optional,
//                             via save_config)
//
// A checkpoint is a single slot: saving again to the same path
// overwrites it, last write wins.
//
// Reference: https://huggingface.co/docs/safetensors
//            Rust Book §9 (Error Handling)

use std::{
    collections::HashMap,
    fs,
    io,
    path::{Path, PathBuf},
};

use safetensors::{tensor::TensorView, Dtype, SafeTensors};
use thiserror::Error;

use crate::application::train_use_case::TrainConfig;
use crate::domain::snapshot::ParameterSnapshot;

/// Value of the "format" metadata entry written into every checkpoint
const FORMAT: &str = "cifar-net";

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint '{}' not found. Have you trained the model first?", .0.display())]
    NotFound(PathBuf),

    #[error("io error at {}: {source}", .path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot decode checkpoint '{}': {reason}", .path.display())]
    Deserialization { path: PathBuf, reason: String },

    #[error("parameter '{name}' is stored as {dtype}, only F32 is supported")]
    UnsupportedDtype { name: String, dtype: String },

    #[error("cannot encode parameter '{name}': {reason}")]
    Serialization { name: String, reason: String },

    #[error("invalid run config at {}: {source}", .path.display())]
    Config {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and writes parameter snapshots. Every call names its own path.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckpointStore;

impl CheckpointStore {
    pub fn new() -> Self {
        Self
    }

    /// Write `snapshot` to `path`, creating parent directories and
    /// replacing any existing file.
    pub fn save(
        &self,
        snapshot: &ParameterSnapshot,
        path:     impl AsRef<Path>,
    ) -> Result<(), CheckpointError> {
        let path = path.as_ref();
        create_parent(path)?;

        // safetensors stores raw little-endian bytes; keep the buffers
        // alive while the views borrow them
        let buffers: Vec<(&str, Vec<usize>, Vec<u8>)> = snapshot
            .iter()
            .map(|(name, tensor)| {
                let bytes = tensor.values().iter().flat_map(|v| v.to_le_bytes()).collect();
                (name, tensor.shape().to_vec(), bytes)
            })
            .collect();

        let views = buffers
            .iter()
            .map(|(name, shape, bytes)| {
                TensorView::new(Dtype::F32, shape.clone(), bytes)
                    .map(|view| (*name, view))
                    .map_err(|e| CheckpointError::Serialization {
                        name:   name.to_string(),
                        reason: format!("{e:?}"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let metadata = HashMap::from([
            ("format".to_string(), FORMAT.to_string()),
            ("parameters".to_string(), snapshot.num_values().to_string()),
        ]);

        let encoded = safetensors::serialize(views, &Some(metadata)).map_err(|e| {
            CheckpointError::Serialization {
                name:   "<header>".to_string(),
                reason: format!("{e:?}"),
            }
        })?;

        fs::write(path, encoded).map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(
            "Saved {} tensors ({} values) to '{}'",
            snapshot.len(),
            snapshot.num_values(),
            path.display()
        );
        Ok(())
    }

    /// Read a snapshot back from `path`.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<ParameterSnapshot, CheckpointError> {
        let path  = path.as_ref();
        let bytes = fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => CheckpointError::NotFound(path.to_path_buf()),
            _ => CheckpointError::Io { path: path.to_path_buf(), source },
        })?;

        let corrupt = |reason: String| CheckpointError::Deserialization {
            path: path.to_path_buf(),
            reason,
        };

        let (_, header) = SafeTensors::read_metadata(&bytes).map_err(|e| corrupt(format!("{e:?}")))?;
        match header.metadata().as_ref().and_then(|m| m.get("format")) {
            Some(format) if format == FORMAT => {}
            other => tracing::warn!(
                "Checkpoint '{}' has format tag {:?}, expected '{}'",
                path.display(),
                other,
                FORMAT
            ),
        }

        let tensors = SafeTensors::deserialize(&bytes).map_err(|e| corrupt(format!("{e:?}")))?;

        let mut snapshot = ParameterSnapshot::new();
        for (name, view) in tensors.tensors() {
            if view.dtype() != Dtype::F32 {
                return Err(CheckpointError::UnsupportedDtype {
                    name,
                    dtype: format!("{:?}", view.dtype()),
                });
            }
            let values = view
                .data()
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            snapshot
                .insert(name, view.shape().to_vec(), values)
                .map_err(|e| corrupt(e.to_string()))?;
        }

        tracing::debug!("Loaded {} tensors from '{}'", snapshot.len(), path.display());
        Ok(snapshot)
    }

    /// Path of the run config that accompanies a checkpoint
    pub fn config_path(checkpoint: impl AsRef<Path>) -> PathBuf {
        checkpoint.as_ref().with_extension("json")
    }

    /// Save the run configuration next to the checkpoint as pretty JSON.
    pub fn save_config(
        &self,
        cfg:        &TrainConfig,
        checkpoint: impl AsRef<Path>,
    ) -> Result<(), CheckpointError> {
        let path = Self::config_path(checkpoint);
        create_parent(&path)?;

        let json = serde_json::to_string_pretty(cfg).map_err(|source| CheckpointError::Config {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| CheckpointError::Io { path: path.clone(), source })?;

        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(())
    }

    /// Load the run configuration saved by `save_config`.
    pub fn load_config(&self, checkpoint: impl AsRef<Path>) -> Result<TrainConfig, CheckpointError> {
        let path = Self::config_path(checkpoint);
        let json = fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => CheckpointError::NotFound(path.clone()),
            _ => CheckpointError::Io { path: path.clone(), source },
        })?;
        serde_json::from_str(&json).map_err(|source| CheckpointError::Config { path, source })
    }
}

fn create_parent(path: &Path) -> Result<(), CheckpointError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| CheckpointError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}
