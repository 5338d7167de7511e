// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Validate the configuration
//   Step 2: Open the dataset               (Layer 4 - data)
//   Step 3: Load initial weights, if any   (Layer 6 - infra)
//   Step 4: Open the metrics CSV           (Layer 6 - infra)
//   Step 5: Run the training loop          (Layer 5 - ml)
//   Step 6: Save the run config            (Layer 6 - infra)
//
// The trained snapshot is both written to the checkpoint path
// and returned, so `run` can evaluate it without reloading.
// The config beside the checkpoint is only replaced by a run
// that completed, so it always describes the saved weights.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::DatasetError,
    provider::{DatasetProvider, Split},
};
use crate::domain::snapshot::ParameterSnapshot;
use crate::infra::{checkpoint::CheckpointStore, metrics::MetricsLogger};
use crate::ml::{trainer::run_training, TrainBackend};

// ─── Data Source ──────────────────────────────────────────────────────────────
// Where the labelled images of a run come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    /// CIFAR-10, cached under `data_dir`
    Cifar10 { data_dir: String },

    /// Seeded random images, no download needed
    Synthetic { train_len: usize, test_len: usize, seed: u64 },
}

impl DataSource {
    pub fn provider(&self) -> Result<DatasetProvider, DatasetError> {
        match self {
            DataSource::Cifar10 { data_dir } => DatasetProvider::cifar10(data_dir),
            DataSource::Synthetic { train_len, test_len, seed } => {
                Ok(DatasetProvider::synthetic(*train_len, *test_len, *seed))
            }
        }
    }
}

// ─── Epoch Policy ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpochPolicy {
    /// Every epoch visits every training batch
    #[default]
    Full,

    /// Each epoch ends right after its first progress line
    CappedAtFirstLog,
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved next to the checkpoint so `evaluate` can reuse the data
// source and batch size of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub source:       DataSource,
    pub checkpoint:   String,
    pub epochs:       usize,
    pub lr:           f64,
    pub momentum:     f64,
    pub batch_size:   usize,
    pub log_interval: usize,
    pub epoch_policy: EpochPolicy,
    pub seed:         u64,
    pub num_workers:  usize,
    pub init_weights: Option<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            source:       DataSource::Cifar10 { data_dir: "data".to_string() },
            checkpoint:   "cifar_net.safetensors".to_string(),
            epochs:       2,
            lr:           0.001,
            momentum:     0.9,
            batch_size:   4,
            log_interval: 2000,
            epoch_policy: EpochPolicy::Full,
            seed:         42,
            num_workers:  2,
            init_weights: None,
        }
    }
}

impl TrainConfig {
    /// Reject hyperparameters the training loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch size must be at least 1");
        ensure!(self.log_interval > 0, "log interval must be at least 1");
        ensure!(
            self.lr.is_finite() && self.lr > 0.0,
            "learning rate must be a positive number, got {}",
            self.lr
        );
        ensure!(
            (0.0..1.0).contains(&self.momentum),
            "momentum must be in [0, 1), got {}",
            self.momentum
        );
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
    store:  CheckpointStore,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config, store: CheckpointStore::new() }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Open the configured dataset and train on it.
    pub fn execute(&self) -> Result<ParameterSnapshot> {
        self.config.validate()?;
        let provider = self
            .config
            .source
            .provider()
            .context("Failed to prepare the training data")?;
        self.execute_with(&provider)
    }

    /// Train on an already opened dataset.
    pub fn execute_with(&self, provider: &DatasetProvider) -> Result<ParameterSnapshot> {
        let cfg = &self.config;
        cfg.validate()?;

        let checkpoint = Path::new(&cfg.checkpoint);

        // ── Step 3: Optional starting weights ─────────────────────────────────
        let init_weights = match &cfg.init_weights {
            Some(path) => Some(
                self.store
                    .load(path)
                    .with_context(|| format!("Failed to load initial weights from '{path}'"))?,
            ),
            None => None,
        };

        // ── Step 4: Metrics CSV next to the checkpoint ────────────────────────
        let metrics_dir = checkpoint.parent().unwrap_or_else(|| Path::new(""));
        let metrics     = MetricsLogger::new(metrics_dir).with_context(|| {
            format!("Failed to open metrics log in '{}'", metrics_dir.display())
        })?;

        tracing::info!(
            "Training for {} epoch(s) on {} images (batch size {}, lr {}, momentum {})",
            cfg.epochs,
            provider.len(Split::Train),
            cfg.batch_size,
            cfg.lr,
            cfg.momentum
        );

        // ── Step 5: Training loop (Layer 5) ───────────────────────────────────
        let device   = Default::default();
        let snapshot = run_training::<TrainBackend>(
            cfg,
            provider,
            init_weights.as_ref(),
            &self.store,
            checkpoint,
            Some(&metrics),
            &device,
        )
        .context("Training failed")?;

        // ── Step 6: Save config for evaluation ────────────────────────────────
        self.store.save_config(cfg, checkpoint)?;

        Ok(snapshot)
    }
}
