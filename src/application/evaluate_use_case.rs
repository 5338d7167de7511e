// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a parameter snapshot on the test split:
//
//   Step 1: Load the snapshot          (Layer 6 - infra)
//           (or take it from memory after a `run`)
//   Step 2: Open the dataset           (Layer 4 - data)
//   Step 3: Evaluate on the test split (Layer 5 - ml)
//
// Reference: Burn Book §5 (Inference)

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};

use crate::application::train_use_case::DataSource;
use crate::data::provider::DatasetProvider;
use crate::domain::{accuracy::AccuracyResult, snapshot::ParameterSnapshot};
use crate::infra::checkpoint::CheckpointStore;
use crate::ml::{evaluator::evaluate, InferBackend};

/// Everything an evaluation needs besides the weights.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluateConfig {
    pub checkpoint: PathBuf,
    pub source:     DataSource,
    pub batch_size: usize,
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
    store:  CheckpointStore,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config, store: CheckpointStore::new() }
    }

    /// Load the checkpoint from disk and evaluate it.
    pub fn execute(&self) -> Result<AccuracyResult> {
        let path    = &self.config.checkpoint;
        let weights = self
            .store
            .load(path)
            .with_context(|| format!("Failed to load checkpoint '{}'", path.display()))?;
        tracing::info!("Loaded {} parameters from '{}'", weights.num_values(), path.display());

        let provider = self
            .config
            .source
            .provider()
            .context("Failed to prepare the test data")?;
        self.evaluate_snapshot(&weights, &provider)
    }

    /// Evaluate a snapshot that is already in memory.
    pub fn evaluate_snapshot(
        &self,
        weights:  &ParameterSnapshot,
        provider: &DatasetProvider,
    ) -> Result<AccuracyResult> {
        ensure!(self.config.batch_size > 0, "batch size must be at least 1");

        let device = Default::default();
        let result = evaluate::<InferBackend>(
            weights,
            provider,
            self.config.batch_size,
            &device,
        )
        .context("Evaluation failed")?;

        tracing::info!("{} of {} test images classified correctly", result.correct, result.total);
        Ok(result)
    }
}
