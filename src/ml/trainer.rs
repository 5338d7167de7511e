// ============================================================
// Layer 5 — Training Loop
// ============================================================
// SGD-with-momentum training of Net over the shuffled train split.
//
// Per batch:
//   1. forward       scores = net(images)
//   2. loss          cross-entropy(scores, targets)
//   3. backward      grads  = loss.backward()
//   4. step          net    = sgd.step(lr, net, grads)
//
// Gradients are produced fresh by every backward pass and
// consumed by the step, so there is nothing to zero between
// batches.
//
// Every `log_interval` batches the mean loss of the window is
// printed as "[epoch, batch] loss: x.xxx" and appended to the
// metrics CSV. Under EpochPolicy::CappedAtFirstLog the epoch
// ends right after that first progress line.
//
// Reference: Burn Book §5 (Custom Training Loop)
//            Sutskever et al. (2013) momentum

use std::path::Path;

use burn::{
    nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig},
    optim::{momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use thiserror::Error;

use crate::application::train_use_case::{EpochPolicy, TrainConfig};
use crate::data::{
    batcher::ImageBatch,
    provider::{DatasetProvider, Split},
};
use crate::domain::{snapshot::ParameterSnapshot, traits::StateDict};
use crate::infra::{
    checkpoint::{CheckpointError, CheckpointStore},
    metrics::{MetricsLogger, ProgressMetrics},
};
use crate::ml::model::{ModelError, Net};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("loss became {loss} at epoch {epoch}, batch {batch}; training diverged")]
    NumericalFailure { epoch: usize, batch: usize, loss: f64 },

    #[error("cannot write training metrics: {0}")]
    Metrics(#[source] std::io::Error),

    #[error("invalid training configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Train a fresh network (optionally starting from `init_weights`),
/// save the final parameters to `checkpoint`, and return them.
pub fn run_training<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    provider:     &DatasetProvider,
    init_weights: Option<&ParameterSnapshot>,
    store:        &CheckpointStore,
    checkpoint:   &Path,
    metrics:      Option<&MetricsLogger>,
    device:       &B::Device,
) -> Result<ParameterSnapshot, TrainError> {
    if cfg.batch_size == 0 {
        return Err(TrainError::InvalidConfig("batch size must be at least 1"));
    }
    if cfg.log_interval == 0 {
        return Err(TrainError::InvalidConfig("log interval must be at least 1"));
    }

    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model = Net::<B>::new(device);
    if let Some(weights) = init_weights {
        model = model.load_state_dict(weights)?;
        tracing::info!("Initialised network from snapshot ({} tensors)", weights.len());
    }

    // ── SGD with momentum ─────────────────────────────────────────────────────
    // v = μ·v + g
    // θ = θ − lr·v
    let momentum = MomentumConfig::new()
        .with_momentum(cfg.momentum)
        .with_dampening(0.0);
    let mut optim = SgdConfig::new().with_momentum(Some(momentum)).init();

    let loss_fn = CrossEntropyLossConfig::new().init(device);

    let train_loader = provider.batches::<B>(
        Split::Train,
        cfg.batch_size,
        Some(cfg.seed),
        cfg.num_workers,
    );

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 0..cfg.epochs {
        let mut running_loss = 0.0f64;

        for (i, batch) in train_loader.iter().enumerate() {
            let (next, loss) = train_step(model, &mut optim, &loss_fn, batch, cfg.lr);
            model = next;

            if !loss.is_finite() {
                return Err(TrainError::NumericalFailure {
                    epoch: epoch + 1,
                    batch: i + 1,
                    loss,
                });
            }
            running_loss += loss;

            if i % cfg.log_interval == cfg.log_interval - 1 {
                let window = ProgressMetrics::new(
                    epoch + 1,
                    i + 1,
                    running_loss / cfg.log_interval as f64,
                );
                println!("[{}, {:5}] loss: {:.3}", window.epoch, window.batch, window.mean_loss);
                if let Some(logger) = metrics {
                    logger.log(&window).map_err(TrainError::Metrics)?;
                }
                running_loss = 0.0;

                if cfg.epoch_policy == EpochPolicy::CappedAtFirstLog {
                    tracing::debug!("Epoch {} capped after {} batches", epoch + 1, i + 1);
                    break;
                }
            }
        }
    }

    println!("Finished Training");

    let snapshot = model.state_dict()?;
    store.save(&snapshot, checkpoint)?;
    tracing::info!("Checkpoint saved to '{}'", checkpoint.display());

    Ok(snapshot)
}

/// One forward / backward / update on a single batch.
/// Returns the updated network and the batch loss.
pub(crate) fn train_step<B, O>(
    model:   Net<B>,
    optim:   &mut O,
    loss_fn: &CrossEntropyLoss<B>,
    batch:   ImageBatch<B>,
    lr:      f64,
) -> (Net<B>, f64)
where
    B: AutodiffBackend,
    O: Optimizer<Net<B>, B>,
{
    let scores = model.forward(batch.images);
    let loss   = loss_fn.forward(scores, batch.targets);

    let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

    let grads = loss.backward();
    let grads = GradientsParams::from_grads(grads, &model);
    (optim.step(lr, model, grads), loss_val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::DataSource;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn tiny_config(epochs: usize) -> TrainConfig {
        TrainConfig {
            source: DataSource::Synthetic { train_len: 16, test_len: 8, seed: 5 },
            epochs,
            batch_size: 4,
            log_interval: 2,
            num_workers: 0,
            ..TrainConfig::default()
        }
    }

    fn provider(cfg: &TrainConfig) -> DatasetProvider {
        cfg.source.provider().unwrap()
    }

    #[test]
    fn test_zero_epochs_returns_initial_snapshot() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = dir.path().join("net.safetensors");
        let cfg    = tiny_config(0);
        let device = Default::default();
        let store  = CheckpointStore::new();

        let initial = Net::<TestBackend>::new(&device).state_dict().unwrap();
        let result  = run_training::<TestBackend>(
            &cfg, &provider(&cfg), Some(&initial), &store, &ckpt, None, &device,
        )
        .unwrap();

        assert_eq!(result, initial);
        assert_eq!(store.load(&ckpt).unwrap(), initial);
    }

    #[test]
    fn test_training_changes_parameters_and_saves_them() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = dir.path().join("net.safetensors");
        let cfg    = tiny_config(1);
        let device = Default::default();
        let store  = CheckpointStore::new();

        let initial = Net::<TestBackend>::new(&device).state_dict().unwrap();
        let trained = run_training::<TestBackend>(
            &cfg, &provider(&cfg), Some(&initial), &store, &ckpt, None, &device,
        )
        .unwrap();

        assert_ne!(trained, initial);
        assert_eq!(trained.shapes(), initial.shapes());
        assert!(trained.is_finite());
        assert_eq!(store.load(&ckpt).unwrap(), trained);
    }

    #[test]
    fn test_single_step_is_deterministic() {
        let device  = Default::default();
        let initial = Net::<TestBackend>::new(&device).state_dict().unwrap();
        let data    = DatasetProvider::synthetic(4, 4, 9);

        let run_once = || {
            let model = Net::<TestBackend>::new(&device).load_state_dict(&initial).unwrap();
            let mut optim = SgdConfig::new()
                .with_momentum(Some(MomentumConfig::new().with_dampening(0.0)))
                .init();
            let loss_fn = CrossEntropyLossConfig::new().init(&device);
            let batch   = data
                .batches::<TestBackend>(Split::Train, 4, None, 0)
                .iter()
                .next()
                .unwrap();
            let (model, _) = train_step(model, &mut optim, &loss_fn, batch, 0.001);
            model.state_dict().unwrap()
        };

        assert_eq!(run_once(), run_once());
    }

    #[test]
    fn test_capped_policy_stops_epoch_at_first_log() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let store  = CheckpointStore::new();

        // 16 items / batch 4 = 4 batches per epoch, log every 2
        let count_rows = |policy: EpochPolicy, sub: &str| {
            let out     = dir.path().join(sub);
            let logger  = MetricsLogger::new(&out).unwrap();
            let cfg     = TrainConfig { epoch_policy: policy, ..tiny_config(2) };
            run_training::<TestBackend>(
                &cfg,
                &provider(&cfg),
                None,
                &store,
                &out.join("net.safetensors"),
                Some(&logger),
                &device,
            )
            .unwrap();
            std::fs::read_to_string(logger.csv_path()).unwrap().lines().count() - 1
        };

        assert_eq!(count_rows(EpochPolicy::Full, "full"), 4);
        assert_eq!(count_rows(EpochPolicy::CappedAtFirstLog, "capped"), 2);
    }

    #[test]
    fn test_zero_intervals_are_rejected_without_writing() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = dir.path().join("net.safetensors");
        let device = Default::default();
        let store  = CheckpointStore::new();

        for cfg in [
            TrainConfig { log_interval: 0, ..tiny_config(1) },
            TrainConfig { batch_size: 0, ..tiny_config(1) },
        ] {
            let err = run_training::<TestBackend>(
                &cfg, &provider(&cfg), None, &store, &ckpt, None, &device,
            )
            .unwrap_err();
            assert!(matches!(err, TrainError::InvalidConfig(_)));
        }
        assert!(!ckpt.exists());
    }

    #[test]
    fn test_training_with_worker_threads() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = dir.path().join("net.safetensors");
        let cfg    = TrainConfig { num_workers: 2, ..tiny_config(2) };
        let device = Default::default();
        let store  = CheckpointStore::new();

        let initial = Net::<TestBackend>::new(&device).state_dict().unwrap();
        let trained = run_training::<TestBackend>(
            &cfg, &provider(&cfg), Some(&initial), &store, &ckpt, None, &device,
        )
        .unwrap();

        assert_ne!(trained, initial);
        assert!(trained.is_finite());
        assert_eq!(store.load(&ckpt).unwrap(), trained);
    }

    #[test]
    fn test_incompatible_init_weights_fail_before_training() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = dir.path().join("net.safetensors");
        let cfg    = tiny_config(1);
        let device = Default::default();

        let mut bad = ParameterSnapshot::new();
        bad.insert("conv1.weight", vec![1], vec![0.0]).unwrap();

        let err = run_training::<TestBackend>(
            &cfg, &provider(&cfg), Some(&bad), &CheckpointStore::new(), &ckpt, None, &device,
        )
        .unwrap_err();

        assert!(matches!(err, TrainError::Model(ModelError::Snapshot(_))));
        assert!(!ckpt.exists());
    }
}
