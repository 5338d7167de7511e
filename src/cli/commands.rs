// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands `run`, `train` and `evaluate`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for bad values
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::{DataSource, EpochPolicy, TrainConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the network, then report its test accuracy
    Run(TrainArgs),

    /// Train the network and save a checkpoint
    Train(TrainArgs),

    /// Report the test accuracy of a saved checkpoint
    Evaluate(EvaluateArgs),
}

// ─── Data Source Flags ────────────────────────────────────────────────────────
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Directory where CIFAR-10 is cached (downloaded on first use)
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Use seeded random images instead of CIFAR-10
    #[arg(long, conflicts_with = "data_dir")]
    pub synthetic: bool,

    /// Training images generated with --synthetic
    #[arg(long, default_value_t = 2000)]
    pub synthetic_train: usize,

    /// Test images generated with --synthetic
    #[arg(long, default_value_t = 500)]
    pub synthetic_test: usize,
}

impl DataArgs {
    /// The source named on the command line, if any.
    pub fn source(&self, seed: u64) -> Option<DataSource> {
        if self.synthetic {
            return Some(DataSource::Synthetic {
                train_len: self.synthetic_train,
                test_len:  self.synthetic_test,
                seed,
            });
        }
        self.data_dir
            .clone()
            .map(|data_dir| DataSource::Cifar10 { data_dir })
    }
}

// ─── train / run ──────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Number of passes through the training data
    #[arg(long, default_value_t = 2)]
    pub epochs: usize,

    /// SGD learning rate
    #[arg(long, default_value_t = 0.001)]
    pub lr: f64,

    /// SGD momentum factor
    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    /// Images per batch
    #[arg(long, default_value_t = 4)]
    pub batch_size: usize,

    /// Print the mean loss every this many batches
    #[arg(long, default_value_t = 2000)]
    pub log_interval: usize,

    /// End each epoch right after its first progress line
    #[arg(long)]
    pub capped_epochs: bool,

    /// Seed for weight initialisation and shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Background threads preparing shuffled training batches
    #[arg(long, default_value_t = 2)]
    pub num_workers: usize,

    /// Checkpoint to start from instead of fresh weights
    #[arg(long)]
    pub init_weights: Option<String>,

    /// Where the trained parameters are saved
    #[arg(long, default_value = "cifar_net.safetensors")]
    pub checkpoint: String,

    #[command(flatten)]
    pub data: DataArgs,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let defaults = TrainConfig::default();
        TrainConfig {
            source:       a.data.source(a.seed).unwrap_or(defaults.source),
            checkpoint:   a.checkpoint,
            epochs:       a.epochs,
            lr:           a.lr,
            momentum:     a.momentum,
            batch_size:   a.batch_size,
            log_interval: a.log_interval,
            epoch_policy: if a.capped_epochs {
                EpochPolicy::CappedAtFirstLog
            } else {
                EpochPolicy::Full
            },
            seed:         a.seed,
            num_workers:  a.num_workers,
            init_weights: a.init_weights,
        }
    }
}

// ─── evaluate ─────────────────────────────────────────────────────────────────
/// Flags left out fall back to the run config saved next to the
/// checkpoint, then to the defaults.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Checkpoint to evaluate
    #[arg(long, default_value = "cifar_net.safetensors")]
    pub checkpoint: String,

    /// Images per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Seed for --synthetic test images
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub data: DataArgs,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_args(argv: &[&str]) -> TrainArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Train(args) | Commands::Run(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_train_defaults_match_reference_run() {
        let cfg: TrainConfig = train_args(&["cifar-net", "train"]).into();
        assert_eq!(cfg, TrainConfig::default());
    }

    #[test]
    fn test_train_flags_reach_config() {
        let cfg: TrainConfig = train_args(&[
            "cifar-net", "run",
            "--epochs", "5",
            "--lr", "0.01",
            "--batch-size", "16",
            "--capped-epochs",
            "--synthetic",
            "--synthetic-train", "64",
            "--seed", "7",
        ])
        .into();

        assert_eq!(cfg.epochs, 5);
        assert_eq!(cfg.lr, 0.01);
        assert_eq!(cfg.batch_size, 16);
        assert_eq!(cfg.epoch_policy, EpochPolicy::CappedAtFirstLog);
        assert_eq!(
            cfg.source,
            DataSource::Synthetic { train_len: 64, test_len: 500, seed: 7 }
        );
    }

    #[test]
    fn test_synthetic_conflicts_with_data_dir() {
        let parsed = Cli::try_parse_from([
            "cifar-net", "train", "--synthetic", "--data-dir", "somewhere",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_evaluate_flags_are_optional() {
        let cli = Cli::try_parse_from(["cifar-net", "evaluate"]).unwrap();
        let Commands::Evaluate(args) = cli.command else {
            panic!("expected evaluate");
        };
        assert_eq!(args.checkpoint, "cifar_net.safetensors");
        assert_eq!(args.batch_size, None);
        assert_eq!(args.data.source(args.seed), None);
    }
}
