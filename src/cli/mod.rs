// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `run`      — train, then evaluate the trained weights
//   2. `train`    — train and save a checkpoint
//   3. `evaluate` — load a checkpoint and report test accuracy
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

use crate::application::{
    evaluate_use_case::{EvaluateConfig, EvaluateUseCase},
    train_use_case::{TrainConfig, TrainUseCase},
};
use crate::infra::checkpoint::{CheckpointError, CheckpointStore};

#[derive(Parser, Debug)]
#[command(
    name = "cifar-net",
    version,
    about = "Train a small convolutional network on CIFAR-10 and measure its accuracy."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. The CLI only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Run(args)      => run_all(args),
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

/// `run`: train, then evaluate the in-memory snapshot on the same data.
fn run_all(args: TrainArgs) -> Result<()> {
    let config     = TrainConfig::from(args);
    let batch_size = config.batch_size;
    let use_case   = TrainUseCase::new(config);

    let provider = use_case.config().source.provider()?;
    let weights  = use_case.execute_with(&provider)?;

    let evaluate = EvaluateUseCase::new(EvaluateConfig {
        checkpoint: use_case.config().checkpoint.clone().into(),
        source:     use_case.config().source.clone(),
        batch_size,
    });
    evaluate.evaluate_snapshot(&weights, &provider)?;
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    let use_case = TrainUseCase::new(args.into());
    use_case.execute()?;

    println!("Checkpoint saved to '{}'", use_case.config().checkpoint);
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    // Fall back to whatever the training run recorded
    let recorded = match CheckpointStore::new().load_config(&args.checkpoint) {
        Ok(cfg) => cfg,
        Err(CheckpointError::NotFound(_)) => {
            tracing::debug!("No run config next to '{}', using defaults", args.checkpoint);
            TrainConfig::default()
        }
        Err(e) => return Err(e.into()),
    };

    let config = EvaluateConfig {
        source:     args.data.source(args.seed).unwrap_or(recorded.source),
        batch_size: args.batch_size.unwrap_or(recorded.batch_size),
        checkpoint: args.checkpoint.into(),
    };
    EvaluateUseCase::new(config).execute()?;
    Ok(())
}
