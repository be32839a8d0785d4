//! hashlr CLI Library
//!
//! Command-line drivers for the hashlr click model:
//!
//! - **Train**: one online pass over a training file, writing a checkpoint
//! - **Predict**: score a test file with a checkpoint
//! - **Eval**: RMSE of a prediction file against an answer file
//! - **Stats**: dataset statistics and train/test overlap
//! - **Sweep**: train several dimensions and L2 strengths in parallel
//!
//! # Example
//!
//! ```bash
//! hashlr train --train train.txt --dim 1572869 --step 0.01 --output model.json.gz
//! hashlr predict --model model.json.gz --test test.txt --output preds.txt
//! hashlr eval --solution test_label.txt --predictions preds.txt
//! ```

pub mod commands;

use clap::{Parser, Subcommand};

pub use commands::{
    EvalCommand, EvalReport, LearnerArgs, PredictCommand, StatsCommand, SweepCommand, SweepScore,
    TrainCommand,
};

/// hashlr - online hashed logistic regression for click prediction
#[derive(Parser, Debug)]
#[command(name = "hashlr")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a model in one online pass
    Train(TrainCommand),

    /// Predict click probabilities for a test file
    Predict(PredictCommand),

    /// Evaluate predictions against an answer file
    Eval(EvalCommand),

    /// Print dataset statistics
    Stats(StatsCommand),

    /// Train a grid of dimensions and L2 strengths in parallel
    Sweep(SweepCommand),
}

/// Result type alias for CLI operations
pub type CliResult<T> = anyhow::Result<T>;

/// Dispatches a parsed command line.
pub fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Train(cmd) => cmd.run().map(|_| ()),
        Commands::Predict(cmd) => cmd.run().map(|_| ()),
        Commands::Eval(cmd) => cmd.run().map(|_| ()),
        Commands::Stats(cmd) => cmd.run(),
        Commands::Sweep(cmd) => cmd.run().map(|_| ()),
    }
}
