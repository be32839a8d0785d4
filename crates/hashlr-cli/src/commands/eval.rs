//! Eval Command Implementation

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hashlr_checkpoint::read_predictions;
use hashlr_data::read_solution;
use hashlr_training::eval::{per_impression_rmse, rmse, weighted_rmse};
use tracing::info;

/// Evaluate predictions against an answer file
///
/// The answer file holds one `clicks,impressions` line per test instance,
/// in the order of the prediction file.
#[derive(Args, Debug, Clone)]
pub struct EvalCommand {
    /// Answer file (`clicks,impressions` per line)
    #[arg(long, short = 's', env = "HASHLR_SOLUTION")]
    pub solution: PathBuf,

    /// Prediction file (one probability per line)
    #[arg(long, short = 'p')]
    pub predictions: PathBuf,
}

/// Errors of a prediction file against its answers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    /// Root mean squared error over instances.
    pub rmse: f64,
    /// Root mean squared error weighted by impressions.
    pub weighted_rmse: f64,
    /// Legacy score: squared errors summed over instances, divided by impressions.
    pub per_impression_rmse: f64,
}

impl EvalCommand {
    /// Runs the command and returns the errors.
    pub fn run(&self) -> Result<EvalReport> {
        let solution = read_solution(&self.solution)
            .with_context(|| format!("Failed to read solution {}", self.solution.display()))?;
        let predictions = read_predictions(&self.predictions).with_context(|| {
            format!("Failed to read predictions {}", self.predictions.display())
        })?;

        let report = EvalReport {
            rmse: rmse(&solution, &predictions)?,
            weighted_rmse: weighted_rmse(&solution, &predictions)?,
            per_impression_rmse: per_impression_rmse(&solution, &predictions)?,
        };
        info!(
            instances = solution.len(),
            rmse = report.rmse,
            weighted_rmse = report.weighted_rmse,
            per_impression_rmse = report.per_impression_rmse,
            "Evaluation finished"
        );
        println!("rmse\t{:.6}", report.rmse);
        println!("weighted_rmse\t{:.6}", report.weighted_rmse);
        println!("per_impression_rmse\t{:.6}", report.per_impression_rmse);
        Ok(report)
    }
}
