//! Predict Command Implementation

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hashlr_checkpoint::{write_predictions, Checkpointer, JsonCheckpointer};
use hashlr_data::read_solution;
use hashlr_training::eval::{per_impression_rmse, rmse, weighted_rmse};
use hashlr_training::Predictor;
use tracing::{info, warn};

use super::open_events;

/// Predict click probabilities for a test file
///
/// # Example
///
/// ```bash
/// hashlr predict --model model.json.gz --test test.txt --output preds.txt
/// ```
#[derive(Args, Debug, Clone)]
pub struct PredictCommand {
    /// Trained model checkpoint
    #[arg(long, short = 'm', env = "HASHLR_MODEL")]
    pub model: PathBuf,

    /// File to score (unlabeled lines unless --labeled)
    #[arg(long, short = 't', env = "HASHLR_TEST")]
    pub test: PathBuf,

    /// Where to write one probability per line
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// The test file has clicks|impressions columns
    #[arg(long)]
    pub labeled: bool,

    /// Score at most this many events
    #[arg(long)]
    pub limit: Option<u64>,

    /// Decimal places written per probability
    #[arg(long, default_value = "6")]
    pub precision: usize,

    /// Answer file to report RMSE against
    #[arg(long)]
    pub solution: Option<PathBuf>,
}

impl PredictCommand {
    /// Runs the command and returns the predictions.
    pub fn run(&self) -> Result<Vec<f64>> {
        let checkpoint = JsonCheckpointer::new()
            .restore(&self.model)
            .with_context(|| format!("Failed to load model {}", self.model.display()))?
            .into_settled();
        let predictor = Predictor::new(&checkpoint.config)?;

        let mut predictions = Vec::new();
        for event in open_events(&self.test, self.labeled, self.limit)? {
            let event = event.with_context(|| format!("Failed to read {}", self.test.display()))?;
            predictions.push(predictor.predict(&checkpoint.weights, &event)?);
        }
        if let Some(limit) = self.limit {
            if (predictions.len() as u64) < limit {
                warn!(
                    expected = limit,
                    read = predictions.len(),
                    "Test data is shorter than the requested size"
                );
            }
        }

        write_predictions(&self.output, &predictions, self.precision)?;
        info!(count = predictions.len(), output = %self.output.display(), "Predictions written");

        if let Some(path) = &self.solution {
            let solution = read_solution(path)
                .with_context(|| format!("Failed to read solution {}", path.display()))?;
            println!("rmse\t{:.6}", rmse(&solution, &predictions)?);
            println!("weighted_rmse\t{:.6}", weighted_rmse(&solution, &predictions)?);
            println!(
                "per_impression_rmse\t{:.6}",
                per_impression_rmse(&solution, &predictions)?
            );
        }
        Ok(predictions)
    }
}
