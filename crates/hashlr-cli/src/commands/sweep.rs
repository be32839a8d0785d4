//! Sweep Command Implementation
//!
//! Trains one model per (dim, lambda) pair over the same training events in
//! parallel, then scores each on a test file.

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Args;
use hashlr_checkpoint::write_predictions;
use hashlr_data::read_solution;
use hashlr_training::eval::{per_impression_rmse, rmse, weighted_rmse};
use hashlr_training::sweep::{grid, train_sweep};
use hashlr_training::Predictor;
use tracing::info;

use super::{load_events, LearnerArgs};

/// Train a grid of dimensions and L2 strengths in parallel
///
/// # Example
///
/// ```bash
/// hashlr sweep --train train.txt --test test.txt --solution test_label.txt \
///     --dims 97,12289,1572869 --lambdas 0,0.002,0.004,0.006,0.008,0.01
/// ```
#[derive(Args, Debug, Clone)]
pub struct SweepCommand {
    /// Training file (labeled lines)
    #[arg(long, short = 't', env = "HASHLR_TRAIN")]
    pub train: PathBuf,

    /// Test file (unlabeled lines)
    #[arg(long, env = "HASHLR_TEST")]
    pub test: PathBuf,

    /// Answer file for the test file
    #[arg(long, short = 's', env = "HASHLR_SOLUTION")]
    pub solution: PathBuf,

    /// Hashed-space sizes to try
    #[arg(long, value_delimiter = ',', required = true)]
    pub dims: Vec<usize>,

    /// L2 strengths to try
    #[arg(long, value_delimiter = ',', default_value = "0")]
    pub lambdas: Vec<f64>,

    #[command(flatten)]
    pub learner: LearnerArgs,

    /// Read at most this many training events
    #[arg(long)]
    pub limit: Option<u64>,

    /// Directory for per-member prediction files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

/// Test error of one sweep member.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepScore {
    /// Hashed-space size.
    pub dim: usize,
    /// L2 strength.
    pub lambda: f64,
    /// RMSE over test instances.
    pub rmse: f64,
    /// Impression-weighted RMSE.
    pub weighted_rmse: f64,
    /// Legacy per-impression score.
    pub per_impression_rmse: f64,
    /// L2 norm of the trained weights.
    pub l2_norm: f64,
}

impl SweepCommand {
    /// Runs the command and returns one score per member, in grid order.
    pub fn run(&self) -> Result<Vec<SweepScore>> {
        let base = self.learner.resolve()?;
        let configs = grid(&base, &self.dims, &self.lambdas)?;

        let train = load_events(&self.train, true, self.limit)?;
        let test = load_events(&self.test, false, None)?;
        let solution = read_solution(&self.solution)
            .with_context(|| format!("Failed to read solution {}", self.solution.display()))?;
        ensure!(
            solution.len() == test.len(),
            "Solution has {} lines but the test file has {} events",
            solution.len(),
            test.len()
        );

        info!(members = configs.len(), events = train.len(), "Starting sweep");
        let results = train_sweep(&train, &configs)?;

        let mut scores = Vec::with_capacity(results.len());
        for result in &results {
            let predictor = Predictor::new(&result.config)?;
            let predictions = predictor.predict_all(&result.weights, &test)?;
            if let Some(dir) = &self.output_dir {
                let path = dir.join(format!(
                    "predictions-dim{}-lambda{}.txt",
                    result.config.dim(),
                    result.config.lambda()
                ));
                write_predictions(&path, &predictions, 6)?;
            }
            let score = SweepScore {
                dim: result.config.dim(),
                lambda: result.config.lambda(),
                rmse: rmse(&solution, &predictions)?,
                weighted_rmse: weighted_rmse(&solution, &predictions)?,
                per_impression_rmse: per_impression_rmse(&solution, &predictions)?,
                l2_norm: result.weights.l2_norm(),
            };
            println!(
                "dim={}\tlambda={}\trmse={:.6}\tweighted_rmse={:.6}\tper_impression_rmse={:.6}\tl2_norm={:.6}",
                score.dim,
                score.lambda,
                score.rmse,
                score.weighted_rmse,
                score.per_impression_rmse,
                score.l2_norm
            );
            scores.push(score);
        }

        if let Some(best) = scores
            .iter()
            .min_by(|a, b| a.rmse.total_cmp(&b.rmse))
        {
            info!(dim = best.dim, lambda = best.lambda, rmse = best.rmse, "Best sweep member");
        }
        Ok(scores)
    }
}
