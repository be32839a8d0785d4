//! Train Command Implementation
//!
//! Runs one online pass over a training file and writes the settled model.
//! Optionally resumes from a checkpoint and takes periodic snapshots.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hashlr_checkpoint::{Checkpointer, JsonCheckpointer, ModelCheckpoint};
use hashlr_optimizer::WeightStore;
use hashlr_training::{spawn_prefetch, CheckpointHook, HookError, LoggingHook, OnlineLearner};
use tracing::{info, warn};

use super::{open_events, LearnerArgs};

/// Train a model in one online pass
///
/// # Example
///
/// ```bash
/// hashlr train \
///     --train train.txt \
///     --dim 1572869 --step 0.01 --lambda 0.001 --personalized \
///     --output model.json.gz
/// ```
#[derive(Args, Debug, Clone)]
pub struct TrainCommand {
    /// Training file (labeled lines, optionally .gz)
    #[arg(long, short = 't', env = "HASHLR_TRAIN")]
    pub train: PathBuf,

    /// Where to write the trained model (.json or .json.gz)
    #[arg(long, short = 'o', env = "HASHLR_OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub learner: LearnerArgs,

    /// Process at most this many events
    #[arg(long)]
    pub limit: Option<u64>,

    /// Continue training from this checkpoint
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Directory for periodic snapshots
    #[arg(long, env = "HASHLR_CHECKPOINT_DIR")]
    pub checkpoint_dir: Option<PathBuf>,

    /// Snapshot interval, in events
    #[arg(long, default_value = "1000000")]
    pub checkpoint_every: u64,

    /// Number of periodic snapshots to keep (0 keeps all)
    #[arg(long, default_value = "5")]
    pub keep_checkpoints: usize,

    /// Gzip the periodic snapshots
    #[arg(long)]
    pub compress_checkpoints: bool,

    /// Events decoded ahead on a reader thread (0 reads inline)
    #[arg(long, default_value = "4096")]
    pub prefetch: usize,
}

impl TrainCommand {
    /// Runs the command and returns the trained weights.
    pub fn run(&self) -> Result<WeightStore> {
        let checkpointer = JsonCheckpointer::new();

        let (config, mut learner) = match &self.resume {
            Some(path) => {
                let checkpoint = checkpointer
                    .restore(path)
                    .with_context(|| format!("Failed to restore {}", path.display()))?;
                let (saved, weights) = checkpoint.into_parts();
                self.learner
                    .check_resumable(&saved)
                    .with_context(|| format!("Cannot resume from {}", path.display()))?;
                if self.learner.personalized.is_some_and(|p| p != saved.personalized()) {
                    warn!(
                        resume = %path.display(),
                        personalized = !saved.personalized(),
                        "Personalization changed on resume; earlier events keep the saved setting"
                    );
                }
                let config = self.learner.apply(saved)?;
                let learner = OnlineLearner::resume(weights, config.clone())
                    .context("Checkpoint does not match the learner configuration")?;
                (config, learner)
            }
            None => {
                let config = self.learner.resolve()?;
                (config.clone(), OnlineLearner::new(config)?)
            }
        };

        info!(
            train = %self.train.display(),
            dim = config.dim(),
            step = config.step(),
            lambda = config.lambda(),
            personalized = config.personalized(),
            layout = %config.layout(),
            "Starting training"
        );

        learner.add_hook(LoggingHook::new(config.log_every()));
        if let Some(limit) = self.limit {
            learner = learner.with_expected_events(limit);
        }
        if let Some(dir) = &self.checkpoint_dir {
            let snapshot_config = config.clone();
            let extension = if self.compress_checkpoints {
                "json.gz"
            } else {
                "json"
            };
            let hook = CheckpointHook::new(dir.clone(), self.checkpoint_every, move |path, weights| {
                let checkpoint = ModelCheckpoint::new(snapshot_config.clone(), weights.clone());
                JsonCheckpointer::new()
                    .save(path, &checkpoint)
                    .map_err(|e| HookError::Checkpoint(e.to_string()))
            })
            .with_max_to_keep(self.keep_checkpoints)
            .with_extension(extension);
            learner.add_hook(hook);
        }

        let events = open_events(&self.train, true, self.limit)?;
        let applied = if self.prefetch > 0 {
            learner.try_train(spawn_prefetch(events, self.prefetch)?)
        } else {
            learner.try_train(events)
        }
        .with_context(|| format!("Training on {} failed", self.train.display()))?;
        if applied == 0 {
            warn!(train = %self.train.display(), "No events were read");
        }

        let weights = learner.finish()?;
        let checkpoint = ModelCheckpoint::new(config, weights)
            .with_metadata("train", self.train.display().to_string());
        checkpointer
            .save(&self.output, &checkpoint)
            .with_context(|| format!("Failed to write model to {}", self.output.display()))?;

        info!(
            output = %self.output.display(),
            global_step = checkpoint.global_step(),
            applied,
            l2_norm = checkpoint.weights.l2_norm(),
            "Model saved"
        );
        Ok(checkpoint.weights)
    }
}
