//! CLI Command Implementations
//!
//! - [`train`]: one online training pass
//! - [`predict`]: scoring a test file
//! - [`eval`]: RMSE against an answer file
//! - [`stats`]: dataset statistics
//! - [`sweep`]: parallel hyperparameter sweep

mod eval;
mod predict;
mod stats;
mod sweep;
mod train;

pub use eval::{EvalCommand, EvalReport};
pub use predict::PredictCommand;
pub use stats::StatsCommand;
pub use sweep::{SweepCommand, SweepScore};
pub use train::TrainCommand;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use hashlr_core::{Event, FeatureLayout, LearnerConfig, LearnerConfigBuilder};
use hashlr_data::EventReader;
use tracing::info;

/// Learner settings shared by `train` and `sweep`.
///
/// Values are taken from `--config` (JSON) when given, then overridden by
/// any flag or `HASHLR_*` variable that is set.
#[derive(Args, Debug, Clone, Default)]
pub struct LearnerArgs {
    /// Learner configuration file (JSON)
    #[arg(long, short = 'c', env = "HASHLR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Size of the hashed weight space
    #[arg(long, env = "HASHLR_DIM")]
    pub dim: Option<usize>,

    /// SGD step size
    #[arg(long, env = "HASHLR_STEP")]
    pub step: Option<f64>,

    /// L2 regularization strength
    #[arg(long, env = "HASHLR_LAMBDA")]
    pub lambda: Option<f64>,

    /// Hash per-user copies of every feature
    #[arg(
        long,
        env = "HASHLR_PERSONALIZED",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub personalized: Option<bool>,

    /// Feature layout: `structured` or `fully_hashed`
    #[arg(long, env = "HASHLR_LAYOUT")]
    pub layout: Option<FeatureLayout>,

    /// Progress logging interval, in events
    #[arg(long, env = "HASHLR_LOG_EVERY")]
    pub log_every: Option<u64>,
}

impl LearnerArgs {
    /// Resolves the configuration, starting from `--config` or the defaults.
    pub fn resolve(&self) -> Result<LearnerConfig> {
        let base = match &self.config {
            Some(path) => LearnerConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => LearnerConfig::default(),
        };
        self.apply(base)
    }

    /// Applies the flags that are set on top of `base`.
    pub fn apply(&self, base: LearnerConfig) -> Result<LearnerConfig> {
        let mut builder = LearnerConfigBuilder::from_config(base);
        if let Some(dim) = self.dim {
            builder = builder.dim(dim);
        }
        if let Some(step) = self.step {
            builder = builder.step(step);
        }
        if let Some(lambda) = self.lambda {
            builder = builder.lambda(lambda);
        }
        if let Some(personalized) = self.personalized {
            builder = builder.personalized(personalized);
        }
        if let Some(layout) = self.layout {
            builder = builder.layout(layout);
        }
        if let Some(log_every) = self.log_every {
            builder = builder.log_every(log_every);
        }
        builder.build().context("Invalid learner configuration")
    }

    /// Checks flags given alongside `--resume` against the saved configuration.
    ///
    /// The weight store carries pending decay computed under its own `dim`,
    /// `layout`, `step` and `lambda`, so those can only be repeated, never
    /// changed. `--personalized` and `--log-every` may change.
    pub fn check_resumable(&self, saved: &LearnerConfig) -> Result<()> {
        if self.config.is_some() {
            bail!(
                "--config cannot be combined with --resume; the checkpoint carries its configuration"
            );
        }
        let mut conflicts = Vec::new();
        if let Some(dim) = self.dim.filter(|&d| d != saved.dim()) {
            conflicts.push(format!("--dim {dim} (checkpoint has {})", saved.dim()));
        }
        if let Some(layout) = self.layout.filter(|&l| l != saved.layout()) {
            conflicts.push(format!("--layout {layout} (checkpoint has {})", saved.layout()));
        }
        if let Some(step) = self.step.filter(|&s| s != saved.step()) {
            conflicts.push(format!("--step {step} (checkpoint has {})", saved.step()));
        }
        if let Some(lambda) = self.lambda.filter(|&l| l != saved.lambda()) {
            conflicts.push(format!("--lambda {lambda} (checkpoint has {})", saved.lambda()));
        }
        if !conflicts.is_empty() {
            bail!(
                "cannot change {} when resuming; only --personalized and --log-every may differ",
                conflicts.join(", ")
            );
        }
        Ok(())
    }
}

/// Opens a data file, capped at `limit` events.
pub(crate) fn open_events(
    path: &Path,
    labeled: bool,
    limit: Option<u64>,
) -> Result<EventReader<Box<dyn std::io::BufRead + Send>>> {
    let reader = EventReader::open(path, labeled)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(match limit {
        Some(limit) => reader.with_limit(limit),
        None => reader,
    })
}

/// Reads a whole data file into memory.
pub(crate) fn load_events(path: &Path, labeled: bool, limit: Option<u64>) -> Result<Vec<Event>> {
    let events = open_events(path, labeled, limit)?
        .collect::<hashlr_data::Result<Vec<_>>>()
        .with_context(|| format!("Failed to read {}", path.display()))?;
    info!(path = %path.display(), count = events.len(), "Loaded events");
    Ok(events)
}
