//! Training hooks for customizing the training loop.
//!
//! Hooks allow injecting custom behavior at various points of a training
//! pass, such as progress logging and periodic checkpointing. They observe
//! the weight store read-only.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hashlr_optimizer::WeightStore;
use thiserror::Error;
use tracing::{debug, info};

use crate::metrics::{Metrics, MetricsRecorder};

/// Errors that can occur during hook execution.
#[derive(Debug, Error)]
pub enum HookError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A checkpoint error occurred.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// A custom hook error.
    #[error("Hook error: {0}")]
    Custom(String),
}

/// Result type for hook operations.
pub type HookResult<T> = Result<T, HookError>;

/// Action to take after a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Continue training normally.
    Continue,
    /// Stop consuming events.
    Stop,
}

/// Trait for training hooks.
///
/// # Examples
///
/// ```
/// use hashlr_optimizer::WeightStore;
/// use hashlr_training::hooks::{Hook, HookAction, HookResult};
/// use hashlr_training::metrics::Metrics;
///
/// struct StopAfter(u64);
///
/// impl Hook for StopAfter {
///     fn name(&self) -> &str {
///         "stop_after"
///     }
///
///     fn after_step(
///         &mut self,
///         step: u64,
///         _metrics: &Metrics,
///         _weights: &WeightStore,
///     ) -> HookResult<HookAction> {
///         if step + 1 >= self.0 {
///             Ok(HookAction::Stop)
///         } else {
///             Ok(HookAction::Continue)
///         }
///     }
/// }
/// ```
pub trait Hook: Send + Sync {
    /// Returns the name of this hook for logging purposes.
    fn name(&self) -> &str;

    /// Called before each training step.
    ///
    /// # Arguments
    ///
    /// * `step` - The step index of the event about to be processed.
    fn before_step(&mut self, _step: u64) -> HookResult<()> {
        Ok(())
    }

    /// Called after each training step.
    ///
    /// # Arguments
    ///
    /// * `step` - The step index of the processed event.
    /// * `metrics` - The metrics of the step.
    /// * `weights` - The weight store after the update.
    fn after_step(
        &mut self,
        _step: u64,
        _metrics: &Metrics,
        _weights: &WeightStore,
    ) -> HookResult<HookAction> {
        Ok(HookAction::Continue)
    }

    /// Called once at the end of the pass, after the final decay sweep.
    ///
    /// # Arguments
    ///
    /// * `processed` - The number of events processed.
    /// * `weights` - The settled weight store.
    fn end(&mut self, _processed: u64, _weights: &WeightStore) -> HookResult<()> {
        Ok(())
    }
}

/// A hook that logs progress every N processed events.
///
/// Each report carries the processed count, the progressive log loss per
/// impression, observed and predicted CTR, and the L2 norm of the weights.
///
/// # Examples
///
/// ```
/// use hashlr_training::hooks::LoggingHook;
///
/// let hook = LoggingHook::new(100_000);
/// ```
#[derive(Debug)]
pub struct LoggingHook {
    every_n_events: u64,
    recorder: MetricsRecorder,
}

impl LoggingHook {
    /// Creates a logging hook reporting every `every_n_events` events.
    pub fn new(every_n_events: u64) -> Self {
        Self {
            every_n_events: every_n_events.max(1),
            recorder: MetricsRecorder::new(),
        }
    }

    /// Returns the metrics accumulated so far.
    pub fn recorder(&self) -> &MetricsRecorder {
        &self.recorder
    }
}

impl Hook for LoggingHook {
    fn name(&self) -> &str {
        "logging_hook"
    }

    fn after_step(
        &mut self,
        step: u64,
        metrics: &Metrics,
        weights: &WeightStore,
    ) -> HookResult<HookAction> {
        self.recorder.record(metrics);
        let processed = step + 1;
        if processed % self.every_n_events == 0 {
            info!(
                processed,
                log_loss = self.recorder.average_loss(),
                ctr = self.recorder.observed_ctr(),
                predicted_ctr = self.recorder.predicted_ctr(),
                l2_norm = weights.l2_norm(),
                "Processed events"
            );
        }
        Ok(HookAction::Continue)
    }

    fn end(&mut self, processed: u64, weights: &WeightStore) -> HookResult<()> {
        info!(
            processed,
            impressions = self.recorder.impressions(),
            log_loss = self.recorder.average_loss(),
            l2_norm = weights.l2_norm(),
            "Training pass finished"
        );
        Ok(())
    }
}

/// Function that writes a weight store snapshot to a path.
pub type CheckpointFn = Arc<dyn Fn(&Path, &WeightStore) -> HookResult<()> + Send + Sync>;

/// A hook that saves snapshots at regular intervals.
///
/// Snapshots are written through a caller-supplied function, so the hook is
/// independent of the persistence format.
///
/// # Examples
///
/// ```
/// use hashlr_training::hooks::CheckpointHook;
/// use std::path::PathBuf;
///
/// // Snapshot every 1M events, keep the newest 3.
/// let hook = CheckpointHook::new(PathBuf::from("/tmp/model"), 1_000_000, |_path, _weights| Ok(()))
///     .with_max_to_keep(3);
/// ```
pub struct CheckpointHook {
    model_dir: PathBuf,
    save_every_n_events: u64,
    max_to_keep: usize,
    extension: String,
    saved_paths: VecDeque<PathBuf>,
    checkpoint_fn: CheckpointFn,
}

impl std::fmt::Debug for CheckpointHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointHook")
            .field("model_dir", &self.model_dir)
            .field("save_every_n_events", &self.save_every_n_events)
            .field("max_to_keep", &self.max_to_keep)
            .field("extension", &self.extension)
            .finish()
    }
}

impl CheckpointHook {
    /// Creates a new checkpoint hook.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - The directory to save snapshots in.
    /// * `save_every_n_events` - The interval at which to save.
    /// * `checkpoint_fn` - Writes one snapshot.
    pub fn new<F>(model_dir: PathBuf, save_every_n_events: u64, checkpoint_fn: F) -> Self
    where
        F: Fn(&Path, &WeightStore) -> HookResult<()> + Send + Sync + 'static,
    {
        Self {
            model_dir,
            save_every_n_events: save_every_n_events.max(1),
            max_to_keep: 5,
            extension: "json".to_string(),
            saved_paths: VecDeque::new(),
            checkpoint_fn: Arc::new(checkpoint_fn),
        }
    }

    /// Sets the maximum number of snapshots to keep. `0` keeps all of them.
    pub fn with_max_to_keep(mut self, max: usize) -> Self {
        self.max_to_keep = max;
        self
    }

    /// Sets the snapshot file extension, e.g. `json.gz`.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Returns the path of the snapshot taken after `processed` events.
    pub fn checkpoint_path(&self, processed: u64) -> PathBuf {
        self.model_dir
            .join(format!("checkpoint-{}.{}", processed, self.extension))
    }

    fn save_checkpoint(&mut self, processed: u64, weights: &WeightStore) -> HookResult<()> {
        std::fs::create_dir_all(&self.model_dir)?;
        let path = self.checkpoint_path(processed);
        (self.checkpoint_fn)(&path, weights)?;
        info!(processed, path = %path.display(), "Saved checkpoint");

        if self.saved_paths.back() != Some(&path) {
            self.saved_paths.push_back(path);
        }
        self.prune_old_checkpoints()
    }

    fn prune_old_checkpoints(&mut self) -> HookResult<()> {
        if self.max_to_keep == 0 {
            return Ok(());
        }

        while self.saved_paths.len() > self.max_to_keep {
            if let Some(path) = self.saved_paths.pop_front() {
                match std::fs::remove_file(&path) {
                    Ok(()) => debug!(path = %path.display(), "Removed old checkpoint"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(HookError::Io(e)),
                }
            }
        }
        Ok(())
    }
}

impl Hook for CheckpointHook {
    fn name(&self) -> &str {
        "checkpoint_hook"
    }

    fn after_step(
        &mut self,
        step: u64,
        _metrics: &Metrics,
        weights: &WeightStore,
    ) -> HookResult<HookAction> {
        let processed = step + 1;
        if processed % self.save_every_n_events == 0 {
            self.save_checkpoint(processed, weights)?;
        }
        Ok(HookAction::Continue)
    }

    fn end(&mut self, processed: u64, weights: &WeightStore) -> HookResult<()> {
        // The final snapshot overwrites a periodic one taken at the same count.
        self.save_checkpoint(processed, weights)
    }
}

/// A collection of hooks that are run together.
#[derive(Default)]
pub struct HookList {
    hooks: Vec<Box<dyn Hook>>,
}

impl std::fmt::Debug for HookList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.name()))
            .finish()
    }
}

impl HookList {
    /// Creates a new empty hook list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hook to the list.
    pub fn add<H: Hook + 'static>(&mut self, hook: H) {
        self.hooks.push(Box::new(hook));
    }

    /// Returns the number of hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns `true` if the list holds no hooks.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs `before_step` on all hooks.
    pub fn before_step(&mut self, step: u64) -> HookResult<()> {
        for hook in &mut self.hooks {
            hook.before_step(step)?;
        }
        Ok(())
    }

    /// Runs `after_step` on all hooks.
    ///
    /// Every hook sees the step; returns `HookAction::Stop` if any of them
    /// requests stopping.
    pub fn after_step(
        &mut self,
        step: u64,
        metrics: &Metrics,
        weights: &WeightStore,
    ) -> HookResult<HookAction> {
        let mut action = HookAction::Continue;
        for hook in &mut self.hooks {
            if hook.after_step(step, metrics, weights)? == HookAction::Stop {
                debug!(hook = hook.name(), step, "Hook requested stop");
                action = HookAction::Stop;
            }
        }
        Ok(action)
    }

    /// Runs `end` on all hooks.
    pub fn end(&mut self, processed: u64, weights: &WeightStore) -> HookResult<()> {
        for hook in &mut self.hooks {
            hook.end(processed, weights)?;
        }
        Ok(())
    }
}
