//! The online learner.
//!
//! [`OnlineLearner`] drives a single pass over an event stream: it builds each
//! event's feature vector, hands it to the update rule, and runs the hooks.
//! Events are applied strictly in order on the calling thread.
//!
//! # Training Loop
//!
//! For each event:
//! 1. `hooks.before_step(step)`
//! 2. build the feature vector and apply the update
//! 3. `hooks.after_step(step, metrics, weights)`; a `Stop` ends the pass
//!
//! [`OnlineLearner::finish`] then applies all pending L2 decay, runs
//! `hooks.end`, and returns the weights.

use hashlr_core::{Event, FeatureVectorBuilder, LearnerConfig};
use hashlr_optimizer::{LazySgd, Optimizer, StepReport, WeightStore};
use tracing::{debug, info, warn};

use crate::error::{Result, TrainingError};
use crate::hooks::{Hook, HookAction, HookList, LoggingHook};
use crate::metrics::Metrics;

/// Single-pass online logistic-regression learner.
///
/// # Examples
///
/// ```
/// use hashlr_core::{Event, EventContext, LearnerConfig};
/// use hashlr_training::OnlineLearner;
///
/// let config = LearnerConfig::builder().dim(97).step(0.1).build().unwrap();
/// let mut learner = OnlineLearner::new(config).unwrap();
/// let event = Event::binary(EventContext::default(), true, vec!["7".to_string()]);
/// learner.update(&event).unwrap();
/// let weights = learner.finish().unwrap();
/// assert_eq!(weights.global_step(), 1);
/// assert!(weights.bias() > 0.0);
/// ```
#[derive(Debug)]
pub struct OnlineLearner<O: Optimizer = LazySgd> {
    config: LearnerConfig,
    builder: FeatureVectorBuilder,
    optimizer: O,
    weights: WeightStore,
    hooks: HookList,
    expected_events: Option<u64>,
    stopped: bool,
}

impl OnlineLearner<LazySgd> {
    /// Creates a learner with zero weights and the lazy update rule.
    pub fn new(config: LearnerConfig) -> Result<Self> {
        Self::with_optimizer(config)
    }

    /// Continues training from a restored weight store.
    ///
    /// # Errors
    ///
    /// Returns a configuration mismatch if `weights` was created with a
    /// different dimension, layout, step or lambda, or if its lazy
    /// bookkeeping is inconsistent.
    pub fn resume(weights: WeightStore, config: LearnerConfig) -> Result<Self> {
        weights.validate()?;
        weights.check_config(&config)?;
        let mut learner = Self::with_optimizer(config)?;
        info!(
            global_step = weights.global_step(),
            touched = weights.touched_indices().len(),
            "Resuming from restored weights"
        );
        learner.weights = weights;
        Ok(learner)
    }
}

impl<O: Optimizer> OnlineLearner<O> {
    /// Creates a learner with zero weights and the update rule `O`.
    pub fn with_optimizer(config: LearnerConfig) -> Result<Self> {
        let builder = FeatureVectorBuilder::from_config(&config)?;
        let optimizer = O::new(config.clone())?;
        let weights = WeightStore::new(&config);
        debug!(
            optimizer = optimizer.name(),
            dim = config.dim(),
            layout = %config.layout(),
            personalized = config.personalized(),
            "Created online learner"
        );
        Ok(Self {
            config,
            builder,
            optimizer,
            weights,
            hooks: HookList::new(),
            expected_events: None,
            stopped: false,
        })
    }

    /// Adds a hook.
    pub fn add_hook<H: Hook + 'static>(&mut self, hook: H) {
        self.hooks.add(hook);
    }

    /// Adds a hook, builder style.
    pub fn with_hook<H: Hook + 'static>(mut self, hook: H) -> Self {
        self.add_hook(hook);
        self
    }

    /// Declares how many events the pass is expected to consume.
    ///
    /// [`finish`](Self::finish) warns if fewer were processed.
    pub fn with_expected_events(mut self, expected: u64) -> Self {
        self.expected_events = Some(expected);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Returns the feature vector builder used for every event.
    pub fn builder(&self) -> &FeatureVectorBuilder {
        &self.builder
    }

    /// Returns the current weights. Hashed weights may owe pending decay.
    pub fn weights(&self) -> &WeightStore {
        &self.weights
    }

    /// Returns the number of events applied so far.
    pub fn global_step(&self) -> u64 {
        self.weights.global_step()
    }

    /// Returns `true` once a hook has requested a stop.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Applies one labeled event.
    ///
    /// # Errors
    ///
    /// Fails on an unlabeled event, an invalid aggregated label, or a hook
    /// error. The weights are untouched when the label is rejected.
    pub fn update(&mut self, event: &Event) -> Result<StepReport> {
        let step = self.weights.global_step();
        self.hooks.before_step(step)?;

        let features = self.builder.build(event);
        let report = self.optimizer.step(&mut self.weights, &features, &event.label)?;

        let metrics = Metrics::from_report(&report);
        if self.hooks.after_step(step, &metrics, &self.weights)? == HookAction::Stop {
            self.stopped = true;
        }
        Ok(report)
    }

    /// Applies every event of `events` in order, until exhausted or stopped.
    ///
    /// Returns the number of events applied by this call.
    pub fn train<I>(&mut self, events: I) -> Result<u64>
    where
        I: IntoIterator<Item = Event>,
    {
        self.try_train(events.into_iter().map(Ok::<_, std::convert::Infallible>))
    }

    /// Like [`train`](Self::train), for a fallible event source.
    ///
    /// The first source error ends the pass; events applied before it stay
    /// applied.
    pub fn try_train<I, E>(&mut self, events: I) -> Result<u64>
    where
        I: IntoIterator<Item = std::result::Result<Event, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut applied = 0u64;
        for event in events {
            if self.stopped {
                break;
            }
            let event = event.map_err(|e| TrainingError::Source(Box::new(e)))?;
            self.update(&event)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Ends the pass: settles all pending decay, runs the end hooks and
    /// returns the weights.
    pub fn finish(mut self) -> Result<WeightStore> {
        self.optimizer.settle(&mut self.weights);
        let processed = self.weights.global_step();

        if let Some(expected) = self.expected_events {
            if processed < expected {
                warn!(processed, expected, "Event source ended early");
            }
        }

        self.hooks.end(processed, &self.weights)?;
        Ok(self.weights)
    }
}

/// Trains a fresh model over `events` in one pass and returns the settled
/// weights.
///
/// Progress is logged every `config.log_every()` events.
pub fn train<I>(events: I, config: LearnerConfig) -> Result<WeightStore>
where
    I: IntoIterator<Item = Event>,
{
    let log_every = config.log_every();
    let mut learner = OnlineLearner::new(config)?.with_hook(LoggingHook::new(log_every));
    learner.train(events)?;
    learner.finish()
}
