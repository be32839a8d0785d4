//! Weight storage and SGD updates for hashlr.
//!
//! This crate owns the model parameters and the rule that changes them. Each
//! update rule implements the [`Optimizer`] trait.
//!
//! # Available Optimizers
//!
//! - [`LazySgd`] - L2-regularized SGD with deferred decay of unreferenced
//!   weights; the production update rule
//! - [`EagerSgd`] - the same objective, decaying every weight on every step;
//!   a reference for checking the lazy rule
//!
//! # Example
//!
//! ```
//! use hashlr_core::{Event, EventContext, FeatureVectorBuilder, LearnerConfig};
//! use hashlr_optimizer::{LazySgd, Optimizer, WeightStore};
//!
//! let config = LearnerConfig::builder().dim(8).step(0.1).lambda(0.01).build().unwrap();
//! let builder = FeatureVectorBuilder::from_config(&config).unwrap();
//! let mut store = WeightStore::new(&config);
//! let mut sgd = LazySgd::new(config).unwrap();
//!
//! let event = Event::binary(EventContext::default(), true, vec!["a".to_string()]);
//! let report = sgd.step(&mut store, &builder.build(&event), &event.label).unwrap();
//! assert!((report.probability - 0.5).abs() < 1e-12);
//! assert_eq!(store.global_step(), 1);
//! ```

use hashlr_core::{FeatureVector, Label, LearnerConfig, Result};

mod eager;
pub mod lazy;
pub mod logistic;
mod sgd;
pub mod weights;

pub use eager::EagerSgd;
pub use lazy::decay_factor;
pub use sgd::LazySgd;
pub use weights::{DenseWeights, WeightStore};

/// Outcome of a single update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Step index of the processed event.
    pub step: u64,
    /// Margin `w . x` before the update.
    pub margin: f64,
    /// Predicted click probability before the update.
    pub probability: f64,
    /// Loss gradient w.r.t. the margin.
    pub gradient: f64,
    /// Negative log-likelihood of the label before the update.
    pub loss: f64,
    /// Impressions the label stands for.
    pub impressions: u32,
    /// Clicks the label stands for.
    pub clicks: u32,
}

/// Trait for weight update rules.
///
/// An optimizer consumes one event's feature vector and label per call and
/// mutates the [`WeightStore`] in place.
pub trait Optimizer: Sized {
    /// Creates a new optimizer from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    fn new(config: LearnerConfig) -> Result<Self>;

    /// Returns the optimizer name, used in logs.
    fn name(&self) -> &'static str;

    /// Returns the configuration the optimizer was created with.
    fn config(&self) -> &LearnerConfig;

    /// Applies the update of one event.
    ///
    /// The event is step `store.global_step()`; the counter advances by one
    /// on success. On error the store is left unchanged.
    ///
    /// # Errors
    ///
    /// - [`HashlrError::ConfigurationMismatch`](hashlr_core::HashlrError::ConfigurationMismatch)
    ///   if `features` was built for a different store.
    /// - [`HashlrError::MissingLabel`](hashlr_core::HashlrError::MissingLabel) or
    ///   [`HashlrError::InvalidLabel`](hashlr_core::HashlrError::InvalidLabel)
    ///   for an unusable label.
    fn step(
        &mut self,
        store: &mut WeightStore,
        features: &FeatureVector,
        label: &Label,
    ) -> Result<StepReport>;

    /// Brings every weight up to date so that the store can be read directly.
    fn settle(&mut self, store: &mut WeightStore);
}
