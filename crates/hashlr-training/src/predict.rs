//! The predictor.
//!
//! Scoring is a pure function of the weights and the feature vector: it never
//! mutates the store and performs no lazy catch-up, so it should be given the
//! settled weights returned by [`OnlineLearner::finish`](crate::OnlineLearner::finish).

use hashlr_core::{Event, FeatureVector, FeatureVectorBuilder, LearnerConfig, Result};
use hashlr_optimizer::logistic::sigmoid;
use hashlr_optimizer::WeightStore;

/// Returns the click probability of `features` under `weights`.
///
/// # Errors
///
/// Returns a configuration mismatch if `features` was built for a different
/// hashed dimension or layout than `weights`.
///
/// # Examples
///
/// ```
/// use hashlr_core::{FeatureVector, HashedFeatureBag, LearnerConfig};
/// use hashlr_optimizer::WeightStore;
/// use hashlr_training::predict;
///
/// let config = LearnerConfig::builder().dim(8).build().unwrap();
/// let weights = WeightStore::new(&config);
/// let features = FeatureVector::new(8, None, HashedFeatureBag::new());
/// assert_eq!(predict(&weights, &features).unwrap(), 0.5);
///
/// let wrong = FeatureVector::new(16, None, HashedFeatureBag::new());
/// assert!(predict(&weights, &wrong).is_err());
/// ```
pub fn predict(weights: &WeightStore, features: &FeatureVector) -> Result<f64> {
    weights.check_compatible(features)?;
    Ok(sigmoid(weights.dot(features)))
}

/// Scores events with the feature pipeline they were trained with.
#[derive(Debug, Clone, Copy)]
pub struct Predictor {
    builder: FeatureVectorBuilder,
}

impl Predictor {
    /// Creates a predictor for `config`.
    pub fn new(config: &LearnerConfig) -> Result<Self> {
        Ok(Self::from_builder(FeatureVectorBuilder::from_config(config)?))
    }

    /// Creates a predictor from an existing builder.
    pub fn from_builder(builder: FeatureVectorBuilder) -> Self {
        Self { builder }
    }

    /// Returns the feature vector builder.
    pub fn builder(&self) -> &FeatureVectorBuilder {
        &self.builder
    }

    /// Returns the click probability of `event`. Labels are ignored.
    pub fn predict(&self, weights: &WeightStore, event: &Event) -> Result<f64> {
        predict(weights, &self.builder.build(event))
    }

    /// Scores every event, stopping at the first error.
    pub fn predict_all<'a, I>(&self, weights: &WeightStore, events: I) -> Result<Vec<f64>>
    where
        I: IntoIterator<Item = &'a Event>,
    {
        events
            .into_iter()
            .map(|event| self.predict(weights, event))
            .collect()
    }
}
