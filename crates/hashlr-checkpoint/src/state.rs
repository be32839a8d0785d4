//! Saved model representation.

use std::collections::BTreeMap;

use hashlr_core::LearnerConfig;
use hashlr_optimizer::WeightStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CheckpointError, Result};

/// Current checkpoint format version.
pub const FORMAT_VERSION: u32 = 1;

/// Everything needed to predict with a model or to continue training it.
///
/// The weight store keeps its last-touched bookkeeping, so a checkpoint
/// taken mid-pass resumes with the lazy decay still owed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCheckpoint {
    /// Format version.
    pub version: u32,

    /// Configuration the weights were trained with.
    pub config: LearnerConfig,

    /// Model parameters.
    pub weights: WeightStore,

    /// Free-form annotations such as the training file.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ModelCheckpoint {
    /// Wraps `weights` trained under `config`.
    pub fn new(config: LearnerConfig, weights: WeightStore) -> Self {
        Self {
            version: FORMAT_VERSION,
            config,
            weights,
            metadata: BTreeMap::new(),
        }
    }

    /// Adds an annotation.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Number of events the weights have seen.
    pub fn global_step(&self) -> u64 {
        self.weights.global_step()
    }

    /// Checks the version and that the weights agree with the config.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::VersionMismatch`] for another format version,
    /// [`CheckpointError::Corrupted`] for inconsistent contents.
    pub fn validate(&self) -> Result<()> {
        if self.version != FORMAT_VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: FORMAT_VERSION,
                found: self.version,
            });
        }
        self.config
            .validate()
            .and_then(|()| self.weights.validate())
            .and_then(|()| self.weights.check_config(&self.config))
            .map_err(|e| CheckpointError::Corrupted(e.to_string()))
    }

    /// Splits into configuration and weights.
    pub fn into_parts(self) -> (LearnerConfig, WeightStore) {
        (self.config, self.weights)
    }

    /// Applies any decay still owed by a mid-pass snapshot.
    ///
    /// Scoring reads the stored weights as they are, so checkpoints must be
    /// settled before they are handed to a predictor. The bookkeeping that
    /// makes a snapshot resumable is consumed by the sweep.
    pub fn into_settled(mut self) -> Self {
        if !self.weights.is_settled() {
            debug!(global_step = self.global_step(), "Settling restored weights");
            self.weights.settle();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dim: usize) -> LearnerConfig {
        LearnerConfig::builder()
            .dim(dim)
            .lambda(0.1)
            .build()
            .unwrap()
    }

    #[test]
    fn test_validate() {
        let checkpoint = ModelCheckpoint::new(config(16), WeightStore::new(&config(16)));
        assert!(checkpoint.validate().is_ok());
        assert_eq!(checkpoint.global_step(), 0);

        let mut old = checkpoint.clone();
        old.version = 0;
        assert!(matches!(
            old.validate(),
            Err(CheckpointError::VersionMismatch {
                expected: FORMAT_VERSION,
                found: 0
            })
        ));

        let mismatched = ModelCheckpoint::new(config(32), WeightStore::new(&config(16)));
        assert!(matches!(
            mismatched.validate(),
            Err(CheckpointError::Corrupted(_))
        ));
    }

    #[test]
    fn test_into_settled_applies_pending_decay() {
        use hashlr_core::{Event, EventContext, FeatureVectorBuilder, Label};
        use hashlr_optimizer::{LazySgd, Optimizer};

        let config = LearnerConfig::builder()
            .dim(1_572_869)
            .step(0.1)
            .lambda(1.0)
            .build()
            .unwrap();
        let builder = FeatureVectorBuilder::from_config(&config).unwrap();
        let mut optimizer = LazySgd::new(config.clone()).unwrap();
        let mut weights = WeightStore::new(&config);

        let clicked = Event::binary(EventContext::default(), true, vec!["a".into()]);
        optimizer
            .step(&mut weights, &builder.build(&clicked), &Label::Clicked(true))
            .unwrap();
        for _ in 0..20 {
            let other = Event::binary(EventContext::default(), false, vec!["b".into()]);
            optimizer
                .step(&mut weights, &builder.build(&other), &Label::Clicked(false))
                .unwrap();
        }
        assert!(!weights.is_settled());

        let expected = weights.settled_hashed();
        let settled = ModelCheckpoint::new(config, weights).into_settled();
        assert!(settled.weights.is_settled());
        assert_eq!(settled.global_step(), 21);
        assert_eq!(settled.weights.settled_hashed(), expected);
        assert_eq!(settled.clone().into_settled(), settled);
    }

    #[test]
    fn test_metadata() {
        let checkpoint = ModelCheckpoint::new(config(8), WeightStore::new(&config(8)))
            .with_metadata("train", "train.txt");
        assert_eq!(checkpoint.metadata.get("train").map(String::as_str), Some("train.txt"));
        let (config, weights) = checkpoint.into_parts();
        assert_eq!(config.dim(), weights.dim());
    }
}
