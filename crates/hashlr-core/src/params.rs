//! Learner configuration.
//!
//! [`LearnerConfig`] carries everything that must agree between training and
//! prediction (hashed dimension, personalization, layout) plus the SGD
//! hyperparameters. Defaults follow the settings of the reference runs:
//! `dim = 1_572_869`, `step = 0.01`, `lambda = 0`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HashlrError, Result};
use crate::feature::FeatureLayout;

/// Default hashed-space size.
pub const DEFAULT_DIM: usize = 1_572_869;

/// Default SGD step size.
pub const DEFAULT_STEP: f64 = 0.01;

/// Default progress logging interval, in events.
pub const DEFAULT_LOG_EVERY: u64 = 100_000;

/// Configuration of the online learner and of the feature pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Size of the hashed weight space.
    dim: usize,

    /// SGD learning rate.
    step: f64,

    /// L2 regularization strength.
    lambda: f64,

    /// Whether per-user terms are hashed alongside the global ones.
    personalized: bool,

    /// How the scalar fields enter the model.
    layout: FeatureLayout,

    /// Progress logging interval, in events.
    log_every: u64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            dim: DEFAULT_DIM,
            step: DEFAULT_STEP,
            lambda: 0.0,
            personalized: false,
            layout: FeatureLayout::default(),
            log_every: DEFAULT_LOG_EVERY,
        }
    }
}

impl LearnerConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder starting from the defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use hashlr_core::params::LearnerConfig;
    ///
    /// let config = LearnerConfig::builder()
    ///     .dim(12289)
    ///     .step(0.05)
    ///     .lambda(0.001)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.dim(), 12289);
    /// ```
    pub fn builder() -> LearnerConfigBuilder {
        LearnerConfigBuilder::new()
    }

    /// Loads and validates a JSON configuration file.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: LearnerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the hashed-space size.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the SGD step size.
    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Returns the L2 strength.
    #[inline]
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Returns whether personalization is on.
    #[inline]
    pub fn personalized(&self) -> bool {
        self.personalized
    }

    /// Returns the feature layout.
    #[inline]
    pub fn layout(&self) -> FeatureLayout {
        self.layout
    }

    /// Returns the progress logging interval.
    #[inline]
    pub fn log_every(&self) -> u64 {
        self.log_every
    }

    /// Per-step multiplicative decay `1 - step * lambda`.
    #[inline]
    pub fn decay(&self) -> f64 {
        1.0 - self.step * self.lambda
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.dim == 0 {
            return Err(HashlrError::InvalidConfig {
                message: "hashed dimension must be greater than 0".to_string(),
            });
        }

        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(HashlrError::InvalidConfig {
                message: format!("step must be positive and finite, got {}", self.step),
            });
        }

        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            return Err(HashlrError::InvalidConfig {
                message: format!(
                    "lambda must be non-negative and finite, got {}",
                    self.lambda
                ),
            });
        }

        Ok(())
    }
}

/// Builder for [`LearnerConfig`].
#[derive(Debug, Clone, Default)]
pub struct LearnerConfigBuilder {
    config: LearnerConfig,
}

impl LearnerConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    pub fn from_config(config: LearnerConfig) -> Self {
        Self { config }
    }

    /// Sets the hashed-space size.
    pub fn dim(mut self, dim: usize) -> Self {
        self.config.dim = dim;
        self
    }

    /// Sets the SGD step size.
    pub fn step(mut self, step: f64) -> Self {
        self.config.step = step;
        self
    }

    /// Sets the L2 strength.
    pub fn lambda(mut self, lambda: f64) -> Self {
        self.config.lambda = lambda;
        self
    }

    /// Turns personalization on or off.
    pub fn personalized(mut self, personalized: bool) -> Self {
        self.config.personalized = personalized;
        self
    }

    /// Sets the feature layout.
    pub fn layout(mut self, layout: FeatureLayout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Sets the progress logging interval.
    pub fn log_every(mut self, log_every: u64) -> Self {
        self.config.log_every = log_every;
        self
    }

    /// Builds the configuration, validating it first.
    pub fn build(self) -> Result<LearnerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
