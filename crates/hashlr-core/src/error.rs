//! Error types for the hashlr core library.
//!
//! This module defines the error type shared by the feature pipeline, the
//! weight store and the online learner.

use thiserror::Error;

/// The main error type for hashlr-core operations.
#[derive(Debug, Error)]
pub enum HashlrError {
    /// Error when a configuration value is out of its valid range.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// A description of the offending value.
        message: String,
    },

    /// Error when two components disagree on a shared setting, such as the
    /// hashed-space size used to build a feature vector and the size of the
    /// weight store it is scored against.
    #[error("Configuration mismatch for {what}: expected {expected}, got {actual}")]
    ConfigurationMismatch {
        /// The setting that differs.
        what: &'static str,
        /// The value the receiving component was built with.
        expected: String,
        /// The value carried by the argument.
        actual: String,
    },

    /// Error when a training event carries no label.
    #[error("Event at step {step} has no label")]
    MissingLabel {
        /// The step at which the event was offered.
        step: u64,
    },

    /// Error when an aggregated label reports more clicks than impressions.
    #[error("Invalid label: {clicks} clicks out of {impressions} impressions")]
    InvalidLabel {
        /// Number of clicks.
        clicks: u32,
        /// Number of impressions.
        impressions: u32,
    },

    /// Error reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error decoding a configuration file.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HashlrError {
    /// Shorthand for a [`HashlrError::ConfigurationMismatch`].
    pub fn mismatch(
        what: &'static str,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        HashlrError::ConfigurationMismatch {
            what,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// A specialized Result type for hashlr-core operations.
pub type Result<T> = std::result::Result<T, HashlrError>;
