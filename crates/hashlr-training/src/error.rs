//! Error types for the training crate.

use hashlr_core::HashlrError;
use thiserror::Error;

use crate::hooks::HookError;

/// Errors that can occur while training or scoring.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// Error raised by the feature pipeline or the update rule.
    #[error(transparent)]
    Core(#[from] HashlrError),

    /// Error raised by a training hook.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// The prefetch queue was closed.
    #[error("Prefetch queue closed")]
    QueueClosed,

    /// The event source failed to produce an event.
    #[error("Event source error: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type for training operations.
pub type Result<T> = std::result::Result<T, TrainingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrainingError::from(HashlrError::mismatch("dim", 8, 16));
        assert_eq!(
            err.to_string(),
            "Configuration mismatch for dim: expected 8, got 16"
        );

        let err = TrainingError::from(HookError::Custom("boom".to_string()));
        assert_eq!(err.to_string(), "Hook error: boom");

        let err = TrainingError::from(HookError::Checkpoint("disk full".to_string()));
        assert_eq!(err.to_string(), "Checkpoint error: disk full");

        assert_eq!(TrainingError::QueueClosed.to_string(), "Prefetch queue closed");

        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
        let err = TrainingError::Source(Box::new(io));
        assert_eq!(err.to_string(), "Event source error: truncated");
    }
}
