//! Persistence for hashlr models.
//!
//! This crate provides:
//!
//! - **Save/Restore**: [`ModelCheckpoint`]s written as JSON through a
//!   [`Checkpointer`], gzip-compressed when the path ends in `.gz`.
//! - **Prediction files**: [`write_predictions`] / [`read_predictions`].
//!
//! A checkpoint keeps the lazy-regularization bookkeeping of the weight
//! store, so training can resume from it.
//!
//! # Example
//!
//! ```no_run
//! use hashlr_checkpoint::{Checkpointer, JsonCheckpointer, ModelCheckpoint};
//! use hashlr_core::LearnerConfig;
//! use hashlr_optimizer::WeightStore;
//! use std::path::Path;
//!
//! fn main() -> hashlr_checkpoint::Result<()> {
//!     let config = LearnerConfig::default();
//!     let weights = WeightStore::new(&config);
//!     let checkpointer = JsonCheckpointer::new();
//!     checkpointer.save(Path::new("/tmp/hashlr/model.json"), &ModelCheckpoint::new(config, weights))?;
//!     let latest = checkpointer.latest(Path::new("/tmp/hashlr"));
//!     Ok(())
//! }
//! ```

pub mod checkpointer;
pub mod predictions;
pub mod state;

pub use checkpointer::{checkpoint_filename, is_gzip, parse_step, Checkpointer, JsonCheckpointer};
pub use predictions::{read_predictions, write_predictions};
pub use state::{ModelCheckpoint, FORMAT_VERSION};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during checkpoint operations.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// I/O error during checkpoint operations.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Checkpoint file not found.
    #[error("Checkpoint not found: {0}")]
    NotFound(PathBuf),

    /// Error during serialization.
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Error during deserialization.
    #[error("Deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// Checkpoint written by another format version.
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version.
        expected: u32,
        /// Found version.
        found: u32,
    },

    /// Contents that parse but are inconsistent.
    #[error("Corrupted checkpoint: {0}")]
    Corrupted(String),
}

/// Result type for checkpoint operations.
pub type Result<T> = std::result::Result<T, CheckpointError>;
