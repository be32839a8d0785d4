//! Error types for dataset loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or parsing impression data.
#[derive(Debug, Error)]
pub enum DataError {
    /// An I/O error while reading a stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A data file could not be opened.
    #[error("Cannot open {path}: {source}")]
    Open {
        /// The file that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A line that does not follow the joined line format.
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: u64,
        /// What was wrong with the line.
        message: String,
    },

    /// A line with fewer fields than the format requires.
    #[error("Line {line} is missing the {field} field")]
    MissingField {
        /// 1-based line number.
        line: u64,
        /// Name of the first absent field.
        field: &'static str,
    },
}

impl DataError {
    pub(crate) fn parse(line: u64, message: impl Into<String>) -> Self {
        DataError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Returns the 1-based line number the error refers to, if any.
    pub fn line(&self) -> Option<u64> {
        match self {
            DataError::Parse { line, .. } | DataError::MissingField { line, .. } => Some(*line),
            DataError::Io(_) | DataError::Open { .. } => None,
        }
    }
}

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;
