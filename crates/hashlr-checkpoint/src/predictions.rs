//! Prediction files: one click probability per line.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::{CheckpointError, Result};

/// Writes `predictions` to `path`, one per line with `precision` decimals.
///
/// # Examples
///
/// ```
/// use hashlr_checkpoint::{read_predictions, write_predictions};
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("preds.txt");
/// write_predictions(&path, &[0.25, 0.125], 3).unwrap();
/// assert_eq!(std::fs::read_to_string(&path).unwrap(), "0.250\n0.125\n");
/// assert_eq!(read_predictions(&path).unwrap(), vec![0.25, 0.125]);
/// ```
pub fn write_predictions(path: impl AsRef<Path>, predictions: &[f64], precision: usize) -> Result<()> {
    let path = path.as_ref();
    let io = |source: std::io::Error| CheckpointError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    let mut writer = BufWriter::new(File::create(path).map_err(io)?);
    for p in predictions {
        writeln!(writer, "{p:.precision$}").map_err(io)?;
    }
    writer.flush().map_err(io)?;
    tracing::info!(path = %path.display(), count = predictions.len(), "Wrote predictions");
    Ok(())
}

/// Reads a prediction file written by [`write_predictions`].
///
/// # Errors
///
/// [`CheckpointError::Corrupted`] names the first line that is not a
/// probability.
pub fn read_predictions(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let io = |source: std::io::Error| CheckpointError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io)?;
    let mut predictions = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let p: f64 = line.parse().map_err(|_| {
            CheckpointError::Corrupted(format!("line {}: not a number: {line:?}", i + 1))
        })?;
        if !(0.0..=1.0).contains(&p) {
            return Err(CheckpointError::Corrupted(format!(
                "line {}: probability out of range: {p}",
                i + 1
            )));
        }
        predictions.push(p);
    }
    Ok(predictions)
}
