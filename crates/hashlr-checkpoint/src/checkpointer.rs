//! Checkpointer trait for save/restore operations.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::state::ModelCheckpoint;
use crate::{CheckpointError, Result};

/// Saving and restoring model checkpoints.
///
/// # Examples
///
/// ```no_run
/// use hashlr_checkpoint::{Checkpointer, JsonCheckpointer, ModelCheckpoint};
/// use hashlr_core::LearnerConfig;
/// use hashlr_optimizer::WeightStore;
/// use std::path::Path;
///
/// fn main() -> hashlr_checkpoint::Result<()> {
///     let config = LearnerConfig::default();
///     let checkpoint = ModelCheckpoint::new(config.clone(), WeightStore::new(&config));
///
///     let checkpointer = JsonCheckpointer::new();
///     checkpointer.save(Path::new("/tmp/model.json.gz"), &checkpoint)?;
///     let restored = checkpointer.restore(Path::new("/tmp/model.json.gz"))?;
///     assert_eq!(restored.global_step(), 0);
///     Ok(())
/// }
/// ```
pub trait Checkpointer: Send + Sync {
    /// Saves `checkpoint` to `path`, creating parent directories.
    fn save(&self, path: &Path, checkpoint: &ModelCheckpoint) -> Result<()>;

    /// Restores and validates the checkpoint at `path`.
    fn restore(&self, path: &Path) -> Result<ModelCheckpoint>;

    /// Finds the checkpoint with the highest step in `dir`.
    fn latest(&self, dir: &Path) -> Option<PathBuf>;
}

/// Returns `true` if `path` names a gzip file.
pub fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

/// Name of the periodic checkpoint taken after `step` events.
pub fn checkpoint_filename(step: u64, compress: bool) -> String {
    if compress {
        format!("checkpoint-{step}.json.gz")
    } else {
        format!("checkpoint-{step}.json")
    }
}

/// Parses the step out of a periodic checkpoint file name.
pub fn parse_step(filename: &str) -> Option<u64> {
    let rest = filename.strip_prefix("checkpoint-")?;
    let step = rest
        .strip_suffix(".json.gz")
        .or_else(|| rest.strip_suffix(".json"))?;
    step.parse().ok()
}

/// JSON checkpoints, gzip-compressed when the path ends in `.gz`.
#[derive(Debug, Clone, Default)]
pub struct JsonCheckpointer {
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
    level: Option<u32>,
}

impl JsonCheckpointer {
    /// Creates a compact JSON checkpointer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a checkpointer that pretty-prints.
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            level: None,
        }
    }

    /// Sets the gzip level (0-9) used for `.gz` paths.
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level.min(9));
        self
    }

    fn compression(&self) -> Compression {
        self.level.map_or_else(Compression::default, Compression::new)
    }

    fn write_json<W: Write>(&self, writer: W, checkpoint: &ModelCheckpoint) -> serde_json::Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(writer, checkpoint)
        } else {
            serde_json::to_writer(writer, checkpoint)
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CheckpointError + '_ {
    move |source| CheckpointError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl Checkpointer for JsonCheckpointer {
    fn save(&self, path: &Path, checkpoint: &ModelCheckpoint) -> Result<()> {
        let compressed = is_gzip(path);
        tracing::info!(
            path = %path.display(),
            step = checkpoint.global_step(),
            compressed,
            "Saving checkpoint"
        );

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let file = File::create(path).map_err(io_error(path))?;
        let mut writer = BufWriter::new(file);
        if compressed {
            let mut encoder = GzEncoder::new(&mut writer, self.compression());
            self.write_json(&mut encoder, checkpoint)
                .map_err(CheckpointError::Serialization)?;
            encoder.finish().map_err(io_error(path))?;
        } else {
            self.write_json(&mut writer, checkpoint)
                .map_err(CheckpointError::Serialization)?;
        }
        writer.flush().map_err(io_error(path))?;

        tracing::debug!(
            path = %path.display(),
            size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            "Checkpoint saved"
        );
        Ok(())
    }

    fn restore(&self, path: &Path) -> Result<ModelCheckpoint> {
        tracing::info!(path = %path.display(), "Restoring checkpoint");

        if !path.exists() {
            return Err(CheckpointError::NotFound(path.to_path_buf()));
        }

        let file = File::open(path).map_err(io_error(path))?;
        let reader: Box<dyn Read> = if is_gzip(path) {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        let checkpoint: ModelCheckpoint =
            serde_json::from_reader(reader).map_err(CheckpointError::Deserialization)?;
        checkpoint.validate()?;

        tracing::info!(
            path = %path.display(),
            step = checkpoint.global_step(),
            dim = checkpoint.config.dim(),
            "Checkpoint restored"
        );
        Ok(checkpoint)
    }

    fn latest(&self, dir: &Path) -> Option<PathBuf> {
        let entries = std::fs::read_dir(dir).ok()?;
        entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                let step = parse_step(path.file_name()?.to_str()?)?;
                Some((step, path))
            })
            .max_by_key(|(step, _)| *step)
            .map(|(_, path)| path)
    }
}
