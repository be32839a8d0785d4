//! Streaming dataset readers.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use hashlr_core::Event;
use tracing::{debug, info};

use crate::error::{DataError, Result};
use crate::parser::LineParser;

/// Compression of a data file, detected from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Plain text.
    #[default]
    None,
    /// Gzip.
    Gzip,
}

impl Compression {
    /// Detects the compression from a path's extension.
    ///
    /// ```
    /// use hashlr_data::Compression;
    ///
    /// assert_eq!(Compression::from_path("train.txt.gz"), Compression::Gzip);
    /// assert_eq!(Compression::from_path("train.txt"), Compression::None);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("gzip") => {
                Compression::Gzip
            }
            _ => Compression::None,
        }
    }
}

/// Opens `path` for buffered line reading, decompressing `.gz` files.
pub fn open_lines(path: impl AsRef<Path>) -> Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DataError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let compression = Compression::from_path(path);
    debug!(path = %path.display(), ?compression, "Opened data file");
    Ok(match compression {
        Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(file))),
        Compression::None => Box::new(BufReader::new(file)),
    })
}

/// Lazily parses events from a line stream.
///
/// Blank lines are skipped. Iteration ends at end of input, after `limit`
/// events, or after yielding the first error.
///
/// # Examples
///
/// ```
/// use hashlr_data::EventReader;
///
/// let data = "0|1|1|1|5|6|7|8|0,0,0\n1|2|1|2|5|6|7|8|3,2,1\n";
/// let events: Vec<_> = EventReader::new(data.as_bytes(), true)
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(events.len(), 2);
/// ```
#[derive(Debug)]
pub struct EventReader<R> {
    reader: R,
    parser: LineParser,
    buf: String,
    line_no: u64,
    limit: Option<u64>,
    yielded: u64,
    failed: bool,
}

impl<R: BufRead> EventReader<R> {
    /// Creates a reader over `reader`; `labeled` selects the line format.
    pub fn new(reader: R, labeled: bool) -> Self {
        Self {
            reader,
            parser: LineParser::new(labeled),
            buf: String::new(),
            line_no: 0,
            limit: None,
            yielded: 0,
            failed: false,
        }
    }

    /// Stops after `limit` events.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the number of events yielded so far.
    pub fn events_read(&self) -> u64 {
        self.yielded
    }

    /// Returns the number of lines consumed so far.
    pub fn lines_read(&self) -> u64 {
        self.line_no
    }
}

impl EventReader<Box<dyn BufRead + Send>> {
    /// Opens a dataset file, gzip-compressed if it ends in `.gz`.
    pub fn open(path: impl AsRef<Path>, labeled: bool) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), labeled, "Loading data");
        Ok(Self::new(open_lines(path)?, labeled))
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.limit.is_some_and(|limit| self.yielded >= limit) {
            return None;
        }
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    self.failed = true;
                    return Some(Err(DataError::Io(e)));
                }
            }
            self.line_no += 1;
            if self.buf.trim().is_empty() {
                continue;
            }
            return Some(match self.parser.parse(&self.buf, self.line_no) {
                Ok(event) => {
                    self.yielded += 1;
                    Ok(event)
                }
                Err(e) => {
                    self.failed = true;
                    Err(e)
                }
            });
        }
    }
}

/// Reads an answer file of `clicks,impressions` lines.
///
/// # Errors
///
/// Fails on unreadable files or malformed lines; the error carries the
/// 1-based line number.
pub fn read_solution(path: impl AsRef<Path>) -> Result<Vec<(u32, u32)>> {
    let path = path.as_ref();
    let solution = parse_solution(open_lines(path)?)?;
    info!(path = %path.display(), instances = solution.len(), "Loaded solution");
    Ok(solution)
}

/// Parses `clicks,impressions` lines from a stream. Blank lines are skipped.
pub fn parse_solution(reader: impl BufRead) -> Result<Vec<(u32, u32)>> {
    let mut solution = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i as u64 + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split(',');
        let mut count = |field: &'static str| -> Result<u32> {
            let raw = fields
                .next()
                .ok_or(DataError::MissingField {
                    line: line_no,
                    field,
                })?;
            raw.trim().parse().map_err(|_| DataError::Parse {
                line: line_no,
                message: format!("{field} is not a non-negative integer: {raw:?}"),
            })
        };
        let clicks = count("clicks")?;
        let impressions = count("impressions")?;
        solution.push((clicks, impressions));
    }
    Ok(solution)
}
