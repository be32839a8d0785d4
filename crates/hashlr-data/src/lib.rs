//! Dataset loading for hashlr.
//!
//! Reads the joined click-log format into [`Event`](hashlr_core::Event)s:
//!
//! - [`parser`]: the `|`-separated line format and gender mapping.
//! - [`reader`]: lazy, optionally gzip-compressed file readers and the
//!   answer-file reader.
//! - [`stats`]: one-pass dataset statistics.
//!
//! # Example
//!
//! ```no_run
//! use hashlr_data::EventReader;
//!
//! # fn main() -> hashlr_data::Result<()> {
//! for event in EventReader::open("train.txt.gz", true)?.with_limit(1000) {
//!     let event = event?;
//!     println!("{:?}", event.label);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod parser;
pub mod reader;
pub mod stats;

pub use error::{DataError, Result};
pub use parser::{format_line, map_gender, LineParser};
pub use reader::{open_lines, parse_solution, read_solution, Compression, EventReader};
pub use stats::{common_count, DatasetStats};
