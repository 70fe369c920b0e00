//! # footfix
//!
//! Normalizes footnote formatting inside WordprocessingML (`.docx`) packages.
//!
//! A run copies the input archive, unpacks the copy into a scoped temporary
//! directory, restyles `word/footnotes.xml` and packs the directory back.
//! Every other entry is carried over byte for byte.
//!
//! ## Footnote style
//!
//! - paragraph spacing before/after 0, single line spacing
//! - Times New Roman for Western and complex-script text, 宋体 for East Asian text
//! - 10pt, upright, black
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! fn main() -> footfix::Result<()> {
//!     let outcome = footfix::normalize(Path::new("thesis.docx"), None)?;
//!     match outcome.stats {
//!         Some(stats) => println!("{} footnotes", stats.footnotes),
//!         None => println!("no footnotes"),
//!     }
//!     println!("{}", outcome.output.display());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod fixer;
pub mod footnotes;
pub mod io;
pub mod workspace;
pub mod xml;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, Result};
pub use fixer::{FOOTNOTES_PART, Outcome, default_output_path, normalize, normalize_with};
pub use footnotes::{FootnoteNormalizer, FootnoteStats, StylePolicy};
pub use io::{LocalFileReader, ReadAt};
pub use workspace::{ManifestEntry, WorkingArea};
pub use zip::{ZipExtractor, ZipFileEntry, ZipWriter};
