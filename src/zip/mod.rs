//! ZIP archive reading and writing.
//!
//! This module provides the codec for document packages, which are plain
//! ZIP archives.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of ZIP structures from raw bytes
//! - [`extractor`]: Entry decompression, verification and extraction to disk
//! - [`writer`]: Building a new archive with DEFLATE-compressed entries
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! ## Supported Features
//!
//! - Reading standard ZIP and ZIP64 directories
//! - STORED and DEFLATE compression methods
//! - CRC-32 verification on extraction
//! - Writing standard (non-ZIP64) archives
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod extractor;
mod parser;
mod structures;
mod writer;

pub use extractor::{ZipExtractor, sanitize_entry_name};
pub use parser::ZipParser;
pub use structures::*;
pub use writer::ZipWriter;
