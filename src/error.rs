//! Error types for footfix.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for footfix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a normalization run.
///
/// A document without a footnote part is not an error; see
/// [`Outcome::stats`](crate::Outcome::stats).
#[derive(Error, Debug)]
pub enum Error {
    /// The input is not a readable ZIP container.
    #[error("cannot read archive {}: {reason}", path.display())]
    ArchiveRead { path: PathBuf, reason: String },

    /// Repackaging the working area failed; any output is invalid.
    #[error("cannot write archive {}: {reason}", path.display())]
    ArchiveWrite { path: PathBuf, reason: String },

    /// The footnote part is not well-formed XML.
    #[error("cannot parse part {part}: {reason}")]
    PartParse { part: String, reason: String },

    /// File system failure outside the archive codec.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn archive_read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Error::ArchiveRead {
            path: path.into(),
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn archive_write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Error::ArchiveWrite {
            path: path.into(),
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn part_parse(part: &str, err: impl std::fmt::Display) -> Self {
        Error::PartParse {
            part: part.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_path_and_stage() {
        let err = Error::archive_read("thesis.docx", "Not a valid ZIP file");
        assert_eq!(
            err.to_string(),
            "cannot read archive thesis.docx: Not a valid ZIP file"
        );

        let err = Error::part_parse("word/footnotes.xml", "unexpected end of input");
        assert!(err.to_string().starts_with("cannot parse part word/footnotes.xml"));
    }

    #[test]
    fn test_anyhow_chain_is_flattened() {
        let inner = anyhow::anyhow!("CRC mismatch").context("word/document.xml");
        let err = Error::archive_read("a.docx", inner);
        assert_eq!(
            err.to_string(),
            "cannot read archive a.docx: word/document.xml: CRC mismatch"
        );
    }
}
