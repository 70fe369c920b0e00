//! End-to-end normalization of one document package.

use chrono::NaiveDateTime;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::footnotes::{FootnoteNormalizer, FootnoteStats, StylePolicy};
use crate::workspace::WorkingArea;
use crate::xml::{self, XmlDocument};

/// Package part holding footnote content
pub const FOOTNOTES_PART: &str = "word/footnotes.xml";

/// Inserted between the input stem and the timestamp of a derived output name
pub const OUTPUT_SUFFIX: &str = "_fixed_";

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub output: PathBuf,
    /// `None` when the package has no footnote part and was copied unchanged
    pub stats: Option<FootnoteStats>,
}

/// `<dir>/<stem>_fixed_<YYYYmmdd_HHMM>.docx` next to the input
pub fn default_output_path(input: &Path, at: NaiveDateTime) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!(
        "{stem}{OUTPUT_SUFFIX}{}.docx",
        at.format("%Y%m%d_%H%M")
    ))
}

/// Normalize footnotes with the default [`StylePolicy`]
pub fn normalize(input: &Path, output: Option<&Path>) -> Result<Outcome> {
    normalize_with(input, output, &StylePolicy::default())
}

/// Copy `input` to the output path and normalize the copy's footnote part.
///
/// The output name is derived when `output` is `None`. The temporary working
/// area is removed on every path; on failure the output file is removed too.
pub fn normalize_with(
    input: &Path,
    output: Option<&Path>,
    policy: &StylePolicy,
) -> Result<Outcome> {
    let output = match output {
        Some(path) => path.to_path_buf(),
        None => default_output_path(input, chrono::Local::now().naive_local()),
    };

    let meta = fs::metadata(input).map_err(|e| Error::archive_read(input, e))?;
    if !meta.is_file() {
        return Err(Error::archive_read(input, "not a regular file"));
    }
    if same_file(input, &output) {
        return Err(Error::io(
            &output,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "output would overwrite the input",
            ),
        ));
    }

    debug!("copying {} to {}", input.display(), output.display());
    fs::copy(input, &output).map_err(|e| Error::io(&output, e))?;
    let stats = guarded(&output, || normalize_copy(input, &output, policy))?;

    if let Some(stats) = &stats {
        info!(
            "normalized {} footnotes ({} paragraphs, {} runs) into {}",
            stats.footnotes,
            stats.paragraphs,
            stats.runs,
            output.display()
        );
    }
    Ok(Outcome { output, stats })
}

/// Restyle the footnote part of `output`, a fresh copy of `input`, in place.
///
/// Returns `None` when the package has no footnote part; the copy is then
/// left untouched.
fn normalize_copy(
    input: &Path,
    output: &Path,
    policy: &StylePolicy,
) -> Result<Option<FootnoteStats>> {
    // The copy is an implementation detail: report the file the caller named
    let area = WorkingArea::unpack(output).map_err(|e| match e {
        Error::ArchiveRead { reason, .. } => Error::ArchiveRead {
            path: input.to_path_buf(),
            reason,
        },
        other => other,
    })?;

    let Some(mut part) = xml::load(&area, FOOTNOTES_PART)? else {
        warn!(
            "{} has no {}; output is an unchanged copy",
            input.display(),
            FOOTNOTES_PART
        );
        release(area);
        return Ok(None);
    };

    let stats =
        FootnoteNormalizer::new(policy, &part.namespaces).normalize(&mut part.document.root);
    write_back(&part.document, &area, output)?;
    release(area);
    Ok(Some(stats))
}

/// Save the footnote part, pack the working area and overwrite `output`
fn write_back(document: &XmlDocument, area: &WorkingArea, output: &Path) -> Result<()> {
    xml::save(document, area, FOOTNOTES_PART)?;
    let bytes = area.pack()?;
    fs::write(output, &bytes).map_err(|e| Error::archive_write(output, e))
}

/// Run `stage` over `output`, removing the file unless the stage succeeds
fn guarded<T>(output: &Path, stage: impl FnOnce() -> Result<T>) -> Result<T> {
    let guard = OutputGuard::new(output);
    let value = stage()?;
    guard.commit();
    Ok(value)
}

fn release(area: WorkingArea) {
    let path = area.path().to_path_buf();
    if let Err(e) = area.close() {
        warn!("could not remove working area {}: {}", path.display(), e);
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Deletes the output file on drop unless the run completed
struct OutputGuard<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> OutputGuard<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn commit(mut self) {
        self.armed = false;
    }
}

impl Drop for OutputGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!("removing incomplete output {}", self.path.display());
            let _ = fs::remove_file(self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::{DosDateTime, ZipWriter};
    use chrono::NaiveDate;

    fn write_footnotes_package(path: &Path) {
        let mut writer = ZipWriter::new();
        writer
            .add_file("[Content_Types].xml", b"<Types/>", DosDateTime::EPOCH)
            .unwrap();
        writer
            .add_file(
                FOOTNOTES_PART,
                format!("<w:footnotes xmlns:w=\"{}\"/>", xml::WORDML_NS).as_bytes(),
                DosDateTime::EPOCH,
            )
            .unwrap();
        fs::write(path, writer.finish().unwrap()).unwrap();
    }

    #[test]
    fn test_default_output_path() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        assert_eq!(
            default_output_path(Path::new("/papers/thesis.docx"), at),
            PathBuf::from("/papers/thesis_fixed_20240506_0708.docx")
        );
        assert_eq!(
            default_output_path(Path::new("draft.v2.docx"), at),
            PathBuf::from("draft.v2_fixed_20240506_0708.docx")
        );
    }

    #[test]
    fn test_missing_input_is_a_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("out.docx");
        let err = normalize(&tmp.path().join("absent.docx"), Some(output.as_path())).unwrap_err();
        assert!(matches!(err, Error::ArchiveRead { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_refuses_to_overwrite_input() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.docx");
        fs::write(&input, b"data").unwrap();
        let err = normalize(&input, Some(input.as_path())).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(fs::read(&input).unwrap(), b"data");
    }

    #[test]
    fn test_failed_stage_removes_output() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("out.docx");
        fs::write(&output, b"partial").unwrap();

        let result: Result<()> =
            guarded(&output, || Err(Error::archive_write(&output, "disk full")));
        assert!(result.is_err());
        assert!(!output.exists());

        fs::write(&output, b"complete").unwrap();
        guarded(&output, || Ok(())).unwrap();
        assert_eq!(fs::read(&output).unwrap(), b"complete");
    }

    #[test]
    fn test_save_failure_is_a_write_error_and_removes_output() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("out.docx");
        write_footnotes_package(&output);

        let err = guarded(&output, || {
            let area = WorkingArea::unpack(&output)?;
            let part = xml::load(&area, FOOTNOTES_PART)?.unwrap();
            // A directory in place of the part cannot be overwritten
            let part_path = area.part_path(FOOTNOTES_PART);
            fs::remove_file(&part_path).unwrap();
            fs::create_dir(&part_path).unwrap();
            write_back(&part.document, &area, &output)
        })
        .unwrap_err();

        match err {
            Error::ArchiveWrite { path, .. } => assert!(path.ends_with("footnotes.xml")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_unpack_errors_name_the_input() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.docx");
        let output = tmp.path().join("out.docx");
        fs::write(&input, b"not a zip").unwrap();
        fs::copy(&input, &output).unwrap();

        match normalize_copy(&input, &output, &StylePolicy::default()).unwrap_err() {
            Error::ArchiveRead { path, .. } => assert_eq!(path, input),
            other => panic!("unexpected error: {other}"),
        }
    }
}
