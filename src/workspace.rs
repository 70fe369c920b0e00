//! Scoped working area for one processing pass.
//!
//! A [`WorkingArea`] is a uniquely named temporary directory holding the
//! unpacked entries of one archive, together with the manifest needed to
//! pack it back in the original entry order. The directory is removed when
//! the value is dropped, whatever the exit path.

use log::{debug, trace};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::io::LocalFileReader;
use crate::zip::{CompressionMethod, DosDateTime, ZipExtractor, ZipWriter, sanitize_entry_name};

/// One archive entry as recorded at unpack time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Entry name as listed in the archive
    pub name: String,
    /// Stored name bytes, written back unchanged when packing
    pub raw_name: Vec<u8>,
    /// Location below the working-area root
    pub path: PathBuf,
    pub is_directory: bool,
    pub modified: DosDateTime,
}

/// Unpacked archive owned by a single processing pass
#[derive(Debug)]
pub struct WorkingArea {
    dir: TempDir,
    manifest: Vec<ManifestEntry>,
}

impl WorkingArea {
    /// Extract every entry of `archive` into a fresh temporary directory.
    ///
    /// Fails with [`Error::ArchiveRead`] when the file is unreadable, is not
    /// a ZIP container, holds a corrupt or unsafe entry, or repeats an entry
    /// name.
    pub fn unpack(archive: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("footfix-")
            .tempdir()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;
        debug!("unpacking {} into {}", archive.display(), dir.path().display());

        let reader = LocalFileReader::new(archive).map_err(|e| Error::archive_read(archive, e))?;
        let extractor = ZipExtractor::new(&reader);
        let entries = extractor
            .list_files()
            .map_err(|e| Error::archive_read(archive, e))?;

        let mut seen = HashSet::new();
        let mut manifest = Vec::with_capacity(entries.len());

        for entry in &entries {
            let relative =
                sanitize_entry_name(&entry.file_name).map_err(|e| Error::archive_read(archive, e))?;
            if !seen.insert(relative.clone()) {
                return Err(Error::archive_read(
                    archive,
                    format!("duplicate entry {}", entry.file_name),
                ));
            }

            let (year, month, day) = entry.mod_date();
            let (hour, minute, second) = entry.mod_time();
            trace!(
                "extracting {} ({year}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02})",
                entry.file_name
            );
            extractor
                .extract_to_dir(entry, dir.path())
                .map_err(|e| Error::archive_read(archive, e))?;

            manifest.push(ManifestEntry {
                name: entry.file_name.clone(),
                raw_name: entry.raw_name.clone(),
                path: relative,
                is_directory: entry.is_directory,
                modified: DosDateTime {
                    time: entry.last_mod_time,
                    date: entry.last_mod_date,
                },
            });
        }

        debug!("unpacked {} entries", manifest.len());
        Ok(Self { dir, manifest })
    }

    /// Root of the working area
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Entries in original archive order
    pub fn manifest(&self) -> &[ManifestEntry] {
        &self.manifest
    }

    /// File system location of a part such as `word/footnotes.xml`
    pub fn part_path(&self, part: &str) -> PathBuf {
        part.split('/')
            .fold(self.dir.path().to_path_buf(), |path, segment| path.join(segment))
    }

    /// Serialize the working area into a DEFLATE-compressed archive.
    ///
    /// Manifest entries still on disk come first, in their original order,
    /// under their original names and with their original timestamps; files
    /// added since unpacking follow in name order. Fails with
    /// [`Error::ArchiveWrite`].
    pub fn pack(&self) -> Result<Vec<u8>> {
        let root = self.dir.path();
        let write_err = |e: anyhow::Error| Error::archive_write(root, e);

        let mut on_disk = Vec::new();
        walk(root, root, &mut on_disk).map_err(|e| Error::archive_write(root, e))?;

        let mut writer = ZipWriter::new();
        let mut packed = HashSet::new();

        for entry in &self.manifest {
            let path = root.join(&entry.path);
            if entry.is_directory {
                if path.is_dir() {
                    writer
                        .add_raw_entry(
                            &entry.raw_name,
                            &[],
                            CompressionMethod::Stored,
                            entry.modified,
                        )
                        .map_err(write_err)?;
                }
                continue;
            }
            if !path.is_file() {
                debug!("{} no longer in working area, skipped", entry.name);
                continue;
            }
            let data = fs::read(&path)
                .map_err(|e| Error::archive_write(root, format!("{}: {e}", entry.name)))?;
            writer
                .add_raw_entry(
                    &entry.raw_name,
                    &data,
                    CompressionMethod::Deflate,
                    entry.modified,
                )
                .map_err(write_err)?;
            packed.insert(entry.path.as_path());
        }

        let mut extra: Vec<(String, &PathBuf)> = on_disk
            .iter()
            .filter(|relative| !packed.contains(relative.as_path()))
            .map(|relative| (entry_name(relative), relative))
            .collect();
        extra.sort();

        let now = DosDateTime::now();
        for (name, relative) in extra {
            trace!("packing new file {}", name);
            let data = fs::read(root.join(relative))
                .map_err(|e| Error::archive_write(root, format!("{name}: {e}")))?;
            writer.add_file(&name, &data, now).map_err(write_err)?;
        }

        debug!("packed {} entries", writer.len());
        writer.finish().map_err(write_err)
    }

    /// Remove the working area now, reporting cleanup failures.
    ///
    /// Dropping the value removes it as well but ignores errors.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| Error::io(path, e))
    }
}

/// `/`-separated entry name for a file added to the working area
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Collect the paths, relative to `root`, of all regular files below `dir`
fn walk(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(root, &path, files)?;
        } else if file_type.is_file() {
            files.push(path.strip_prefix(root).unwrap_or(&path).to_path_buf());
        }
    }
    Ok(())
}
