use flate2::read::DeflateDecoder;
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Upper bound on buffer space reserved from a declared entry size
const MAX_PREALLOC: u64 = 1 << 20;

/// ZIP file extractor
pub struct ZipExtractor<'a, R: ReadAt + ?Sized> {
    parser: ZipParser<'a, R>,
}

impl<'a, R: ReadAt + ?Sized> ZipExtractor<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all files in the archive
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files()
    }

    /// Extract file data to memory, verifying size and CRC-32
    pub fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.is_encrypted() {
            bail!("{} is encrypted", entry.file_name);
        }

        let data_offset = self.parser.get_data_offset(entry)?;

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser.reader().read_exact_at(data_offset, &mut raw)?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                // The declared size is untrusted: reserve at most MAX_PREALLOC
                // and stop inflating one byte past it.
                let mut out =
                    Vec::with_capacity(entry.uncompressed_size.min(MAX_PREALLOC) as usize);
                DeflateDecoder::new(raw.as_slice())
                    .take(entry.uncompressed_size.saturating_add(1))
                    .read_to_end(&mut out)
                    .with_context(|| format!("{} has corrupt deflate data", entry.file_name))?;
                out
            }
            CompressionMethod::Unknown(method) => {
                bail!(
                    "Unsupported compression method {} for {} (only STORED and DEFLATE are supported)",
                    method,
                    entry.file_name
                );
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "{} inflated to {} bytes, expected {}",
                entry.file_name,
                data.len(),
                entry.uncompressed_size
            );
        }

        let crc = crc32fast::hash(&data);
        if crc != entry.crc32 {
            bail!(
                "CRC mismatch for {} (computed {:08x}, stored {:08x})",
                entry.file_name,
                crc,
                entry.crc32
            );
        }

        Ok(data)
    }

    /// Extract an entry below `root`, creating parent directories.
    ///
    /// Directory entries only create the directory. Returns the path written.
    pub fn extract_to_dir(&self, entry: &ZipFileEntry, root: &Path) -> Result<PathBuf> {
        let output_path = root.join(sanitize_entry_name(&entry.file_name)?);

        if entry.is_directory {
            fs::create_dir_all(&output_path)?;
            return Ok(output_path);
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = self.extract_to_memory(entry)?;
        fs::write(&output_path, &data)
            .with_context(|| format!("cannot write {}", output_path.display()))?;

        Ok(output_path)
    }
}

/// Turn an entry name into a relative path that stays below the extraction root.
///
/// Absolute names, drive prefixes and `..` components are refused.
pub fn sanitize_entry_name(name: &str) -> Result<PathBuf> {
    let normalized = name.replace('\\', "/");
    let mut path = PathBuf::new();

    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                bail!("Unsafe entry name in archive: {}", name);
            }
        }
    }

    if path.as_os_str().is_empty() {
        bail!("Empty entry name in archive: {:?}", name);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_nested_names() {
        assert_eq!(
            sanitize_entry_name("word/_rels/document.xml.rels").unwrap(),
            PathBuf::from("word").join("_rels").join("document.xml.rels")
        );
        assert_eq!(
            sanitize_entry_name("./[Content_Types].xml").unwrap(),
            PathBuf::from("[Content_Types].xml")
        );
    }

    #[test]
    fn test_sanitize_rejects_escapes() {
        assert!(sanitize_entry_name("../evil.xml").is_err());
        assert!(sanitize_entry_name("word/../../evil.xml").is_err());
        assert!(sanitize_entry_name("/etc/passwd").is_err());
        assert!(sanitize_entry_name("..\\evil.xml").is_err());
        assert!(sanitize_entry_name("").is_err());
    }
}
