//! ZIP archive writer.
//!
//! Builds a complete archive in memory: every entry is written as a Local
//! File Header plus data, followed by the Central Directory and the EOCD.
//! Only the classic (non-ZIP64) layout is produced; archives that would need
//! ZIP64 are refused.

use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::collections::HashSet;
use std::io::Write;

use anyhow::{Context, Result, bail};

use super::structures::{CompressionMethod, DosDateTime, EndOfCentralDirectory, EntryHeader};

/// In-memory ZIP archive builder
#[derive(Default)]
pub struct ZipWriter {
    buf: Vec<u8>,
    central: Vec<(EntryHeader, u32)>,
    names: HashSet<Vec<u8>>,
}

impl ZipWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a DEFLATE-compressed file entry
    pub fn add_file(&mut self, name: &str, data: &[u8], modified: DosDateTime) -> Result<()> {
        self.add_entry(name, data, CompressionMethod::Deflate, modified)
    }

    /// Add a directory entry; a trailing `/` is appended when missing
    pub fn add_directory(&mut self, name: &str, modified: DosDateTime) -> Result<()> {
        let name = if name.ends_with('/') {
            name.to_string()
        } else {
            format!("{name}/")
        };
        self.add_entry(&name, &[], CompressionMethod::Stored, modified)
    }

    /// Add an entry with an explicit compression method
    pub fn add_entry(
        &mut self,
        name: &str,
        data: &[u8],
        method: CompressionMethod,
        modified: DosDateTime,
    ) -> Result<()> {
        self.add_raw_entry(name.as_bytes(), data, method, modified)
    }

    /// Add an entry whose name is written byte for byte, as read from
    /// another archive's Central Directory
    pub fn add_raw_entry(
        &mut self,
        raw_name: &[u8],
        data: &[u8],
        method: CompressionMethod,
        modified: DosDateTime,
    ) -> Result<()> {
        let name = String::from_utf8_lossy(raw_name);
        if !self.names.insert(raw_name.to_vec()) {
            bail!("Duplicate entry name: {}", name);
        }

        let payload = match method {
            CompressionMethod::Stored => data.to_vec(),
            CompressionMethod::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()?
            }
            CompressionMethod::Unknown(m) => bail!("Cannot write compression method {}", m),
        };

        let header = EntryHeader {
            file_name: raw_name.to_vec(),
            compression_method: method,
            modified,
            crc32: crc32fast::hash(data),
            compressed_size: to_u32(payload.len() as u64, &name)?,
            uncompressed_size: to_u32(data.len() as u64, &name)?,
        };
        let offset = to_u32(self.buf.len() as u64, &name)?;

        header.write_local(&mut self.buf)?;
        self.buf.extend_from_slice(&payload);
        self.central.push((header, offset));

        Ok(())
    }

    /// Number of entries added so far
    pub fn len(&self) -> usize {
        self.central.len()
    }

    pub fn is_empty(&self) -> bool {
        self.central.is_empty()
    }

    /// Write the Central Directory and EOCD, returning the archive bytes
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let total_entries = u16::try_from(self.central.len())
            .ok()
            .filter(|n| *n != 0xFFFF)
            .context("Too many entries for a non-ZIP64 archive")?;

        let cd_offset = to_u32(self.buf.len() as u64, "central directory")?;
        for (header, lfh_offset) in &self.central {
            header.write_central(&mut self.buf, *lfh_offset)?;
        }
        let cd_size = to_u32(self.buf.len() as u64 - cd_offset as u64, "central directory")?;

        EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: total_entries,
            total_entries,
            cd_size,
            cd_offset,
            comment_len: 0,
        }
        .write_to(&mut self.buf)?;

        Ok(self.buf)
    }
}

fn to_u32(value: u64, what: &str) -> Result<u32> {
    match u32::try_from(value) {
        Ok(v) if v != u32::MAX => Ok(v),
        _ => bail!("{} exceeds the 4 GiB limit of non-ZIP64 archives", what),
    }
}
