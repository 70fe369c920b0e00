use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::io::{self, Cursor, Write};

use anyhow::{Result, bail};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// General purpose flag: entry data is encrypted
pub const FLAG_ENCRYPTED: u16 = 0x0001;
/// General purpose flag: file name is UTF-8
pub const FLAG_UTF8: u16 = 0x0800;

/// Version 2.0: deflate and directories
pub const VERSION_NEEDED: u16 = 20;
/// Made by: MS-DOS compatible attributes, APPNOTE version 2.0
pub const VERSION_MADE_BY: u16 = 20;

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            bail!("Invalid End of Central Directory");
        }

        // Verify signature
        if &data[0..4] != Self::SIGNATURE {
            bail!("Invalid End of Central Directory");
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    /// Serialize the record (without comment)
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(Self::SIGNATURE)?;
        out.write_u16::<LittleEndian>(self.disk_number)?;
        out.write_u16::<LittleEndian>(self.disk_with_cd)?;
        out.write_u16::<LittleEndian>(self.disk_entries)?;
        out.write_u16::<LittleEndian>(self.total_entries)?;
        out.write_u32::<LittleEndian>(self.cd_size)?;
        out.write_u32::<LittleEndian>(self.cd_offset)?;
        out.write_u16::<LittleEndian>(self.comment_len)
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }

    /// Multi-disk archives are not supported
    pub fn is_multi_disk(&self) -> bool {
        self.disk_number != 0 || self.disk_with_cd != 0
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            bail!("Invalid ZIP64 format");
        }

        if &data[0..4] != Self::SIGNATURE {
            bail!("Invalid ZIP64 format");
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_with_eocd64: cursor.read_u32::<LittleEndian>()?,
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
            total_disks: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
pub struct Zip64EOCD {
    pub eocd64_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE {
            bail!("Invalid ZIP64 format");
        }

        if &data[0..4] != Self::SIGNATURE {
            bail!("Invalid ZIP64 format");
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            eocd64_size: cursor.read_u64::<LittleEndian>()?,
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            disk_number: cursor.read_u32::<LittleEndian>()?,
            disk_with_cd: cursor.read_u32::<LittleEndian>()?,
            disk_entries: cursor.read_u64::<LittleEndian>()?,
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Parsed ZIP file entry information
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    /// Name decoded for display and path building
    pub file_name: String,
    /// Name exactly as stored in the Central Directory
    pub raw_name: Vec<u8>,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub is_directory: bool,
}

impl ZipFileEntry {
    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }
}

/// MS-DOS packed timestamp as stored in ZIP headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// Earliest representable instant, 1980-01-01 00:00:00
    pub const EPOCH: DosDateTime = DosDateTime {
        time: 0,
        date: (1 << 5) | 1,
    };

    /// Pack a local timestamp; years outside 1980..=2107 clamp to the range ends
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        let year = dt.year();
        if year < 1980 {
            return Self::EPOCH;
        }
        if year > 2107 {
            return Self {
                time: (23 << 11) | (59 << 5) | 29,
                date: (127 << 9) | (12 << 5) | 31,
            };
        }
        let date = (((year - 1980) as u16) << 9) | ((dt.month() as u16) << 5) | dt.day() as u16;
        let time =
            ((dt.hour() as u16) << 11) | ((dt.minute() as u16) << 5) | (dt.second() as u16 / 2);
        Self { time, date }
    }

    pub fn now() -> Self {
        Self::from_naive(chrono::Local::now().naive_local())
    }
}

/// Header fields shared by the local and central records of an entry we write
#[derive(Debug, Clone)]
pub struct EntryHeader {
    pub file_name: Vec<u8>,
    pub compression_method: CompressionMethod,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

impl EntryHeader {
    /// Names that are not valid UTF-8 keep the legacy code page flag
    fn flags(&self) -> u16 {
        if !self.file_name.is_ascii() && std::str::from_utf8(&self.file_name).is_ok() {
            FLAG_UTF8
        } else {
            0
        }
    }

    fn name_len(&self) -> io::Result<u16> {
        u16::try_from(self.file_name.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "entry name too long: {}",
                    String::from_utf8_lossy(&self.file_name)
                ),
            )
        })
    }

    /// Write the Local File Header followed by the file name
    pub fn write_local<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let name_len = self.name_len()?;
        out.write_all(LFH_SIGNATURE)?;
        out.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        out.write_u16::<LittleEndian>(self.flags())?;
        out.write_u16::<LittleEndian>(self.compression_method.as_u16())?;
        out.write_u16::<LittleEndian>(self.modified.time)?;
        out.write_u16::<LittleEndian>(self.modified.date)?;
        out.write_u32::<LittleEndian>(self.crc32)?;
        out.write_u32::<LittleEndian>(self.compressed_size)?;
        out.write_u32::<LittleEndian>(self.uncompressed_size)?;
        out.write_u16::<LittleEndian>(name_len)?;
        out.write_u16::<LittleEndian>(0)?; // extra field length
        out.write_all(&self.file_name)
    }

    /// Write the Central Directory File Header followed by the file name
    pub fn write_central<W: Write>(&self, out: &mut W, lfh_offset: u32) -> io::Result<()> {
        let name_len = self.name_len()?;
        let is_directory = self.file_name.ends_with(b"/");
        out.write_all(CDFH_SIGNATURE)?;
        out.write_u16::<LittleEndian>(VERSION_MADE_BY)?;
        out.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        out.write_u16::<LittleEndian>(self.flags())?;
        out.write_u16::<LittleEndian>(self.compression_method.as_u16())?;
        out.write_u16::<LittleEndian>(self.modified.time)?;
        out.write_u16::<LittleEndian>(self.modified.date)?;
        out.write_u32::<LittleEndian>(self.crc32)?;
        out.write_u32::<LittleEndian>(self.compressed_size)?;
        out.write_u32::<LittleEndian>(self.uncompressed_size)?;
        out.write_u16::<LittleEndian>(name_len)?;
        out.write_u16::<LittleEndian>(0)?; // extra field length
        out.write_u16::<LittleEndian>(0)?; // file comment length
        out.write_u16::<LittleEndian>(0)?; // disk number start
        out.write_u16::<LittleEndian>(0)?; // internal attributes
        // MS-DOS directory attribute
        out.write_u32::<LittleEndian>(if is_directory { 0x10 } else { 0 })?;
        out.write_u32::<LittleEndian>(lfh_offset)?;
        out.write_all(&self.file_name)
    }
}
