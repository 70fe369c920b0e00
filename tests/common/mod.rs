//! Shared fixtures: small but realistic .docx packages built in memory.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::DeflateEncoder;
use footfix::ZipWriter;
use footfix::zip::{
    CompressionMethod, DosDateTime, EndOfCentralDirectory, EntryHeader, ZipExtractor,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// 2024-03-15 10:20:00
pub const STAMP: DosDateTime = DosDateTime {
    time: (10 << 11) | (20 << 5),
    date: (44 << 9) | (3 << 5) | 15,
};

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

pub fn footnotes_xml() -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n",
            "<w:footnotes xmlns:w=\"{w}\" xmlns:r=\"{r}\">",
            "<w:footnote w:type=\"separator\" w:id=\"-1\"><w:p><w:pPr><w:spacing w:after=\"0\" w:line=\"240\" w:lineRule=\"auto\"/></w:pPr><w:r><w:separator/></w:r></w:p></w:footnote>",
            "<w:footnote w:type=\"continuationSeparator\" w:id=\"0\"><w:p><w:r><w:continuationSeparator/></w:r></w:p></w:footnote>",
            "<w:footnote w:id=\"1\"><w:p>",
            "<w:pPr><w:pStyle w:val=\"FootnoteText\"/><w:spacing w:before=\"240\" w:after=\"120\"/></w:pPr>",
            "<w:r><w:rPr><w:rStyle w:val=\"FootnoteReference\"/></w:rPr><w:footnoteRef/></w:r>",
            "<w:r><w:t xml:space=\"preserve\"> </w:t></w:r>",
            "<w:r><w:rPr><w:rFonts w:ascii=\"Arial\" w:hAnsi=\"Arial\"/><w:i/><w:color w:val=\"FF0000\"/><w:sz w:val=\"24\"/></w:rPr><w:t>Smith &amp; Jones, 1999.</w:t></w:r>",
            "</w:p></w:footnote>",
            "</w:footnotes>"
        ),
        w = W_NS,
        r = R_NS
    )
}

pub fn document_xml() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n<w:document xmlns:w=\"{W_NS}\"><w:body><w:p><w:r><w:rPr><w:i/></w:rPr><w:t>Body</w:t></w:r></w:p></w:body></w:document>"
    )
}

/// Entries of a package, footnote part optional
pub fn package_entries(footnotes: Option<&str>) -> Vec<(String, Vec<u8>)> {
    let mut entries = vec![
        (
            "[Content_Types].xml".to_string(),
            b"<?xml version=\"1.0\"?><Types/>".to_vec(),
        ),
        (
            "_rels/.rels".to_string(),
            b"<?xml version=\"1.0\"?><Relationships/>".to_vec(),
        ),
        ("word/document.xml".to_string(), document_xml().into_bytes()),
    ];
    if let Some(xml) = footnotes {
        entries.push(("word/footnotes.xml".to_string(), xml.as_bytes().to_vec()));
    }
    entries.push(("word/media/image1.png".to_string(), PNG.to_vec()));
    entries
}

pub fn build_archive(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new();
    for (name, data) in entries {
        let method = if name.ends_with(".png") {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflate
        };
        writer.add_entry(name, data, method, STAMP).unwrap();
    }
    writer.finish().unwrap()
}

/// A single DEFLATE entry whose central record claims `declared` uncompressed
/// bytes through a ZIP64 extended information field
pub fn zip64_sized_archive(name: &str, data: &[u8], declared: u64) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    let payload = encoder.finish().unwrap();

    let header = EntryHeader {
        file_name: name.as_bytes().to_vec(),
        compression_method: CompressionMethod::Deflate,
        modified: STAMP,
        crc32: crc32fast::hash(data),
        compressed_size: payload.len() as u32,
        uncompressed_size: u32::MAX,
    };
    let mut bytes = Vec::new();
    header.write_local(&mut bytes).unwrap();
    bytes.extend_from_slice(&payload);

    let cd_offset = bytes.len();
    header.write_central(&mut bytes, 0).unwrap();
    bytes[cd_offset + 30..cd_offset + 32].copy_from_slice(&12u16.to_le_bytes());
    bytes.extend_from_slice(&0x0001u16.to_le_bytes());
    bytes.extend_from_slice(&8u16.to_le_bytes());
    bytes.extend_from_slice(&declared.to_le_bytes());

    EndOfCentralDirectory {
        disk_number: 0,
        disk_with_cd: 0,
        disk_entries: 1,
        total_entries: 1,
        cd_size: (bytes.len() - cd_offset) as u32,
        cd_offset: cd_offset as u32,
        comment_len: 0,
    }
    .write_to(&mut bytes)
    .unwrap();
    bytes
}

pub fn write_docx(dir: &Path, name: &str, footnotes: Option<&str>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, build_archive(&package_entries(footnotes))).unwrap();
    path
}

/// All entries of an archive on disk, in archive order
pub fn read_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    let bytes = fs::read(path).unwrap();
    let extractor = ZipExtractor::new(&bytes);
    extractor
        .list_files()
        .unwrap()
        .iter()
        .map(|e| (e.file_name.clone(), extractor.extract_to_memory(e).unwrap()))
        .collect()
}

pub fn read_entry(path: &Path, name: &str) -> Option<String> {
    read_entries(path)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, data)| String::from_utf8(data).unwrap())
}
