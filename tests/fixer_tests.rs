//! End-to-end tests for footnote normalization.

mod common;

use common::*;
use footfix::xml::XmlDocument;
use footfix::{Error, FOOTNOTES_PART, normalize};
use std::fs;

fn elements<'d>(doc: &'d XmlDocument, name: &str) -> Vec<&'d footfix::xml::Element> {
    doc.root
        .descendants()
        .into_iter()
        .filter(|el| el.name == name)
        .collect()
}

#[test]
fn test_italic_red_footnote_scenario() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_docx(tmp.path(), "paper.docx", Some(&footnotes_xml()));
    let output = tmp.path().join("paper_out.docx");

    let outcome = normalize(&input, Some(output.as_path())).unwrap();
    assert_eq!(outcome.output, output);
    let stats = outcome.stats.unwrap();
    assert_eq!(stats.footnotes, 3);
    assert_eq!(stats.paragraphs, 3);
    assert_eq!(stats.runs, 5);

    let xml = read_entry(&output, FOOTNOTES_PART).unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
    let doc = XmlDocument::parse(xml.as_bytes()).unwrap();

    assert!(elements(&doc, "w:i").is_empty());
    for color in elements(&doc, "w:color") {
        assert_eq!(color.attribute("w:val"), Some("000000"));
    }
    for size in elements(&doc, "w:sz") {
        assert_eq!(size.attribute("w:val"), Some("20"));
    }
    let spacings = elements(&doc, "w:spacing");
    assert_eq!(spacings.len(), 3);
    for spacing in spacings {
        assert_eq!(spacing.attribute("w:before"), Some("0"));
        assert_eq!(spacing.attribute("w:after"), Some("0"));
        assert_eq!(spacing.attribute("w:line"), Some("240"));
    }
    // Text and escaping survive
    assert!(xml.contains("<w:t>Smith &amp; Jones, 1999.</w:t>"));
    assert!(xml.contains(&format!("xmlns:w=\"{W_NS}\" xmlns:r=\"{R_NS}\"")));
}

#[test]
fn test_properties_are_first_children() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_docx(tmp.path(), "paper.docx", Some(&footnotes_xml()));
    let output = tmp.path().join("out.docx");
    normalize(&input, Some(output.as_path())).unwrap();

    let xml = read_entry(&output, FOOTNOTES_PART).unwrap();
    let doc = XmlDocument::parse(xml.as_bytes()).unwrap();
    for p in elements(&doc, "w:p") {
        assert_eq!(p.child_elements().next().unwrap().name, "w:pPr");
    }
    for r in elements(&doc, "w:r") {
        assert_eq!(r.child_elements().next().unwrap().name, "w:rPr");
    }
}

#[test]
fn test_other_entries_carried_over_unchanged() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_docx(tmp.path(), "paper.docx", Some(&footnotes_xml()));
    let output = tmp.path().join("out.docx");
    normalize(&input, Some(output.as_path())).unwrap();

    let before = read_entries(&input);
    let after = read_entries(&output);
    let names = |entries: &[(String, Vec<u8>)]| {
        entries.iter().map(|(n, _)| n.clone()).collect::<Vec<_>>()
    };
    assert_eq!(names(&before), names(&after));

    for ((name, old), (_, new)) in before.iter().zip(&after) {
        if name == FOOTNOTES_PART {
            assert_ne!(old, new);
        } else {
            assert_eq!(old, new, "{name} changed");
        }
    }
    // The body keeps its italic run: only footnotes are restyled
    assert!(read_entry(&output, "word/document.xml").unwrap().contains("<w:i/>"));
}

#[test]
fn test_second_run_is_byte_identical() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_docx(tmp.path(), "paper.docx", Some(&footnotes_xml()));
    let once = tmp.path().join("once.docx");
    let twice = tmp.path().join("twice.docx");

    normalize(&input, Some(once.as_path())).unwrap();
    let outcome = normalize(&once, Some(twice.as_path())).unwrap();
    assert_eq!(outcome.stats.unwrap().footnotes, 3);
    assert_eq!(fs::read(&once).unwrap(), fs::read(&twice).unwrap());
}

#[test]
fn test_missing_footnote_part_copies_input() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_docx(tmp.path(), "plain.docx", None);
    let output = tmp.path().join("plain_out.docx");

    let outcome = normalize(&input, Some(output.as_path())).unwrap();
    assert_eq!(outcome.stats, None);
    assert_eq!(fs::read(&input).unwrap(), fs::read(&output).unwrap());
}

#[test]
fn test_truncated_archive_fails_without_output() {
    let tmp = tempfile::tempdir().unwrap();
    let full = build_archive(&package_entries(Some(&footnotes_xml())));
    let input = tmp.path().join("broken.docx");
    fs::write(&input, &full[..full.len() / 2]).unwrap();
    let output = tmp.path().join("broken_out.docx");

    let err = normalize(&input, Some(output.as_path())).unwrap_err();
    assert!(matches!(err, Error::ArchiveRead { .. }), "{err}");
    // The message names the file the user passed, not the output copy
    assert!(err.to_string().contains("broken.docx"), "{err}");
    assert!(!err.to_string().contains("broken_out.docx"), "{err}");
    assert!(!output.exists());
}

#[test]
fn test_oversized_zip64_entry_fails_without_output() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("huge.docx");
    fs::write(
        &input,
        zip64_sized_archive(FOOTNOTES_PART, footnotes_xml().as_bytes(), u64::MAX),
    )
    .unwrap();
    let output = tmp.path().join("huge_out.docx");

    let err = normalize(&input, Some(output.as_path())).unwrap_err();
    match &err {
        Error::ArchiveRead { path, reason } => {
            assert_eq!(path, &input);
            assert!(reason.contains("inflated to"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_malformed_footnotes_fail_without_output() {
    let tmp = tempfile::tempdir().unwrap();
    let bad = format!("<w:footnotes xmlns:w=\"{W_NS}\"><w:footnote w:id=\"1\"><w:p></w:footnote>");
    let input = write_docx(tmp.path(), "bad.docx", Some(&bad));
    let output = tmp.path().join("bad_out.docx");

    let err = normalize(&input, Some(output.as_path())).unwrap_err();
    match err {
        Error::PartParse { part, .. } => assert_eq!(part, FOOTNOTES_PART),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_default_output_name_next_to_input() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_docx(tmp.path(), "thesis.docx", Some(&footnotes_xml()));

    let outcome = normalize(&input, None).unwrap();
    assert_eq!(outcome.output.parent(), Some(tmp.path()));
    let name = outcome.output.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("thesis_fixed_"), "{name}");
    assert!(name.ends_with(".docx"));
    assert!(outcome.output.exists());
}
