//! Integration tests for the footfix binary.

mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_footfix"))
}

#[test]
fn test_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Normalize footnote formatting"));
}

#[test]
fn test_input_argument_required() {
    cli().assert().failure();
}

#[test]
fn test_fixes_document_and_reports() {
    let dir = TempDir::new().unwrap();
    let input = write_docx(dir.path(), "paper.docx", Some(&footnotes_xml()));
    let output = dir.path().join("fixed.docx");

    cli()
        .arg(&input)
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 3 footnotes"))
        .stdout(predicate::str::contains("宋体"))
        .stdout(predicate::str::contains("fixed.docx"));

    assert!(output.exists());
}

#[test]
fn test_quiet_prints_nothing() {
    let dir = TempDir::new().unwrap();
    let input = write_docx(dir.path(), "paper.docx", Some(&footnotes_xml()));

    cli()
        .arg("-q")
        .arg(&input)
        .arg(dir.path().join("fixed.docx"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_missing_footnotes_warns_and_succeeds() {
    let dir = TempDir::new().unwrap();
    let input = write_docx(dir.path(), "plain.docx", None);
    let output = dir.path().join("plain_fixed.docx");

    cli()
        .env_remove("RUST_LOG")
        .arg(&input)
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("No footnotes found"))
        .stderr(predicate::str::contains("has no word/footnotes.xml"));

    assert_eq!(fs::read(&input).unwrap(), fs::read(&output).unwrap());
}

#[test]
fn test_corrupt_archive_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("corrupt.docx");
    fs::write(&input, b"PK\x03\x04 this is not really a zip").unwrap();
    let output = dir.path().join("corrupt_fixed.docx");

    cli()
        .arg(&input)
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read archive"));

    assert!(!output.exists());
}
