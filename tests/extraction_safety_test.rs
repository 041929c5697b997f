//! Extraction containment: archive entries must never write outside the
//! requested output directory, whatever their recorded names claim.

use std::fs;

use multiarc::orchestrator;
use multiarc::request::{DecompressOptions, DecompressRequest};
use multiarc::{CancelToken, ErrorKind};
use sevenz_rust::{SevenZArchiveEntry, SevenZWriter};
use tempfile::tempdir;

#[test]
fn sevenz_entry_climbing_out_is_rejected() {
    let work = tempdir().unwrap();
    let archive = work.path().join("evil.7z");

    let mut writer = SevenZWriter::create(&archive).unwrap();
    let mut entry = SevenZArchiveEntry::default();
    entry.name = "../../escaped.txt".to_string();
    entry.has_stream = true;
    writer
        .push_archive_entry(entry, Some(&b"pwned"[..]))
        .unwrap();
    writer.finish().unwrap();

    // Nested target so a successful escape would still land inside the
    // tempdir, where we can observe it.
    let out = work.path().join("deep").join("out");
    let req = DecompressRequest {
        inputs: vec![archive],
        output_dir: out.clone(),
        format: None,
        options: DecompressOptions::default(),
    };
    let batch = orchestrator::decompress(&req, &CancelToken::new()).unwrap();

    assert_eq!(
        batch.reports[0].result.as_ref().unwrap_err().kind(),
        ErrorKind::CorruptArchive
    );
    assert!(!work.path().join("escaped.txt").exists());
    assert!(!work.path().join("deep").join("escaped.txt").exists());
    let leftovers: Vec<_> = fs::read_dir(&out).unwrap().collect();
    assert!(leftovers.is_empty(), "escape attempt must extract nothing");
}

#[test]
fn sevenz_absolute_entry_name_is_rejected() {
    let work = tempdir().unwrap();
    let archive = work.path().join("abs.7z");

    let mut writer = SevenZWriter::create(&archive).unwrap();
    let mut entry = SevenZArchiveEntry::default();
    entry.name = "/tmp/multiarc-absolute-escape.txt".to_string();
    entry.has_stream = true;
    writer
        .push_archive_entry(entry, Some(&b"pwned"[..]))
        .unwrap();
    writer.finish().unwrap();

    let out = work.path().join("out");
    let req = DecompressRequest {
        inputs: vec![archive],
        output_dir: out.clone(),
        format: None,
        options: DecompressOptions::default(),
    };
    let batch = orchestrator::decompress(&req, &CancelToken::new()).unwrap();

    assert_eq!(
        batch.reports[0].result.as_ref().unwrap_err().kind(),
        ErrorKind::CorruptArchive
    );
    assert!(!std::path::Path::new("/tmp/multiarc-absolute-escape.txt").exists());
}
