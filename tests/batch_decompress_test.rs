//! Multi-archive decompression: sequential processing, per-archive result
//! aggregation in input order, and corrupt archives leaving no output.

use std::fs;
use std::path::{Path, PathBuf};

use multiarc::orchestrator;
use multiarc::request::{
    CompressOptions, CompressRequest, DecompressOptions, DecompressRequest,
};
use multiarc::{CancelToken, ErrorKind};
use tempfile::tempdir;

fn make_zip(dir: &Path, name: &str, file_name: &str, content: &str) -> PathBuf {
    let input = dir.join(file_name);
    fs::write(&input, content).unwrap();
    let archive = dir.join(name);
    let req = CompressRequest {
        inputs: vec![input],
        output: archive.clone(),
        options: CompressOptions {
            format: "zip".into(),
            level: None,
            password: None,
        },
    };
    orchestrator::compress(&req, &CancelToken::new()).unwrap();
    archive
}

#[test]
fn corrupt_middle_archive_does_not_abort_siblings() {
    let work = tempdir().unwrap();
    let first = make_zip(work.path(), "one.zip", "one.txt", "first archive");
    let third = make_zip(work.path(), "three.zip", "three.txt", "third archive");

    let corrupt = work.path().join("two.zip");
    fs::write(&corrupt, b"PK\x03\x04 this is not a real zip file").unwrap();

    let out = work.path().join("out");
    let req = DecompressRequest {
        inputs: vec![first, corrupt, third],
        output_dir: out.clone(),
        format: None,
        options: DecompressOptions::default(),
    };
    let batch = orchestrator::decompress(&req, &CancelToken::new()).unwrap();

    assert_eq!(batch.reports.len(), 3);
    assert!(batch.reports[0].result.is_ok());
    assert_eq!(
        batch.reports[1].result.as_ref().unwrap_err().kind(),
        ErrorKind::CorruptArchive
    );
    assert!(batch.reports[2].result.is_ok());
    assert!(!batch.all_succeeded());
    assert_eq!(batch.overall(), Err(ErrorKind::CorruptArchive));

    // Both healthy archives landed; the corrupt one contributed nothing.
    assert_eq!(fs::read(out.join("one.txt")).unwrap(), b"first archive");
    assert_eq!(fs::read(out.join("three.txt")).unwrap(), b"third archive");
}

#[test]
fn truncated_zip_fails_with_corrupt_archive_and_no_output() {
    let work = tempdir().unwrap();
    let archive = make_zip(work.path(), "whole.zip", "data.txt", &"x".repeat(4096));

    // Chop off the central directory.
    let bytes = fs::read(&archive).unwrap();
    let truncated = work.path().join("truncated.zip");
    fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();

    let out = work.path().join("out");
    let req = DecompressRequest {
        inputs: vec![truncated],
        output_dir: out.clone(),
        format: None,
        options: DecompressOptions::default(),
    };
    let batch = orchestrator::decompress(&req, &CancelToken::new()).unwrap();
    assert_eq!(
        batch.reports[0].result.as_ref().unwrap_err().kind(),
        ErrorKind::CorruptArchive
    );
    let leftovers: Vec<_> = fs::read_dir(&out).unwrap().collect();
    assert!(leftovers.is_empty(), "corrupt input must write nothing");
}

#[test]
fn corrupt_gzip_stream_is_detected() {
    let work = tempdir().unwrap();
    let garbage = work.path().join("broken.gz");
    // Valid gzip magic, garbage body.
    let mut bytes = vec![0x1F, 0x8B, 0x08, 0x00];
    bytes.extend_from_slice(&[0xAA; 64]);
    fs::write(&garbage, &bytes).unwrap();

    let out = work.path().join("out");
    let req = DecompressRequest {
        inputs: vec![garbage],
        output_dir: out.clone(),
        format: None,
        options: DecompressOptions::default(),
    };
    let batch = orchestrator::decompress(&req, &CancelToken::new()).unwrap();
    assert_eq!(
        batch.reports[0].result.as_ref().unwrap_err().kind(),
        ErrorKind::CorruptArchive
    );
    let leftovers: Vec<_> = fs::read_dir(&out).unwrap().collect();
    assert!(leftovers.is_empty());
}

#[test]
fn reports_keep_input_order() {
    let work = tempdir().unwrap();
    let a = make_zip(work.path(), "a.zip", "a.txt", "a");
    let b = make_zip(work.path(), "b.zip", "b.txt", "b");
    let req = DecompressRequest {
        inputs: vec![b.clone(), a.clone()],
        output_dir: work.path().join("out"),
        format: None,
        options: DecompressOptions::default(),
    };
    let batch = orchestrator::decompress(&req, &CancelToken::new()).unwrap();
    assert_eq!(batch.reports[0].archive, b);
    assert_eq!(batch.reports[1].archive, a);
}
