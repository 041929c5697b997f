//! Password and encryption behavior: round-trips with a password, distinct
//! wrong-password and missing-password failures, and rejection of passwords
//! on formats without support.

use std::fs;
use std::path::PathBuf;

use multiarc::orchestrator;
use multiarc::request::{
    CompressOptions, CompressRequest, DecompressOptions, DecompressRequest,
};
use multiarc::{CancelToken, ErrorKind};
use tempfile::tempdir;

fn compress_with_password(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    format: &str,
    password: Option<&str>,
) -> Result<multiarc::Outcome, multiarc::EngineError> {
    let req = CompressRequest {
        inputs,
        output,
        options: CompressOptions {
            format: format.into(),
            level: None,
            password: password.map(String::from),
        },
    };
    orchestrator::compress(&req, &CancelToken::new())
}

fn decompress_with_password(
    input: PathBuf,
    output_dir: PathBuf,
    password: Option<&str>,
) -> Result<multiarc::Outcome, multiarc::EngineError> {
    let req = DecompressRequest {
        inputs: vec![input],
        output_dir,
        format: None,
        options: DecompressOptions {
            password: password.map(String::from),
        },
    };
    let mut batch = orchestrator::decompress(&req, &CancelToken::new())?;
    batch.reports.remove(0).result
}

fn setup() -> (tempfile::TempDir, PathBuf) {
    let work = tempdir().unwrap();
    let input = work.path().join("secret.txt");
    fs::write(&input, "confidential payload\n".repeat(100)).unwrap();
    (work, input)
}

#[test]
fn zip_password_roundtrip() {
    let (work, input) = setup();
    let archive = work.path().join("vault.zip");
    compress_with_password(vec![input.clone()], archive.clone(), "zip", Some("hunter2"))
        .unwrap();

    let out = work.path().join("out");
    decompress_with_password(archive, out.clone(), Some("hunter2")).unwrap();
    assert_eq!(
        fs::read(out.join("secret.txt")).unwrap(),
        fs::read(&input).unwrap()
    );
}

#[test]
fn sevenz_password_roundtrip() {
    let (work, input) = setup();
    let archive = work.path().join("vault.7z");
    compress_with_password(vec![input.clone()], archive.clone(), "7z", Some("hunter2"))
        .unwrap();

    let out = work.path().join("out");
    decompress_with_password(archive, out.clone(), Some("hunter2")).unwrap();
    assert_eq!(
        fs::read(out.join("secret.txt")).unwrap(),
        fs::read(&input).unwrap()
    );
}

#[test]
fn zip_wrong_password_extracts_nothing() {
    let (work, input) = setup();
    let archive = work.path().join("vault.zip");
    compress_with_password(vec![input], archive.clone(), "zip", Some("hunter2")).unwrap();

    let out = work.path().join("out");
    let err = decompress_with_password(archive, out.clone(), Some("wrong")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPassword);
    let extracted: Vec<_> = fs::read_dir(&out).unwrap().collect();
    assert!(extracted.is_empty(), "no entries may survive a bad password");
}

#[test]
fn zip_missing_password_is_reported_distinctly() {
    let (work, input) = setup();
    let archive = work.path().join("vault.zip");
    compress_with_password(vec![input], archive.clone(), "zip", Some("hunter2")).unwrap();

    let out = work.path().join("out");
    let err = decompress_with_password(archive, out.clone(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PasswordRequired);
    let extracted: Vec<_> = fs::read_dir(&out).unwrap().collect();
    assert!(extracted.is_empty());
}

#[test]
fn sevenz_wrong_password_extracts_nothing() {
    let (work, input) = setup();
    let archive = work.path().join("vault.7z");
    compress_with_password(vec![input], archive.clone(), "7z", Some("hunter2")).unwrap();

    let out = work.path().join("out");
    let err = decompress_with_password(archive, out.clone(), Some("wrong")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPassword);
    let extracted: Vec<_> = fs::read_dir(&out).unwrap().collect();
    assert!(extracted.is_empty(), "no entries may survive a bad password");
}

#[test]
fn sevenz_missing_password_is_reported_distinctly() {
    let (work, input) = setup();
    let archive = work.path().join("vault.7z");
    compress_with_password(vec![input], archive.clone(), "7z", Some("hunter2")).unwrap();

    let out = work.path().join("out");
    let err = decompress_with_password(archive, out.clone(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PasswordRequired);
    let extracted: Vec<_> = fs::read_dir(&out).unwrap().collect();
    assert!(extracted.is_empty());
}

#[test]
fn password_on_level_only_format_fails_before_io() {
    let (work, input) = setup();
    let archive = work.path().join("out.tar.gz");
    let err = compress_with_password(vec![input], archive.clone(), "tar.gz", Some("pw"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOption);
    assert!(!archive.exists());
}

#[test]
fn empty_password_is_rejected() {
    let (work, input) = setup();
    let archive = work.path().join("vault.zip");
    let err =
        compress_with_password(vec![input], archive, "zip", Some("")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOption);
}
