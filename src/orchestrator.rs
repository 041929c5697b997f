//! # Archive orchestrator
//!
//! Resolves validated requests to codec drivers and manages the surrounding
//! flow: validation before any I/O, partial-output cleanup on failure or
//! cancellation, and sequential multi-archive decompression with per-archive
//! result aggregation.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::codecs::{self, Codec};
use crate::error::EngineError;
use crate::formats::{self, FormatDescriptor};
use crate::request::{
    ArchiveReport, BatchOutcome, CompressRequest, DecompressRequest, Outcome,
};

/// Runs one compression request to completion.
///
/// All validation happens before any byte is written; a failure or a cancel
/// mid-stream removes the partially written archive, so no truncated output
/// is ever left behind.
pub fn compress(req: &CompressRequest, cancel: &CancelToken) -> Result<Outcome, EngineError> {
    if req.inputs.is_empty() {
        return Err(EngineError::InvalidOption("no input paths provided".into()));
    }
    if req.output.as_os_str().is_empty() {
        return Err(EngineError::InvalidOption("no output path provided".into()));
    }
    for input in &req.inputs {
        check_exists(input)?;
    }

    let desc = formats::get_format(&req.options.format)?;
    if !desc.can_compress {
        return Err(EngineError::UnsupportedFormat(format!(
            "format '{}' does not support compression",
            desc.id
        )));
    }
    if let Some(level) = req.options.level {
        desc.validate_level(level)?;
    }
    let password = validate_password(desc, req.options.password.as_deref())?;
    let level = req.options.level.or(desc.default_level);

    if let Some(parent) = req.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| EngineError::io(e, parent))?;
    }

    let plan = codecs::plan_inputs(&req.inputs)?;
    info!(
        format = desc.id,
        files = plan.file_count(),
        total_bytes = plan.total_bytes,
        output = %req.output.display(),
        "compressing"
    );

    // From here on a partial file can exist; arm the cleanup guard and defuse
    // it only on success.
    let codec = Codec::for_format(desc);
    let guard = scopeguard::guard(req.output.clone(), |path| {
        if fs::remove_file(&path).is_ok() {
            warn!(path = %path.display(), "removed partial archive after failure");
        }
    });
    let outcome = codec.compress(&plan, &req.output, level, password, cancel)?;
    scopeguard::ScopeGuard::into_inner(guard);

    debug!(entries = outcome.entries_written, "compression finished");
    Ok(outcome)
}

/// Runs one decompression request, iterating input archives sequentially.
///
/// A failure on one archive never aborts its siblings; per-archive results
/// are aggregated in input order. Each archive extracts into a staging
/// directory inside the target and is committed only on success, so corrupt
/// input or a wrong password leaves no files behind.
pub fn decompress(
    req: &DecompressRequest,
    cancel: &CancelToken,
) -> Result<BatchOutcome, EngineError> {
    if req.inputs.is_empty() {
        return Err(EngineError::InvalidOption(
            "no input archives provided".into(),
        ));
    }
    if req.output_dir.as_os_str().is_empty() {
        return Err(EngineError::InvalidOption("no output path provided".into()));
    }
    for input in &req.inputs {
        check_exists(input)?;
    }
    fs::create_dir_all(&req.output_dir).map_err(|e| EngineError::io(e, &req.output_dir))?;

    let mut batch = BatchOutcome::default();
    let mut cancelled = false;
    for input in &req.inputs {
        let result = if cancelled {
            Err(EngineError::Cancelled)
        } else {
            decompress_one(input, req, cancel)
        };
        if matches!(result, Err(EngineError::Cancelled)) {
            cancelled = true;
        }
        if let Err(e) = &result {
            warn!(archive = %input.display(), error = %e, "archive failed");
        }
        batch.reports.push(ArchiveReport {
            archive: input.clone(),
            result,
        });
    }
    Ok(batch)
}

fn decompress_one(
    input: &Path,
    req: &DecompressRequest,
    cancel: &CancelToken,
) -> Result<Outcome, EngineError> {
    let desc = formats::resolve_format(input, req.format.as_deref())?;
    if !desc.can_decompress {
        return Err(EngineError::UnsupportedFormat(format!(
            "format '{}' does not support decompression",
            desc.id
        )));
    }
    let password = validate_password(desc, req.options.password.as_deref())?;

    info!(archive = %input.display(), format = desc.id, "extracting");

    // Staging lives inside the target directory so the final commit is a
    // same-filesystem rename.
    let staging = tempfile::Builder::new()
        .prefix(".multiarc-staging-")
        .tempdir_in(&req.output_dir)
        .map_err(|e| EngineError::io(e, &req.output_dir))?;

    let codec = Codec::for_format(desc);
    let outcome = codec.decompress(input, staging.path(), password, cancel)?;

    merge_move(staging.path(), &req.output_dir)?;
    Ok(outcome)
}

fn validate_password<'a>(
    desc: &FormatDescriptor,
    password: Option<&'a str>,
) -> Result<Option<&'a str>, EngineError> {
    match password {
        None => Ok(None),
        Some("") => Err(EngineError::InvalidOption("password is empty".into())),
        Some(_) if !desc.supports_password => Err(EngineError::InvalidOption(format!(
            "format '{}' does not support passwords",
            desc.id
        ))),
        Some(pw) => Ok(Some(pw)),
    }
}

fn check_exists(path: &Path) -> Result<(), EngineError> {
    match fs::metadata(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(EngineError::NotFound(path.display().to_string()))
        }
        Err(e) => Err(EngineError::io(e, path)),
    }
}

/// Moves every child of `src` into `dst`, merging directories and replacing
/// files on collision (the usual extractor overwrite behavior).
fn merge_move(src: &Path, dst: &Path) -> Result<(), EngineError> {
    for entry in fs::read_dir(src).map_err(|e| EngineError::io(e, src))? {
        let entry = entry.map_err(|e| EngineError::io(e, src))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        move_entry(&from, &to)?;
    }
    Ok(())
}

fn move_entry(from: &Path, to: &Path) -> Result<(), EngineError> {
    if to.exists() {
        if from.is_dir() && to.is_dir() {
            merge_move(from, to)?;
            let _ = fs::remove_dir(from);
            return Ok(());
        }
        if to.is_dir() {
            fs::remove_dir_all(to).map_err(|e| EngineError::io(e, to))?;
        } else {
            fs::remove_file(to).map_err(|e| EngineError::io(e, to))?;
        }
    }
    fs::rename(from, to).map_err(|e| EngineError::io(e, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{CompressOptions, DecompressOptions};
    use std::fs::File;
    use std::io::Write as _;
    use std::path::PathBuf;

    fn compress_req(inputs: Vec<PathBuf>, output: PathBuf, format: &str) -> CompressRequest {
        CompressRequest {
            inputs,
            output,
            options: CompressOptions {
                format: format.into(),
                level: None,
                password: None,
            },
        }
    }

    #[test]
    fn empty_inputs_fail_before_io() {
        let err = compress(
            &compress_req(vec![], PathBuf::from("/tmp/zzz/out.zip"), "zip"),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidOption(_)));
        assert!(!Path::new("/tmp/zzz").exists());
    }

    #[test]
    fn missing_input_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = compress(
            &compress_req(
                vec![dir.path().join("ghost.txt")],
                dir.path().join("out.zip"),
                "zip",
            ),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert!(!dir.path().join("out.zip").exists());
    }

    #[test]
    fn level_out_of_bounds_is_rejected_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.txt");
        File::create(&input).unwrap().write_all(b"hi").unwrap();
        let mut req = compress_req(vec![input], dir.path().join("out.zip"), "zip");
        req.options.level = Some(99);
        let err = compress(&req, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidOption(_)));
        assert!(!dir.path().join("out.zip").exists());
    }

    #[test]
    fn password_on_plain_tar_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.txt");
        File::create(&input).unwrap().write_all(b"hi").unwrap();
        let mut req = compress_req(vec![input], dir.path().join("out.tar"), "tar");
        req.options.password = Some("secret".into());
        let err = compress(&req, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidOption(_)));
        assert!(!dir.path().join("out.tar").exists());
    }

    #[test]
    fn rar_compression_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.txt");
        File::create(&input).unwrap().write_all(b"hi").unwrap();
        let err = compress(
            &compress_req(vec![input], dir.path().join("out.rar"), "rar"),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat(_)));
    }

    #[test]
    fn decompress_unknown_extension_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("mystery.bin");
        File::create(&input).unwrap().write_all(b"not an archive").unwrap();
        let req = DecompressRequest {
            inputs: vec![input.clone()],
            output_dir: dir.path().join("out"),
            format: None,
            options: DecompressOptions::default(),
        };
        let batch = decompress(&req, &CancelToken::new()).unwrap();
        assert!(matches!(
            batch.reports[0].result,
            Err(EngineError::UnsupportedFormat(_))
        ));
        // Nothing extracted, staging cleaned up.
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("out"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }
}
