//! 7z driver built on `sevenz-rust`: LZMA2 compression with optional
//! AES-256 encryption, readable by standard 7-Zip tooling.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use sevenz_rust::{
    AesEncoderOptions, Password, SevenZArchiveEntry, SevenZMethod, SevenZReader, SevenZWriter,
};

use crate::cancel::{CancelReader, CancelToken};
use crate::error::EngineError;
use crate::request::Outcome;

use super::InputPlan;

pub struct SevenZipCodec;

impl SevenZipCodec {
    pub fn compress(
        &self,
        plan: &InputPlan,
        output: &Path,
        password: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Outcome, EngineError> {
        let mut writer =
            SevenZWriter::create(output).map_err(|e| classify(e, output, password.is_some()))?;

        if let Some(pw) = password {
            writer.set_content_methods(vec![
                AesEncoderOptions::new(Password::from(pw)).into(),
                SevenZMethod::LZMA2.into(),
            ]);
        }

        let mut outcome = Outcome::default();
        for entry in &plan.entries {
            cancel.check()?;
            let name = entry.rel.to_string_lossy().replace('\\', "/");
            if entry.is_dir {
                let mut dir_entry = SevenZArchiveEntry::default();
                dir_entry.name = name;
                dir_entry.is_directory = true;
                writer
                    .push_archive_entry::<&[u8]>(dir_entry, None)
                    .map_err(|e| cancel.rewrap(classify(e, output, password.is_some())))?;
            } else {
                let file =
                    File::open(&entry.abs).map_err(|e| EngineError::io(e, &entry.abs))?;
                let reader = CancelReader::new(file, cancel.clone());
                writer
                    .push_archive_entry(
                        SevenZArchiveEntry::from_path(&entry.abs, name),
                        Some(reader),
                    )
                    .map_err(|e| cancel.rewrap(classify(e, output, password.is_some())))?;
                outcome.bytes_processed += entry.size;
            }
            outcome.entries_written += 1;
        }

        writer
            .finish()
            .map_err(|e| cancel.rewrap(EngineError::io(e, output)))?;
        Ok(outcome)
    }

    /// Extracts the archive entry by entry, refusing names that would land
    /// outside `out_dir` (same rule as the zip driver's `enclosed_name`).
    pub fn decompress(
        &self,
        input: &Path,
        out_dir: &Path,
        password: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Outcome, EngineError> {
        let file = File::open(input).map_err(|e| EngineError::io(e, input))?;
        let len = file
            .metadata()
            .map_err(|e| EngineError::io(e, input))?
            .len();
        let pw = match password {
            Some(p) => Password::from(p),
            None => Password::empty(),
        };
        let mut reader = SevenZReader::new(file, len, pw)
            .map_err(|e| cancel.rewrap(classify(e, input, password.is_some())))?;

        let mut outcome = Outcome::default();
        let mut failure: Option<EngineError> = None;
        reader
            .for_each_entries(|entry, rd| {
                if cancel.is_cancelled() {
                    failure = Some(EngineError::Cancelled);
                    return Ok(false);
                }
                let Some(rel) = entry_rel_path(entry.name()) else {
                    failure = Some(EngineError::corrupt(
                        input,
                        format!("entry '{}' escapes the output directory", entry.name()),
                    ));
                    return Ok(false);
                };
                let target = out_dir.join(rel);
                if entry.is_directory() {
                    fs::create_dir_all(&target).map_err(sevenz_rust::Error::io)?;
                } else {
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent).map_err(sevenz_rust::Error::io)?;
                    }
                    let mut out_file =
                        File::create(&target).map_err(sevenz_rust::Error::io)?;
                    let mut rd = CancelReader::new(rd, cancel.clone());
                    outcome.bytes_processed +=
                        io::copy(&mut rd, &mut out_file).map_err(sevenz_rust::Error::io)?;
                }
                outcome.entries_written += 1;
                Ok(true)
            })
            .map_err(|e| cancel.rewrap(classify(e, input, password.is_some())))?;

        match failure {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }
}

/// Normalizes a 7z entry name into a path relative to the extraction root.
/// `None` means the name cannot be contained: absolute, drive-qualified, or
/// climbing out via `..`.
fn entry_rel_path(name: &str) -> Option<PathBuf> {
    if name.starts_with('/') || name.starts_with('\\') || name.contains(':') {
        return None;
    }
    let mut rel = PathBuf::new();
    for part in name.split(['/', '\\']) {
        match part {
            "" | "." => continue,
            ".." => return None,
            _ => rel.push(part),
        }
    }
    if rel.as_os_str().is_empty() {
        None
    } else {
        Some(rel)
    }
}

/// Maps a `sevenz-rust` error to an engine error by inspecting its rendered
/// form; the crate's error surface shifts between releases, the wording of
/// password and checksum failures does not.
fn classify(e: sevenz_rust::Error, archive: &Path, password_supplied: bool) -> EngineError {
    let text = e.to_string();
    let lowered = text.to_ascii_lowercase();
    if lowered.contains("password") {
        return if password_supplied {
            EngineError::InvalidPassword(archive.to_path_buf())
        } else {
            EngineError::PasswordRequired(archive.to_path_buf())
        };
    }
    if password_supplied && (lowered.contains("checksum") || lowered.contains("crc")) {
        return EngineError::InvalidPassword(archive.to_path_buf());
    }
    if lowered.contains("signature")
        || lowered.contains("checksum")
        || lowered.contains("crc")
        || lowered.contains("unsupported")
        || lowered.contains("bad")
    {
        return EngineError::corrupt(archive, text);
    }
    EngineError::Io {
        source: std::io::Error::new(std::io::ErrorKind::Other, text),
        path: archive.to_path_buf(),
    }
}
