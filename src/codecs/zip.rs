//! Zip driver: deflate compression with levels 0-9 and AES-256 password
//! protection, interoperable with standard zip tooling in both directions.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{AesMode, CompressionMethod, ZipArchive, ZipWriter};

use crate::cancel::{CancelReader, CancelToken};
use crate::error::EngineError;
use crate::fsx;
use crate::request::Outcome;

use super::{copy_stream, InputPlan};

const ZIP64_THRESHOLD: u64 = 0xFFFF_FFFF;

pub struct ZipCodec;

impl ZipCodec {
    pub fn compress(
        &self,
        plan: &InputPlan,
        output: &Path,
        level: Option<u32>,
        password: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Outcome, EngineError> {
        let level = level.unwrap_or(6);
        let out_file = File::create(output).map_err(|e| EngineError::io(e, output))?;
        let mut writer = ZipWriter::new(out_file);
        let mut outcome = Outcome::default();

        for entry in &plan.entries {
            cancel.check()?;
            let name = archive_name(&entry.rel);

            let mut options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(level as i64))
                .large_file(entry.size >= ZIP64_THRESHOLD);
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(meta) = fs::metadata(&entry.abs) {
                    options = options.unix_permissions(meta.permissions().mode());
                }
            }
            if let Some(pw) = password {
                options = options.with_aes_encryption(AesMode::Aes256, pw);
            }

            if entry.is_dir {
                writer
                    .add_directory(name.as_str(), options)
                    .map_err(|e| map_zip_error(e, output, cancel, false))?;
            } else {
                writer
                    .start_file(name.as_str(), options)
                    .map_err(|e| map_zip_error(e, output, cancel, false))?;
                let file =
                    File::open(&entry.abs).map_err(|e| EngineError::io(e, &entry.abs))?;
                let mut reader = CancelReader::new(file, cancel.clone());
                outcome.bytes_processed += copy_stream(&mut reader, &mut writer, cancel)
                    .map_err(|e| cancel.rewrap(e))?;
            }
            outcome.entries_written += 1;
        }

        writer
            .finish()
            .map_err(|e| map_zip_error(e, output, cancel, false))?;
        Ok(outcome)
    }

    pub fn decompress(
        &self,
        input: &Path,
        out_dir: &Path,
        password: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Outcome, EngineError> {
        let file = File::open(input).map_err(|e| EngineError::io(e, input))?;
        let reader = CancelReader::new(BufReader::new(file), cancel.clone());

        // Parsing the central directory is the integrity gate: a truncated or
        // garbage file fails here, before anything is written.
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| map_zip_error(e, input, cancel, password.is_some()))?;

        // Refuse up front when entries are encrypted and no password came in.
        if password.is_none() {
            for i in 0..archive.len() {
                let raw = archive
                    .by_index_raw(i)
                    .map_err(|e| map_zip_error(e, input, cancel, false))?;
                if raw.encrypted() {
                    return Err(EngineError::PasswordRequired(input.to_path_buf()));
                }
            }
        }

        let mut outcome = Outcome::default();
        for i in 0..archive.len() {
            cancel.check()?;
            let mut entry = match password {
                Some(pw) => archive
                    .by_index_decrypt(i, pw.as_bytes())
                    .map_err(|e| map_zip_error(e, input, cancel, true))?,
                None => archive
                    .by_index(i)
                    .map_err(|e| map_zip_error(e, input, cancel, false))?,
            };

            let Some(rel) = entry.enclosed_name() else {
                return Err(EngineError::corrupt(
                    input,
                    format!("entry '{}' escapes the output directory", entry.name()),
                ));
            };
            let target = out_dir.join(rel);

            if entry.is_dir() {
                fs::create_dir_all(&target).map_err(|e| EngineError::io(e, &target))?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| EngineError::io(e, parent))?;
                }
                let mut out_file =
                    File::create(&target).map_err(|e| EngineError::io(e, &target))?;
                let copied =
                    copy_stream(&mut entry, &mut out_file, cancel).map_err(|e| {
                        // A data error on an encrypted legacy (ZipCrypto) entry
                        // is how a wrong password shows up; AES entries are
                        // rejected earlier by the key verifier.
                        match (&e, password) {
                            (EngineError::Io { source, .. }, Some(_))
                                if source.kind() == std::io::ErrorKind::InvalidData =>
                            {
                                EngineError::InvalidPassword(input.to_path_buf())
                            }
                            _ => cancel.rewrap(e),
                        }
                    })?;
                outcome.bytes_processed += copied;

                if let Some(mode) = entry.unix_mode() {
                    let _ = fsx::set_unix_permissions(&target, mode);
                }
            }
            outcome.entries_written += 1;
        }
        Ok(outcome)
    }
}

/// Zip entry names always use forward slashes, regardless of host OS.
fn archive_name(rel: &Path) -> String {
    let mut name = String::new();
    for comp in rel.components() {
        if !name.is_empty() {
            name.push('/');
        }
        name.push_str(&comp.as_os_str().to_string_lossy());
    }
    name
}

fn map_zip_error(
    e: ZipError,
    archive: &Path,
    cancel: &CancelToken,
    password_supplied: bool,
) -> EngineError {
    match e {
        ZipError::Io(io_err) => cancel.rewrap(EngineError::io(io_err, archive)),
        ZipError::InvalidPassword => EngineError::InvalidPassword(archive.to_path_buf()),
        ZipError::UnsupportedArchive(msg) if msg.contains("Password") => {
            if password_supplied {
                EngineError::InvalidPassword(archive.to_path_buf())
            } else {
                EngineError::PasswordRequired(archive.to_path_buf())
            }
        }
        ZipError::UnsupportedArchive(msg) => EngineError::UnsupportedFormat(msg.to_string()),
        other => EngineError::corrupt(archive, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn archive_names_use_forward_slashes() {
        let rel: PathBuf = ["dir", "sub", "file.txt"].iter().collect();
        assert_eq!(archive_name(&rel), "dir/sub/file.txt");
    }
}
