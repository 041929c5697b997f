//! RAR driver. Extraction only: the format is proprietary on the write side,
//! so the registry flags it `can_compress = false` and the orchestrator never
//! dispatches a compress call here.

use std::path::Path;

use unrar::error::{Code, UnrarError};
use unrar::Archive;

use crate::cancel::CancelToken;
use crate::error::EngineError;
use crate::request::Outcome;

pub struct RarCodec;

impl RarCodec {
    pub fn decompress(
        &self,
        input: &Path,
        out_dir: &Path,
        password: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Outcome, EngineError> {
        let archive = match password {
            Some(pw) => Archive::with_password(input, pw),
            None => Archive::new(input),
        };

        let mut processor = archive
            .open_for_processing()
            .map_err(|e| classify(e, input, password.is_some()))?;

        let mut outcome = Outcome::default();
        loop {
            cancel.check()?;
            let Some(header) = processor
                .read_header()
                .map_err(|e| classify(e, input, password.is_some()))?
            else {
                break;
            };

            let is_file = header.entry().is_file();
            let size = header.entry().unpacked_size;
            processor = header
                .extract_with_base(out_dir)
                .map_err(|e| classify(e, input, password.is_some()))?;

            outcome.entries_written += 1;
            if is_file {
                outcome.bytes_processed += size as u64;
            }
        }
        Ok(outcome)
    }
}

fn classify(e: UnrarError, archive: &Path, password_supplied: bool) -> EngineError {
    match e.code {
        Code::MissingPassword => EngineError::PasswordRequired(archive.to_path_buf()),
        Code::BadPassword => EngineError::InvalidPassword(archive.to_path_buf()),
        // RAR4 has no password verifier; a wrong password surfaces as a data
        // error, which we only call a bad password when one was supplied.
        Code::BadData if password_supplied => {
            EngineError::InvalidPassword(archive.to_path_buf())
        }
        Code::BadData | Code::BadArchive | Code::UnknownFormat => {
            EngineError::corrupt(archive, e.to_string())
        }
        _ => EngineError::Io {
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            path: archive.to_path_buf(),
        },
    }
}
