//! Tar driver: plain `.tar` plus the compressed composites (`tar.gz`,
//! `tar.bz2`, `tar.xz`, `tar.zst`), sharing one entry-writing path with the
//! codec layered on via [`StreamEncoder`] / [`StreamDecoder`].

use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::cancel::{CancelReader, CancelToken};
use crate::error::EngineError;
use crate::request::Outcome;

use super::stream::{classify_decode_error, StreamDecoder, StreamEncoder, StreamKind};
use super::InputPlan;

pub struct TarCodec {
    /// Compression wrapped around the tar stream; `None` for plain `.tar`.
    inner: Option<StreamKind>,
}

impl TarCodec {
    pub fn plain() -> Self {
        Self { inner: None }
    }

    pub fn wrapped(kind: StreamKind) -> Self {
        Self { inner: Some(kind) }
    }

    pub fn compress(
        &self,
        plan: &InputPlan,
        output: &Path,
        level: Option<u32>,
        cancel: &CancelToken,
    ) -> Result<Outcome, EngineError> {
        let out_file = File::create(output).map_err(|e| EngineError::io(e, output))?;

        let outcome = match self.inner {
            None => {
                let mut builder = tar::Builder::new(out_file);
                let outcome = append_entries(&mut builder, plan, cancel)?;
                builder
                    .into_inner()
                    .map_err(|e| cancel.rewrap(EngineError::io(e, output)))?;
                outcome
            }
            Some(kind) => {
                let level = level.unwrap_or_else(|| kind.default_level());
                let encoder = StreamEncoder::new(kind, out_file, level)
                    .map_err(|e| EngineError::io(e, output))?;
                let mut builder = tar::Builder::new(encoder);
                let outcome = append_entries(&mut builder, plan, cancel)?;
                let encoder = builder
                    .into_inner()
                    .map_err(|e| cancel.rewrap(EngineError::io(e, output)))?;
                encoder
                    .finish()
                    .map_err(|e| cancel.rewrap(EngineError::io(e, output)))?;
                outcome
            }
        };

        debug!(
            entries = outcome.entries_written,
            bytes = outcome.bytes_processed,
            "tar archive written"
        );
        Ok(outcome)
    }

    pub fn decompress(
        &self,
        input: &Path,
        out_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<Outcome, EngineError> {
        let file = File::open(input).map_err(|e| EngineError::io(e, input))?;
        let reader = CancelReader::new(BufReader::new(file), cancel.clone());

        match self.inner {
            None => unpack_entries(reader, input, out_dir, cancel),
            Some(kind) => {
                let decoder = StreamDecoder::new(kind, reader)
                    .map_err(|e| cancel.rewrap(classify_decode_error(e, input)))?;
                unpack_entries(decoder, input, out_dir, cancel)
            }
        }
    }
}

/// Streams every planned entry into the tar builder. Empty directories are
/// written as directory entries; file data goes through a cancellation-aware
/// reader so a cancel interrupts mid-file.
fn append_entries<W: Write>(
    builder: &mut tar::Builder<W>,
    plan: &InputPlan,
    cancel: &CancelToken,
) -> Result<Outcome, EngineError> {
    let mut outcome = Outcome::default();
    for entry in &plan.entries {
        cancel.check()?;
        if entry.is_dir {
            builder
                .append_dir(&entry.rel, &entry.abs)
                .map_err(|e| cancel.rewrap(EngineError::io(e, &entry.abs)))?;
        } else {
            let meta =
                fs::metadata(&entry.abs).map_err(|e| EngineError::io(e, &entry.abs))?;
            let mut header = tar::Header::new_gnu();
            header.set_metadata(&meta);
            let file = File::open(&entry.abs).map_err(|e| EngineError::io(e, &entry.abs))?;
            let reader = CancelReader::new(file, cancel.clone());
            builder
                .append_data(&mut header, &entry.rel, reader)
                .map_err(|e| cancel.rewrap(EngineError::io(e, &entry.abs)))?;
            outcome.bytes_processed += meta.len();
        }
        outcome.entries_written += 1;
    }
    Ok(outcome)
}

/// Unpacks a tar stream into `out_dir`, refusing entries that would escape
/// it (`unpack_in` guards against `..` and absolute paths).
fn unpack_entries<R: Read>(
    reader: R,
    input: &Path,
    out_dir: &Path,
    cancel: &CancelToken,
) -> Result<Outcome, EngineError> {
    let mut archive = tar::Archive::new(reader);
    let mut outcome = Outcome::default();

    let entries = archive
        .entries()
        .map_err(|e| cancel.rewrap(classify_decode_error(e, input)))?;
    for entry in entries {
        cancel.check()?;
        let mut entry = entry.map_err(|e| cancel.rewrap(classify_decode_error(e, input)))?;
        let size = entry.size();
        let written = entry
            .unpack_in(out_dir)
            .map_err(|e| cancel.rewrap(classify_decode_error(e, input)))?;
        if written {
            outcome.entries_written += 1;
            outcome.bytes_processed += size;
        }
    }
    Ok(outcome)
}
