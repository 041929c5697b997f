//! Request and outcome types exchanged across the engine boundary.
//!
//! Requests are transient: built per user action, consumed by exactly one
//! orchestrator invocation, discarded after the outcome is delivered. The
//! engine itself is stateless per request; everything it needs arrives here.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, ErrorKind};

/// Options for one compression request, as supplied by the frontend.
#[derive(Debug, Clone, Deserialize)]
pub struct CompressOptions {
    /// Format id (registry id or one of its aliases).
    pub format: String,
    /// Compression level; `None` selects the format's default.
    pub level: Option<u32>,
    /// Password, only for formats with `supports_password`.
    pub password: Option<String>,
}

/// One compression request: pack `inputs` into the archive at `output`.
#[derive(Debug, Clone)]
pub struct CompressRequest {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub options: CompressOptions,
}

/// Options for one decompression request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecompressOptions {
    pub password: Option<String>,
}

/// One decompression request: extract each archive in `inputs` into
/// `output_dir`. Extraction layout (shared dir, per-archive subfolder) is the
/// caller's policy, expressed through `output_dir` construction.
#[derive(Debug, Clone)]
pub struct DecompressRequest {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    /// Explicit format override; `None` infers per archive from extension or
    /// magic bytes.
    pub format: Option<String>,
    pub options: DecompressOptions,
}

/// Terminal result of one successful archive operation.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Outcome {
    /// Uncompressed bytes streamed through the codec.
    pub bytes_processed: u64,
    /// Files and directories written (extract) or archived (compress).
    pub entries_written: u64,
}

/// Per-archive result inside a multi-archive decompression.
#[derive(Debug)]
pub struct ArchiveReport {
    pub archive: PathBuf,
    pub result: Result<Outcome, EngineError>,
}

/// Aggregated result of a multi-archive decompression. Reports are ordered
/// exactly as the request's inputs; a failure on one archive never aborts its
/// siblings.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub reports: Vec<ArchiveReport>,
}

impl BatchOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.reports.iter().all(|r| r.result.is_ok())
    }

    /// Collapses the batch: `Ok` only when every archive succeeded, else the
    /// kind of the first failure.
    pub fn overall(&self) -> Result<(), ErrorKind> {
        match self.reports.iter().find_map(|r| r.result.as_ref().err()) {
            None => Ok(()),
            Some(e) => Err(e.kind()),
        }
    }

    /// Error kinds per archive, for callers that only need the discriminants.
    pub fn failure_kinds(&self) -> Vec<Option<ErrorKind>> {
        self.reports
            .iter()
            .map(|r| r.result.as_ref().err().map(|e| e.kind()))
            .collect()
    }
}
