//! # Engine boundary
//!
//! The operations the presentation layer calls, transport-agnostic and
//! asynchronous end-to-end: each request runs on a blocking worker and the
//! caller awaits its outcome. Independent requests may run concurrently; the
//! only shared state is the read-only format registry. Shell-integration
//! operations are serialized against each other in [`crate::shell`].

use std::path::PathBuf;

use serde::Serialize;

use crate::cancel::CancelToken;
use crate::error::EngineError;
use crate::formats::{self, FormatDescriptor};
use crate::orchestrator;
use crate::request::{
    BatchOutcome, CompressOptions, CompressRequest, DecompressOptions, DecompressRequest, Outcome,
};
use crate::shell::{self, AssocMode, FormatSelection, OpenMode};

/// Compresses `inputs` into the archive at `output`.
pub async fn compress_files(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    options: CompressOptions,
    cancel: CancelToken,
) -> Result<Outcome, EngineError> {
    let req = CompressRequest {
        inputs,
        output,
        options,
    };
    run_blocking(move || orchestrator::compress(&req, &cancel)).await
}

/// Extracts each archive in `inputs` into `output_dir`.
///
/// `Err` means the request itself was rejected; per-archive failures are
/// reported inside the batch (`BatchOutcome::overall`) so the caller can
/// render partial results.
pub async fn decompress_files(
    inputs: Vec<PathBuf>,
    output_dir: PathBuf,
    format: Option<String>,
    options: Option<DecompressOptions>,
    cancel: CancelToken,
) -> Result<BatchOutcome, EngineError> {
    let req = DecompressRequest {
        inputs,
        output_dir,
        format,
        options: options.unwrap_or_default(),
    };
    run_blocking(move || orchestrator::decompress(&req, &cancel)).await
}

/// Format ids in registry order, for the frontend's format picker.
pub fn supported_formats() -> Vec<String> {
    formats::list_formats()
        .iter()
        .map(|f| f.id.to_string())
        .collect()
}

/// Full descriptor for one format id.
pub fn format_options(format: &str) -> Result<&'static FormatDescriptor, EngineError> {
    formats::get_format(format)
}

/// Application version details for the about dialog.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: String,
    pub build_time: String,
    pub author: String,
    pub description: String,
}

pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        author: env!("CARGO_PKG_AUTHORS").to_string(),
        description: env!("CARGO_PKG_DESCRIPTION").to_string(),
    }
}

/// Registers the shell context-menu entries.
pub async fn add_context_menu(mode: OpenMode) -> Result<(), EngineError> {
    run_blocking(move || shell::add_context_menu(mode)).await
}

pub async fn remove_context_menu() -> Result<(), EngineError> {
    run_blocking(shell::remove_context_menu).await
}

/// Associates archive extensions with this application.
pub async fn set_file_association(
    selection: FormatSelection,
    mode: AssocMode,
) -> Result<(), EngineError> {
    run_blocking(move || shell::set_file_association(&selection, mode)).await
}

pub async fn remove_file_association(selection: FormatSelection) -> Result<(), EngineError> {
    run_blocking(move || shell::remove_file_association(&selection)).await
}

async fn run_blocking<T, F>(f: F) -> Result<T, EngineError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, EngineError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EngineError::Io {
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            path: PathBuf::new(),
        })?
}
