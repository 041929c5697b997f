//! # MultiArc Core Library
//!
//! Core archive engine behind the `multiarc` application: multi-format
//! compression and decompression with format introspection, password-protected
//! archives, compression-level control and OS shell integration.
//!
//! ## Key Modules
//!
//! - [`formats`]: the fixed registry of supported formats and their
//!   capability flags, plus extension and magic-byte inference.
//! - [`codecs`]: one driver per format (zip, tar and its compressed
//!   composites, the single-stream codecs, 7z, rar read-only).
//! - [`orchestrator`]: validates requests, dispatches drivers, cleans up
//!   partial output and aggregates multi-archive results.
//! - [`api`]: the asynchronous boundary the presentation layer calls.
//! - [`shell`]: Windows context-menu and file-association registration.

pub mod api;
pub mod cancel;
pub mod cli;
pub mod codecs;
pub mod error;
pub mod formats;
pub mod fsx;
pub mod orchestrator;
pub mod request;
pub mod shell;

pub use cancel::CancelToken;
pub use error::{EngineError, ErrorKind};
pub use request::{BatchOutcome, CompressOptions, DecompressOptions, Outcome};
