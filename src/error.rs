use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// The primary error type for all operations in the `multiarc` crate.
///
/// Every failure the engine can produce maps to exactly one variant, so the
/// caller (GUI or CLI) can render a specific, localizable message from
/// [`EngineError::kind`] instead of parsing free text.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A request option is invalid for the chosen format (bad level, password
    /// on a format without password support, multiple inputs for a
    /// single-stream codec, ...).
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// An input path does not exist, or a format id is not in the registry.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operating system denied access to a path.
    #[error("permission denied on path '{}'", path.display())]
    PermissionDenied { path: PathBuf },

    /// The archive failed structural validation or decoding.
    #[error("corrupt archive '{}': {detail}", path.display())]
    CorruptArchive { path: PathBuf, detail: String },

    /// The archive is password-protected and no password was supplied.
    #[error("archive '{}' is password-protected", .0.display())]
    PasswordRequired(PathBuf),

    /// The supplied password does not decrypt the archive.
    #[error("wrong password for archive '{}'", .0.display())]
    InvalidPassword(PathBuf),

    /// The format cannot serve the requested direction, or the format of an
    /// input archive could not be determined.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// An I/O error occurred mid-operation. Includes the path where the error
    /// happened; the underlying cause is preserved for diagnostics.
    #[error("I/O error on path '{}': {source}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation is not available on this platform (shell integration on
    /// non-Windows hosts).
    #[error("operation not supported on this platform")]
    Unsupported,
}

/// Machine-readable error discriminant, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidOption,
    NotFound,
    PermissionDenied,
    CorruptArchive,
    PasswordRequired,
    InvalidPassword,
    UnsupportedFormat,
    IoFailure,
    Cancelled,
    Unsupported,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidOption(_) => ErrorKind::InvalidOption,
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            EngineError::CorruptArchive { .. } => ErrorKind::CorruptArchive,
            EngineError::PasswordRequired(_) => ErrorKind::PasswordRequired,
            EngineError::InvalidPassword(_) => ErrorKind::InvalidPassword,
            EngineError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            EngineError::Io { .. } => ErrorKind::IoFailure,
            EngineError::Cancelled => ErrorKind::Cancelled,
            EngineError::Unsupported => ErrorKind::Unsupported,
        }
    }

    /// Wraps an I/O error, mapping permission failures to their own kind so
    /// they stay distinguishable from disk-level faults.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            EngineError::PermissionDenied { path }
        } else {
            EngineError::Io { source, path }
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        EngineError::CorruptArchive {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

// Generic IO conversion for call sites without a meaningful path.
impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::io(err, PathBuf::new())
    }
}
