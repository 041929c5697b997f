//! Cooperative cancellation for long-running requests.
//!
//! A [`CancelToken`] is cloned into a worker; streaming code checks it once
//! per bounded-size chunk, and [`CancelReader`] lets codec libraries that
//! pull from a `Read` observe cancellation mid-stream, so a cancel request
//! stops I/O promptly instead of at the next file boundary.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::EngineError;

/// Shared cancellation flag for one request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation. Safe to call from any thread, idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Returns `Err(EngineError::Cancelled)` once the token is signalled.
    pub fn check(&self) -> Result<(), EngineError> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Rewrites an I/O error produced below a [`CancelReader`] back into
    /// [`EngineError::Cancelled`] when this token caused it.
    pub fn rewrap(&self, err: EngineError) -> EngineError {
        if self.is_cancelled() {
            EngineError::Cancelled
        } else {
            err
        }
    }
}

/// A `Read` (and `Seek`) adapter that fails once its token is cancelled.
/// Codec libraries propagate that error out of their decode loops; callers
/// turn it back into `Cancelled` via [`CancelToken::rewrap`]. The error kind
/// must not be `Interrupted`, which `read_exact` retries indefinitely.
pub struct CancelReader<R> {
    inner: R,
    token: CancelToken,
}

impl<R> CancelReader<R> {
    pub fn new(inner: R, token: CancelToken) -> Self {
        Self { inner, token }
    }
}

impl<R: Read> Read for CancelReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.token.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Other, "operation cancelled"));
        }
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for CancelReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_trips_once_cancelled() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        assert!(matches!(token.check(), Err(EngineError::Cancelled)));
    }

    #[test]
    fn reader_fails_after_cancel() {
        let token = CancelToken::new();
        let data = vec![0u8; 16];
        let mut reader = CancelReader::new(&data[..], token.clone());
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 8);
        token.cancel();
        let err = reader.read(&mut buf).unwrap_err();
        assert_ne!(err.kind(), io::ErrorKind::Interrupted);
        assert!(token.rewrap(err.into()).kind() == crate::error::ErrorKind::Cancelled);
    }
}
