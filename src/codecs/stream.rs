//! Single-stream codecs: gzip, bzip2, xz and zstd.
//!
//! These formats wrap exactly one byte stream, so the driver accepts exactly
//! one regular-file input; packing several files or a directory needs the
//! matching tar composite and the driver says so. The [`StreamEncoder`] /
//! [`StreamDecoder`] pair is also the inner layer of the tar composites.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use crate::cancel::{CancelReader, CancelToken};
use crate::error::EngineError;
use crate::request::Outcome;

use super::{copy_stream, InputPlan};

/// Which single-stream codec to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl StreamKind {
    /// Canonical extension, used to strip the suffix when extracting.
    pub fn extension(self) -> &'static str {
        match self {
            StreamKind::Gzip => "gz",
            StreamKind::Bzip2 => "bz2",
            StreamKind::Xz => "xz",
            StreamKind::Zstd => "zst",
        }
    }

    pub(crate) fn default_level(self) -> u32 {
        match self {
            StreamKind::Zstd => 3,
            _ => 6,
        }
    }
}

/// Compressing writer over any sink, one variant per codec.
pub enum StreamEncoder<W: Write> {
    Gzip(GzEncoder<W>),
    Bzip2(BzEncoder<W>),
    Xz(XzEncoder<W>),
    Zstd(zstd::stream::Encoder<'static, W>),
}

impl<W: Write> StreamEncoder<W> {
    pub fn new(kind: StreamKind, sink: W, level: u32) -> io::Result<Self> {
        Ok(match kind {
            StreamKind::Gzip => {
                StreamEncoder::Gzip(GzEncoder::new(sink, flate2::Compression::new(level)))
            }
            StreamKind::Bzip2 => {
                StreamEncoder::Bzip2(BzEncoder::new(sink, bzip2::Compression::new(level)))
            }
            StreamKind::Xz => StreamEncoder::Xz(XzEncoder::new(sink, level)),
            StreamKind::Zstd => {
                StreamEncoder::Zstd(zstd::stream::Encoder::new(sink, level as i32)?)
            }
        })
    }

    /// Flushes codec trailers. Compression is not complete until this runs.
    pub fn finish(self) -> io::Result<W> {
        match self {
            StreamEncoder::Gzip(e) => e.finish(),
            StreamEncoder::Bzip2(e) => e.finish(),
            StreamEncoder::Xz(e) => e.finish(),
            StreamEncoder::Zstd(e) => e.finish(),
        }
    }
}

impl<W: Write> Write for StreamEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            StreamEncoder::Gzip(e) => e.write(buf),
            StreamEncoder::Bzip2(e) => e.write(buf),
            StreamEncoder::Xz(e) => e.write(buf),
            StreamEncoder::Zstd(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            StreamEncoder::Gzip(e) => e.flush(),
            StreamEncoder::Bzip2(e) => e.flush(),
            StreamEncoder::Xz(e) => e.flush(),
            StreamEncoder::Zstd(e) => e.flush(),
        }
    }
}

/// Decompressing reader over any source, one variant per codec.
pub enum StreamDecoder<R: Read> {
    Gzip(GzDecoder<R>),
    Bzip2(BzDecoder<R>),
    Xz(XzDecoder<R>),
    Zstd(zstd::stream::Decoder<'static, BufReader<R>>),
}

impl<R: Read> StreamDecoder<R> {
    pub fn new(kind: StreamKind, source: R) -> io::Result<Self> {
        Ok(match kind {
            StreamKind::Gzip => StreamDecoder::Gzip(GzDecoder::new(source)),
            StreamKind::Bzip2 => StreamDecoder::Bzip2(BzDecoder::new(source)),
            StreamKind::Xz => StreamDecoder::Xz(XzDecoder::new(source)),
            StreamKind::Zstd => StreamDecoder::Zstd(zstd::stream::Decoder::new(source)?),
        })
    }
}

impl<R: Read> Read for StreamDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            StreamDecoder::Gzip(d) => d.read(buf),
            StreamDecoder::Bzip2(d) => d.read(buf),
            StreamDecoder::Xz(d) => d.read(buf),
            StreamDecoder::Zstd(d) => d.read(buf),
        }
    }
}

/// Driver for the bare single-file formats (`gz`, `bz2`, `xz`, `zst`).
pub struct StreamCodec {
    kind: StreamKind,
}

impl StreamCodec {
    pub fn new(kind: StreamKind) -> Self {
        Self { kind }
    }

    pub fn compress(
        &self,
        plan: &InputPlan,
        output: &Path,
        level: Option<u32>,
        cancel: &CancelToken,
    ) -> Result<Outcome, EngineError> {
        let files: Vec<_> = plan.entries.iter().filter(|e| !e.is_dir).collect();
        if plan.entries.iter().any(|e| e.is_dir) || files.len() != 1 {
            return Err(EngineError::InvalidOption(format!(
                "{} compresses a single file; use tar.{} to pack directories or multiple files",
                self.kind.extension(),
                self.kind.extension()
            )));
        }
        let source = &files[0];

        let level = level.unwrap_or_else(|| self.kind.default_level());
        let out_file = File::create(output).map_err(|e| EngineError::io(e, output))?;
        let mut encoder = StreamEncoder::new(self.kind, out_file, level)
            .map_err(|e| EngineError::io(e, output))?;

        let mut input =
            File::open(&source.abs).map_err(|e| EngineError::io(e, &source.abs))?;
        let bytes = copy_stream(&mut input, &mut encoder, cancel)?;
        encoder.finish().map_err(|e| EngineError::io(e, output))?;

        Ok(Outcome {
            bytes_processed: bytes,
            entries_written: 1,
        })
    }

    pub fn decompress(
        &self,
        input: &Path,
        out_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<Outcome, EngineError> {
        let target = out_dir.join(stripped_name(input, self.kind));

        let source = File::open(input).map_err(|e| EngineError::io(e, input))?;
        let reader = CancelReader::new(BufReader::new(source), cancel.clone());
        let mut decoder = StreamDecoder::new(self.kind, reader)
            .map_err(|e| cancel.rewrap(classify_decode_error(e, input)))?;
        let mut out_file = File::create(&target).map_err(|e| EngineError::io(e, &target))?;

        let mut buf = vec![0u8; super::COPY_BUF_SIZE];
        let mut bytes = 0u64;
        loop {
            cancel.check()?;
            match decoder.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    out_file
                        .write_all(&buf[..n])
                        .map_err(|e| EngineError::io(e, &target))?;
                    bytes += n as u64;
                }
                Err(e) => return Err(cancel.rewrap(classify_decode_error(e, input))),
            }
        }

        Ok(Outcome {
            bytes_processed: bytes,
            entries_written: 1,
        })
    }
}

/// Output file name for an extracted single-stream archive: the input name
/// minus the codec suffix, or `<name>.out` when there is nothing to strip.
fn stripped_name(input: &Path, kind: StreamKind) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    let suffix = format!(".{}", kind.extension());
    match name.strip_suffix(&suffix) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => format!("{}.out", name),
    }
}

/// Maps a codec read failure: real I/O faults keep their cause, anything the
/// decoder rejected is a corrupt archive.
pub(crate) fn classify_decode_error(e: io::Error, archive: &Path) -> EngineError {
    match e.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
            EngineError::corrupt(archive, e.to_string())
        }
        io::ErrorKind::Other => {
            // bzip2/xz stream errors surface as Other with a codec message.
            EngineError::corrupt(archive, e.to_string())
        }
        _ => EngineError::io(e, archive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripped_name_removes_codec_suffix() {
        assert_eq!(
            stripped_name(Path::new("/tmp/report.txt.gz"), StreamKind::Gzip),
            "report.txt"
        );
        assert_eq!(
            stripped_name(Path::new("/tmp/noext"), StreamKind::Xz),
            "noext.out"
        );
    }
}
