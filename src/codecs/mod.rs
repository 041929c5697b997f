//! # Codec drivers
//!
//! One driver per archive format, behind a tagged-variant dispatch enum
//! rather than trait objects, so a format's missing capability is a registry
//! fact checked before dispatch and never a runtime surprise inside a driver.

pub mod rar;
pub mod sevenz;
pub mod stream;
pub mod tar;
pub mod zip;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use crate::cancel::CancelToken;
use crate::error::EngineError;
use crate::formats::FormatDescriptor;
use crate::request::Outcome;

use rar::RarCodec;
use sevenz::SevenZipCodec;
use stream::{StreamCodec, StreamKind};
use tar::TarCodec;
use zip::ZipCodec;

/// Fixed chunk size for all streaming copies; memory stays bounded per file
/// regardless of archive size.
pub(crate) const COPY_BUF_SIZE: usize = 64 * 1024;

/// One filesystem object scheduled for archiving.
#[derive(Debug, Clone)]
pub struct PlannedEntry {
    /// Canonical on-disk location.
    pub abs: PathBuf,
    /// Path the entry gets inside the archive, relative to the common parent
    /// of all inputs.
    pub rel: PathBuf,
    pub is_dir: bool,
    pub size: u64,
}

/// The walked, ordered set of entries for one compression request.
#[derive(Debug, Default)]
pub struct InputPlan {
    pub entries: Vec<PlannedEntry>,
    pub total_bytes: u64,
}

impl InputPlan {
    pub fn file_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_dir).count()
    }
}

/// Walks every input path and computes archive-relative paths.
///
/// Directories are recursed depth-first in name order so entry ordering is
/// deterministic. Symlinks are skipped. Relative paths are taken from the
/// common parent of all inputs, so a directory input keeps its own name as
/// the archive's top-level entry.
pub fn plan_inputs(inputs: &[PathBuf]) -> Result<InputPlan, EngineError> {
    let mut canonical_inputs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let abs = fs::canonicalize(input).map_err(|e| EngineError::io(e, input))?;
        canonical_inputs.push(abs);
    }

    let parents: Vec<PathBuf> = canonical_inputs
        .iter()
        .map(|p| p.parent().unwrap_or(p).to_path_buf())
        .collect();
    let root = common_ancestor(&parents);

    let mut plan = InputPlan::default();
    for abs_input in &canonical_inputs {
        for entry in walkdir::WalkDir::new(abs_input)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(abs_input).to_path_buf();
                match e.into_io_error() {
                    Some(io_err) => EngineError::io(io_err, path),
                    None => EngineError::NotFound(path.display().to_string()),
                }
            })?;
            if entry.path_is_symlink() {
                continue;
            }
            let abs = entry.path().to_path_buf();
            let meta = entry
                .metadata()
                .map_err(|e| match e.into_io_error() {
                    Some(io_err) => EngineError::io(io_err, &abs),
                    None => EngineError::NotFound(abs.display().to_string()),
                })?;
            let rel = abs
                .strip_prefix(&root)
                .expect("walked path lies below the common root")
                .to_path_buf();
            plan.total_bytes += if meta.is_dir() { 0 } else { meta.len() };
            plan.entries.push(PlannedEntry {
                abs,
                rel,
                is_dir: meta.is_dir(),
                size: if meta.is_dir() { 0 } else { meta.len() },
            });
        }
    }
    Ok(plan)
}

/// Longest shared path prefix, component-wise.
fn common_ancestor(paths: &[PathBuf]) -> PathBuf {
    let mut iter = paths.iter();
    let Some(first) = iter.next() else {
        return PathBuf::new();
    };
    let mut shared: Vec<Component> = first.components().collect();
    for path in iter {
        let components: Vec<Component> = path.components().collect();
        let keep = shared
            .iter()
            .zip(components.iter())
            .take_while(|(a, b)| a == b)
            .count();
        shared.truncate(keep);
    }
    shared.iter().collect()
}

/// Copies `reader` into `writer` in fixed-size chunks, checking the token
/// between chunks. Returns the number of bytes copied.
pub(crate) fn copy_stream<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    cancel: &CancelToken,
) -> Result<u64, EngineError> {
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut copied = 0u64;
    loop {
        cancel.check()?;
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                cancel.check()?;
                continue;
            }
            Err(e) => return Err(EngineError::from(e)),
        };
        writer.write_all(&buf[..n])?;
        copied += n as u64;
    }
    Ok(copied)
}

/// The per-format driver, dispatched by format id.
pub enum Codec {
    Zip(ZipCodec),
    Tar(TarCodec),
    Stream(StreamCodec),
    SevenZip(SevenZipCodec),
    Rar(RarCodec),
}

impl Codec {
    /// Resolves the driver for a registry descriptor.
    pub fn for_format(desc: &FormatDescriptor) -> Self {
        match desc.id {
            "zip" => Codec::Zip(ZipCodec),
            "tar" => Codec::Tar(TarCodec::plain()),
            "tar.gz" => Codec::Tar(TarCodec::wrapped(StreamKind::Gzip)),
            "tar.bz2" => Codec::Tar(TarCodec::wrapped(StreamKind::Bzip2)),
            "tar.xz" => Codec::Tar(TarCodec::wrapped(StreamKind::Xz)),
            "tar.zst" => Codec::Tar(TarCodec::wrapped(StreamKind::Zstd)),
            "gz" => Codec::Stream(StreamCodec::new(StreamKind::Gzip)),
            "bz2" => Codec::Stream(StreamCodec::new(StreamKind::Bzip2)),
            "xz" => Codec::Stream(StreamCodec::new(StreamKind::Xz)),
            "zst" => Codec::Stream(StreamCodec::new(StreamKind::Zstd)),
            "7z" => Codec::SevenZip(SevenZipCodec),
            "rar" => Codec::Rar(RarCodec),
            other => unreachable!("format '{}' has no driver", other),
        }
    }

    /// Writes `plan` into the archive at `output`. The orchestrator has
    /// already validated capability flags, level bounds and password support.
    pub fn compress(
        &self,
        plan: &InputPlan,
        output: &Path,
        level: Option<u32>,
        password: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Outcome, EngineError> {
        match self {
            Codec::Zip(c) => c.compress(plan, output, level, password, cancel),
            Codec::Tar(c) => c.compress(plan, output, level, cancel),
            Codec::Stream(c) => c.compress(plan, output, level, cancel),
            Codec::SevenZip(c) => c.compress(plan, output, password, cancel),
            Codec::Rar(_) => Err(EngineError::UnsupportedFormat(
                "rar archives cannot be created".into(),
            )),
        }
    }

    /// Extracts one archive into `out_dir` (which already exists).
    pub fn decompress(
        &self,
        input: &Path,
        out_dir: &Path,
        password: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Outcome, EngineError> {
        match self {
            Codec::Zip(c) => c.decompress(input, out_dir, password, cancel),
            Codec::Tar(c) => c.decompress(input, out_dir, cancel),
            Codec::Stream(c) => c.decompress(input, out_dir, cancel),
            Codec::SevenZip(c) => c.decompress(input, out_dir, password, cancel),
            Codec::Rar(c) => c.decompress(input, out_dir, password, cancel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write as _;

    #[test]
    fn common_ancestor_of_siblings_is_parent() {
        let a = PathBuf::from("/data/proj/src");
        let b = PathBuf::from("/data/proj/docs");
        assert_eq!(common_ancestor(&[a, b]), PathBuf::from("/data/proj"));
    }

    #[test]
    fn plan_keeps_directory_name_as_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("tree/nested");
        fs::create_dir_all(&sub).unwrap();
        let mut f = File::create(sub.join("leaf.txt")).unwrap();
        writeln!(f, "x").unwrap();

        let plan = plan_inputs(&[dir.path().join("tree")]).unwrap();
        let rels: Vec<_> = plan.entries.iter().map(|e| e.rel.clone()).collect();
        assert!(rels.contains(&PathBuf::from("tree")));
        assert!(rels.contains(&PathBuf::from("tree/nested/leaf.txt")));
    }

    #[test]
    fn copy_stream_stops_on_cancel() {
        let token = CancelToken::new();
        token.cancel();
        let data = vec![0u8; 1024];
        let mut out = Vec::new();
        let err = copy_stream(&mut &data[..], &mut out, &token).unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        assert!(out.is_empty());
    }
}
