//! The format registry: a fixed, process-lifetime catalog of every archive
//! format the engine understands, plus extension and magic-byte inference.

use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::error::EngineError;

/// Identity and capability flags for one archive format.
///
/// Descriptors are constructed once in [`FORMATS`] and never mutated; lookups
/// hand out `'static` references.
#[derive(Debug, Clone, Serialize)]
pub struct FormatDescriptor {
    /// Unique identifier, also the canonical extension spelling (`tar.gz`).
    pub id: &'static str,
    /// Display name for the frontend.
    pub name: &'static str,
    /// Canonical file extension, without the leading dot.
    pub extension: &'static str,
    pub can_compress: bool,
    pub can_decompress: bool,
    pub supports_password: bool,
    pub supports_level: bool,
    pub min_level: Option<u32>,
    pub max_level: Option<u32>,
    pub default_level: Option<u32>,
}

impl FormatDescriptor {
    /// Checks a requested compression level against the declared bounds.
    /// Out-of-range values are rejected, never clamped.
    pub fn validate_level(&self, level: u32) -> Result<(), EngineError> {
        if !self.supports_level {
            return Err(EngineError::InvalidOption(format!(
                "format '{}' does not support compression levels",
                self.id
            )));
        }
        let (min, max) = (self.min_level.unwrap_or(0), self.max_level.unwrap_or(0));
        if level < min || level > max {
            return Err(EngineError::InvalidOption(format!(
                "level {} out of range {}..={} for format '{}'",
                level, min, max, self.id
            )));
        }
        Ok(())
    }
}

const fn plain(id: &'static str, name: &'static str) -> FormatDescriptor {
    FormatDescriptor {
        id,
        name,
        extension: id,
        can_compress: true,
        can_decompress: true,
        supports_password: false,
        supports_level: false,
        min_level: None,
        max_level: None,
        default_level: None,
    }
}

const fn leveled(
    id: &'static str,
    name: &'static str,
    min: u32,
    max: u32,
    default: u32,
) -> FormatDescriptor {
    FormatDescriptor {
        id,
        name,
        extension: id,
        can_compress: true,
        can_decompress: true,
        supports_password: false,
        supports_level: true,
        min_level: Some(min),
        max_level: Some(max),
        default_level: Some(default),
    }
}

/// The full format table. Order is the order reported to the frontend.
pub static FORMATS: &[FormatDescriptor] = &[
    FormatDescriptor {
        supports_password: true,
        ..leveled("zip", "ZIP", 0, 9, 6)
    },
    plain("tar", "TAR"),
    leveled("tar.gz", "TAR+GZIP", 0, 9, 6),
    leveled("tar.bz2", "TAR+BZIP2", 1, 9, 6),
    leveled("tar.xz", "TAR+XZ", 0, 9, 6),
    leveled("tar.zst", "TAR+ZSTD", 1, 22, 3),
    leveled("gz", "GZIP", 0, 9, 6),
    leveled("bz2", "BZIP2", 1, 9, 6),
    leveled("xz", "XZ", 0, 9, 6),
    leveled("zst", "ZSTD", 1, 22, 3),
    FormatDescriptor {
        supports_password: true,
        ..plain("7z", "7-ZIP")
    },
    FormatDescriptor {
        can_compress: false,
        supports_password: true,
        ..plain("rar", "RAR")
    },
];

/// Returns every registered format descriptor, in registry order.
pub fn list_formats() -> &'static [FormatDescriptor] {
    FORMATS
}

/// Looks up a format by id, accepting the common alias spellings the
/// frontend and CLI hand over (`gzip`, `tgz`, `7zip`, ...).
pub fn get_format(id: &str) -> Result<&'static FormatDescriptor, EngineError> {
    let id = id.trim().trim_start_matches('.').to_ascii_lowercase();
    let canonical = match id.as_str() {
        "gzip" => "gz",
        "bzip2" => "bz2",
        "zstd" => "zst",
        "7zip" => "7z",
        "tgz" => "tar.gz",
        "tbz2" => "tar.bz2",
        "txz" => "tar.xz",
        "tzst" => "tar.zst",
        other => other,
    };
    FORMATS
        .iter()
        .find(|f| f.id == canonical)
        .ok_or_else(|| EngineError::NotFound(format!("unknown format id '{}'", id)))
}

/// Infers a format from a file name, longest matching suffix first, so
/// `.tar.gz` resolves to the tar composite rather than plain `.gz`.
pub fn infer_format(path: &Path) -> Option<&'static FormatDescriptor> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();

    // Compound suffixes take precedence over the simple extension.
    const COMPOUND: &[(&str, &str)] = &[
        (".tar.gz", "tar.gz"),
        (".tgz", "tar.gz"),
        (".tar.bz2", "tar.bz2"),
        (".tbz2", "tar.bz2"),
        (".tar.xz", "tar.xz"),
        (".txz", "tar.xz"),
        (".tar.zst", "tar.zst"),
        (".tzst", "tar.zst"),
    ];
    for (suffix, id) in COMPOUND {
        if name.ends_with(suffix) {
            return get_format(id).ok();
        }
    }

    let ext = name.rsplit_once('.')?.1;
    get_format(ext).ok()
}

/// Sniffs the format from an archive's leading magic bytes. Used as a
/// fallback when the extension is missing or unknown.
///
/// A gzip stream whose file name ends in `.tar.gz`/`.tgz` is already handled
/// by [`infer_format`]; a bare gzip magic resolves to plain `gz` here since
/// the wrapped payload cannot be inspected without decompressing.
pub fn sniff_format(path: &Path) -> Result<Option<&'static FormatDescriptor>, EngineError> {
    let mut file = std::fs::File::open(path).map_err(|e| EngineError::io(e, path))?;
    let mut head = [0u8; 512 + 8];
    let n = file.read(&mut head).map_err(|e| EngineError::io(e, path))?;
    let head = &head[..n];

    let id = if head.starts_with(b"PK\x03\x04") || head.starts_with(b"PK\x05\x06") {
        Some("zip")
    } else if head.starts_with(b"\x1F\x8B") {
        Some("gz")
    } else if head.starts_with(b"BZh") {
        Some("bz2")
    } else if head.starts_with(b"\xFD7zXZ\x00") {
        Some("xz")
    } else if head.starts_with(b"\x28\xB5\x2F\xFD") {
        Some("zst")
    } else if head.starts_with(b"7z\xBC\xAF\x27\x1C") {
        Some("7z")
    } else if head.starts_with(b"Rar!") {
        Some("rar")
    } else if head.len() > 262 && &head[257..262] == b"ustar" {
        Some("tar")
    } else {
        None
    };

    Ok(id.map(|id| get_format(id).expect("sniffed id is registered")))
}

/// Resolves the format of an input archive: explicit id if given, else
/// extension inference, else magic bytes.
pub fn resolve_format(
    path: &Path,
    explicit: Option<&str>,
) -> Result<&'static FormatDescriptor, EngineError> {
    if let Some(id) = explicit {
        return get_format(id);
    }
    if let Some(desc) = infer_format(path) {
        return Ok(desc);
    }
    if let Some(desc) = sniff_format(path)? {
        return Ok(desc);
    }
    Err(EngineError::UnsupportedFormat(format!(
        "cannot determine archive format of '{}'",
        path.display()
    )))
}
