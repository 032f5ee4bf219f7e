//! Error types shared across the gasfs crates.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the gasfs crates.
pub type Result<T> = std::result::Result<T, GasFsError>;

/// Every way building, reading or extracting a gasfs archive can fail.
///
/// All variants are fatal in the sense that gasfs never retries or attempts
/// a partial recovery: the caller gets a clear error and the on-disk state
/// is left exactly as it was (see the writer's lack of atomic replacement).
#[derive(Debug, Error)]
pub enum GasFsError {
    /// Failure of an underlying filesystem operation (open/read/write/seek/
    /// stat/mkdir).
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path of the file the failing operation was performed on.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A manifest-listed input path prefix does not exist under the base
    /// directory.
    #[error("input path not found: {0}")]
    PathNotFound(PathBuf),

    /// The directory file's marker bytes are not a recognised gasfs marker.
    #[error("not a gasfs archive: {0}")]
    NotArchive(PathBuf),

    /// The directory file's recorded `total_size` or archive CRC does not
    /// match what was actually read.
    #[error("archive corrupt: {0}")]
    ArchiveCorrupt(String),

    /// A slice file's on-disk sub-header does not byte-match the directory
    /// file's copy of that sub-header.
    #[error("slice {slice} sub-header does not match directory: {detail}")]
    SliceMismatch {
        /// 1-based slice number.
        slice: u8,
        /// Human-readable description of the mismatch.
        detail: String,
    },

    /// A slice's recomputed data CRC does not match the CRC recorded in its
    /// sub-header.
    #[error("slice {slice} data CRC mismatch (stored {stored:#010x}, computed {computed:#010x})")]
    SliceCrcMismatch {
        /// 1-based slice number.
        slice: u8,
        /// CRC recorded in the sub-header.
        stored: u32,
        /// CRC recomputed from the slice's data region.
        computed: u32,
    },

    /// A manifest pinned a path to a slice, but the path does not appear in
    /// the traversed input map (usually because it was pinned twice).
    #[error("pinned entry missing from input set: {0}")]
    PinnedEntryMissing(String),

    /// A pinned entry did not fit inside its slice's budget.
    #[error("slice {slice} overflowed its budget placing {path}")]
    SliceOverflow {
        /// 1-based slice number.
        slice: u8,
        /// The path that overflowed the slice.
        path: String,
    },

    /// Free-fill could not find any slice with enough remaining budget for
    /// an entry.
    #[error("no slice has room for {path} ({size} bytes)")]
    InsufficientSlices {
        /// The path that could not be placed.
        path: String,
        /// The entry's size in bytes.
        size: u64,
    },

    /// The manifest file failed to parse.
    #[error("manifest error: {0}")]
    ManifestError(String),

    /// Failed to serialize a JSON listing.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GasFsError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_displays_path() {
        let err = GasFsError::io(
            "missing.gfs",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        let msg = err.to_string();
        assert!(msg.contains("missing.gfs"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn slice_crc_mismatch_formats_hex() {
        let err = GasFsError::SliceCrcMismatch {
            slice: 2,
            stored: 0xD202_EF8D,
            computed: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("0xd202ef8d"));
        assert!(msg.contains("slice 2"));
    }

    #[test]
    fn path_not_found_keeps_path() {
        let err = GasFsError::PathNotFound(PathBuf::from("a/missing"));
        assert_eq!(err.to_string(), "input path not found: a/missing");
    }
}
