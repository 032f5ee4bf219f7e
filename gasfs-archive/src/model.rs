//! In-memory archive descriptor: [`Global`] parameters, per-slice
//! [`SliceDescriptor`] metadata, and the path → [`Entry`] map.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

/// Ordered mapping of logical path to [`Entry`].
///
/// `BTreeMap` iterates in byte-wise key order, which is exactly the sorted
/// order the format requires for entry-array serialisation and per-slice
/// offset layout.
pub type PathMap = BTreeMap<String, Entry>;

/// One archived file: its slice assignment, its byte range within that
/// slice, and its source mtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// 1-based slice this entry's data lives in.
    pub slice_no: u8,
    /// Byte offset within the slice, measured from after the sub-header.
    pub offset: u64,
    /// Byte length of the entry's data.
    pub size: u64,
    /// Source file's last-modified time.
    pub last_modified_time: SystemTime,
}

/// Metadata for a single slice.
#[derive(Debug, Clone)]
pub struct SliceDescriptor {
    /// 1-based slice number.
    pub slice_no: u8,
    /// Number of entries assigned to this slice.
    pub files_count: u32,
    /// Sum of the sizes of this slice's entries.
    pub total_size: u64,
    /// CRC-32 over the slice's data region; populated by the writer (for
    /// rewritten slices) or copied from the on-disk sub-header (for
    /// skipped slices).
    pub crc32: u32,
    /// Max over this slice's entries' mtimes (or the reused on-disk
    /// sub-header's date, if skipped).
    pub last_modified_time: SystemTime,
    /// Whether free-fill is forbidden from placing anything in this slice.
    pub no_add_free_file: bool,
    /// The slice's on-disk filename, e.g. `out_001.gfs`.
    pub filename: PathBuf,
}

impl SliceDescriptor {
    /// A fresh, empty descriptor for slice `slice_no`.
    pub fn empty(slice_no: u8, filename: PathBuf, epoch: SystemTime) -> Self {
        SliceDescriptor {
            slice_no,
            files_count: 0,
            total_size: 0,
            crc32: 0,
            last_modified_time: epoch,
            no_add_free_file: false,
            filename,
        }
    }
}

/// Archive-wide configuration and slice table.
#[derive(Debug, Clone)]
pub struct Global {
    /// Total number of entries across all slices.
    pub entries_count: u32,
    /// Number of slices, 1..=255.
    pub slices_count: u8,
    /// Configured maximum slice size, in mebibytes.
    pub max_slice_size_mib: u32,
    /// Archive build timestamp.
    pub last_modified_time: SystemTime,
    /// Archive base filename (without the `_NNN.gfs` suffix).
    pub archive_base: PathBuf,
    /// Base directory input paths are resolved relative to.
    pub input_base_dir: PathBuf,
    /// Whether the caller requested an unconditional rebuild.
    pub force: bool,
    /// Whether slice data CRC verification should be skipped on extract.
    pub skip_check_crc: bool,
    /// Per-slice metadata, indexed by `slice_no - 1`.
    pub slices: Vec<SliceDescriptor>,
}

/// Per-slice byte budget: `max_slice_size_mib * 2^20 - sizeof(SubHeader)`.
///
/// Errors if the configured slice size can't even hold a sub-header.
pub fn slice_budget(max_slice_size_mib: u32) -> Result<u64, gasfs_core::GasFsError> {
    let bytes = (max_slice_size_mib as u64) * (1 << 20);
    bytes
        .checked_sub(gasfs_format::SUB_HEADER_SIZE as u64)
        .ok_or_else(|| {
            gasfs_core::GasFsError::ManifestError(format!(
                "MaxSliceSize={max_slice_size_mib} MiB is too small to hold a sub-header"
            ))
        })
}

impl Global {
    /// Per-slice byte budget: `max_slice_size_mib * 2^20 - sizeof(SubHeader)`.
    pub fn slice_budget(&self) -> Result<u64, gasfs_core::GasFsError> {
        slice_budget(self.max_slice_size_mib)
    }

    /// Mutable access to a slice descriptor by 1-based slice number.
    pub fn slice_mut(&mut self, slice_no: u8) -> &mut SliceDescriptor {
        &mut self.slices[slice_no as usize - 1]
    }

    /// Immutable access to a slice descriptor by 1-based slice number.
    pub fn slice(&self, slice_no: u8) -> &SliceDescriptor {
        &self.slices[slice_no as usize - 1]
    }

    /// The on-disk path of the directory (`_000.gfs`) file.
    pub fn directory_path(&self) -> PathBuf {
        slice_path(&self.archive_base, 0)
    }
}

/// Compute `<base>_NNN.gfs` for slice number `slice_no` (`0` for the
/// directory file).
pub fn slice_path(base: &std::path::Path, slice_no: u8) -> PathBuf {
    let mut name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(&format!("_{slice_no:03}.gfs"));
    base.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_path_zero_pads() {
        let base = PathBuf::from("/tmp/out");
        assert_eq!(slice_path(&base, 0), PathBuf::from("/tmp/out_000.gfs"));
        assert_eq!(slice_path(&base, 7), PathBuf::from("/tmp/out_007.gfs"));
        assert_eq!(slice_path(&base, 123), PathBuf::from("/tmp/out_123.gfs"));
    }

    #[test]
    fn slice_budget_subtracts_sub_header_size() {
        let budget = slice_budget(1).unwrap();
        assert_eq!(budget, (1u64 << 20) - gasfs_format::SUB_HEADER_SIZE as u64);
    }

    #[test]
    fn slice_budget_rejects_a_size_too_small_for_a_sub_header() {
        assert!(slice_budget(0).is_err());
    }
}
