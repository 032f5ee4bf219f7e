//! Extractor (C8, extract half): materialise selected entries onto a
//! filesystem, creating missing parent directories as needed and restoring
//! each file's mtime from its slice's sub-header date.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use filetime::FileTime;
use gasfs_core::GasFsError;
use gasfs_format::SUB_HEADER_SIZE;

use crate::progress::ProgressSink;
use crate::reader::ParsedArchive;

/// Size of the buffer used when copying an entry's data to its
/// destination file.
const COPY_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Extract every entry whose logical path starts with one of `filters`
/// (OR-combined; an empty filter list matches everything) into
/// `extract_dir`. If `slice_filter` is set, only entries stored in that
/// slice are considered.
///
/// Creates missing parent directories for each destination path. Unless
/// `skip_check_crc`, verifies each touched slice's data CRC before
/// extracting from it. `progress`, if given, is advanced by one unit per
/// entry extracted.
pub fn extract(
    archive: &ParsedArchive,
    filters: &[String],
    extract_dir: &Path,
    skip_check_crc: bool,
    slice_filter: Option<u8>,
    progress: Option<&dyn ProgressSink>,
) -> Result<(), GasFsError> {
    let matching: Vec<(&String, &gasfs_format::EntryRecord)> = archive
        .entries
        .iter()
        .filter(|(path, entry)| {
            matches_any_prefix(path, filters) && slice_filter.is_none_or(|s| s == entry.slice)
        })
        .collect();

    let mut verified_slices = std::collections::BTreeSet::new();

    for (path, entry) in matching {
        if !skip_check_crc && !verified_slices.contains(&entry.slice) {
            let sub_header = archive.verify_slice_header(entry.slice)?;
            archive.verify_slice_crc(entry.slice, &sub_header)?;
            verified_slices.insert(entry.slice);
        }

        let slice_path = archive.slice_file_path(entry.slice);
        let mut slice_file =
            File::open(&slice_path).map_err(|e| GasFsError::io(slice_path.clone(), e))?;
        slice_file
            .seek(SeekFrom::Start(SUB_HEADER_SIZE as u64 + entry.offset))
            .map_err(|e| GasFsError::io(slice_path.clone(), e))?;

        let dest_path = safe_join(extract_dir, path)?;
        if let Some(parent) = dest_path.parent() {
            create_dir_all_missing(parent)?;
        }
        let mut dest_file =
            File::create(&dest_path).map_err(|e| GasFsError::io(dest_path.clone(), e))?;

        let mut remaining = entry.size;
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        while remaining > 0 {
            let chunk = remaining.min(buffer.len() as u64) as usize;
            slice_file
                .read_exact(&mut buffer[..chunk])
                .map_err(|e| GasFsError::io(slice_path.clone(), e))?;
            dest_file
                .write_all(&buffer[..chunk])
                .map_err(|e| GasFsError::io(dest_path.clone(), e))?;
            remaining -= chunk as u64;
        }
        drop(dest_file);

        if let Some(sub_header) = archive.sub_headers.get(entry.slice as usize - 1) {
            let mtime = FileTime::from_system_time(sub_header.date);
            let _ = filetime::set_file_mtime(&dest_path, mtime);
        }

        if let Some(sink) = progress {
            sink.inc(1);
        }
    }

    Ok(())
}

/// Whether `path` starts with at least one of `filters` (or `filters` is
/// empty, matching everything).
pub fn matches_any_prefix(path: &str, filters: &[String]) -> bool {
    filters.is_empty() || filters.iter().any(|f| path.starts_with(f.as_str()))
}

/// Join a directory entry's logical path onto `extract_dir`, rejecting any
/// path that would escape it via `..` or an absolute/rooted component.
fn safe_join(extract_dir: &Path, logical_path: &str) -> Result<std::path::PathBuf, GasFsError> {
    use std::path::Component;

    let mut dest = extract_dir.to_path_buf();
    for component in Path::new(logical_path).components() {
        match component {
            Component::Normal(part) => dest.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(GasFsError::ArchiveCorrupt(format!(
                    "entry path escapes the extraction directory: {logical_path}"
                )));
            }
        }
    }
    Ok(dest)
}

/// Walk `dir`'s path components and create each level whose `stat`
/// returns not-found.
fn create_dir_all_missing(dir: &Path) -> Result<(), GasFsError> {
    if dir.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| GasFsError::io(dir.to_path_buf(), e))
}
