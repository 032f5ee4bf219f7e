//! Incremental decision engine (C6): decide which slices (and whether the
//! directory) actually need rewriting for a given build.

use std::path::Path;
use std::time::SystemTime;

use gasfs_core::GasFsError;
use gasfs_format::subheader::SubHeader;
use gasfs_format::SUB_HEADER_SIZE;
use gasfs_manifest::Manifest;

use crate::model::{Global, PathMap};
use crate::reader::ParsedArchive;

/// What to do with a single slice on this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceAction {
    /// No slice file exists yet; write one from scratch.
    Create,
    /// The on-disk slice is newer than all of its entries' source files
    /// and parses cleanly; reuse it without touching the disk.
    Skip,
    /// The slice exists but is stale (or force is set); rewrite it.
    Rewrite,
}

/// The outcome of the incremental decision engine for one build.
#[derive(Debug, Clone)]
pub struct IncrementalPlan {
    /// The effective force flag (user-supplied or derived).
    pub force: bool,
    /// Per-slice action, indexed by `slice_no - 1`.
    pub actions: Vec<SliceAction>,
    /// Whether the directory file itself needs to be rewritten.
    pub rewrite_directory: bool,
}

impl IncrementalPlan {
    /// Whether any slice needs an actual write.
    pub fn any_slice_dirty(&self) -> bool {
        self.actions.iter().any(|a| *a != SliceAction::Skip)
    }
}

/// Derive the effective `force` flag and per-slice skip/rewrite decisions.
///
/// `old_archive` is `None` when no directory file exists yet. When a
/// slice can be skipped, its [`crate::model::SliceDescriptor`] in `global`
/// is populated from the on-disk sub-header (files/total_size/crc/date)
/// without recomputing anything.
pub fn plan(
    manifest: &Manifest,
    manifest_mtime: SystemTime,
    user_force: bool,
    new_path_map: &PathMap,
    global: &mut Global,
    old_archive: Option<&ParsedArchive>,
) -> Result<IncrementalPlan, GasFsError> {
    let slices_count = global.slices_count as usize;

    let mut force = user_force;
    if let Some(old) = old_archive {
        if old.main_header.slices != manifest.slices
            || old.main_header.max_slice_size != manifest.max_slice_size_mib
        {
            force = true;
        }
        if !force && path_maps_diverge(old, new_path_map) {
            force = true;
        }
        let directory_mtime = std::fs::metadata(&old.directory_path)
            .and_then(|m| m.modified())
            .map_err(|e| GasFsError::io(old.directory_path.clone(), e))?;
        if manifest_mtime > directory_mtime {
            force = true;
        }
    }

    let mut actions = Vec::with_capacity(slices_count);
    for slice_no in 1..=global.slices_count {
        let slice_path = global.slice(slice_no).filename.clone();

        if force {
            actions.push(SliceAction::Rewrite);
            continue;
        }

        if !slice_path.exists() {
            actions.push(SliceAction::Create);
            continue;
        }

        let t_slice = std::fs::metadata(&slice_path)
            .and_then(|m| m.modified())
            .map_err(|e| GasFsError::io(slice_path.clone(), e))?;
        let t_files = new_path_map
            .values()
            .filter(|e| e.slice_no == slice_no)
            .map(|e| e.last_modified_time)
            .max()
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let existing_sub_header = read_slice_sub_header(&slice_path).ok();

        if t_slice > t_files {
            if let Some(sub_header) = existing_sub_header {
                reuse_slice_descriptor(global, slice_no, &sub_header);
                actions.push(SliceAction::Skip);
                continue;
            }
        }
        actions.push(SliceAction::Rewrite);
    }

    let any_slice_dirty = actions.iter().any(|a| *a != SliceAction::Skip);
    let directory_stale = match old_archive {
        None => true,
        Some(old) => {
            let directory_mtime = std::fs::metadata(&old.directory_path)
                .and_then(|m| m.modified())
                .map_err(|e| GasFsError::io(old.directory_path.clone(), e))?;
            let max_slice_mtime = actions
                .iter()
                .enumerate()
                .filter_map(|(i, _)| {
                    std::fs::metadata(&global.slice((i + 1) as u8).filename)
                        .and_then(|m| m.modified())
                        .ok()
                })
                .max()
                .unwrap_or(SystemTime::UNIX_EPOCH);
            directory_mtime <= max_slice_mtime
        }
    };

    let rewrite_directory = any_slice_dirty || force || directory_stale;

    Ok(IncrementalPlan {
        force,
        actions,
        rewrite_directory,
    })
}

fn reuse_slice_descriptor(global: &mut Global, slice_no: u8, sub_header: &SubHeader) {
    let descriptor = global.slice_mut(slice_no);
    descriptor.files_count = sub_header.files;
    descriptor.total_size = sub_header.total_size;
    descriptor.crc32 = sub_header.crc;
    descriptor.last_modified_time = sub_header.date;
}

/// Read and parse just a slice file's own sub-header (no cross-check
/// against any directory), to test whether it "parses cleanly with
/// correct marker".
fn read_slice_sub_header(path: &Path) -> Result<SubHeader, GasFsError> {
    use std::io::Read;
    let mut file = std::fs::File::open(path).map_err(|e| GasFsError::io(path.to_path_buf(), e))?;
    let mut bytes = [0u8; SUB_HEADER_SIZE];
    file.read_exact(&mut bytes)
        .map_err(|e| GasFsError::io(path.to_path_buf(), e))?;
    SubHeader::read(&bytes)
}

/// Whether the old archive's path→slice map differs in cardinality, or in
/// any `(path, slice_no)` pair, from the newly allocated map.
fn path_maps_diverge(old: &ParsedArchive, new_path_map: &PathMap) -> bool {
    if old.entries.len() != new_path_map.len() {
        return true;
    }
    old.entries.iter().zip(new_path_map.iter()).any(
        |((old_path, old_entry), (new_path, new_entry))| {
            old_path != new_path || old_entry.slice != new_entry.slice_no
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{slice_path, Entry, SliceDescriptor};
    use std::collections::BTreeMap;

    fn sample_manifest() -> Manifest {
        Manifest {
            slices: 1,
            max_slice_size_mib: 1,
            input_paths: vec!["a/".to_string()],
            pins: BTreeMap::new(),
        }
    }

    fn sample_global(dir: &std::path::Path) -> Global {
        Global {
            entries_count: 0,
            slices_count: 1,
            max_slice_size_mib: 1,
            last_modified_time: SystemTime::UNIX_EPOCH,
            archive_base: dir.join("out"),
            input_base_dir: dir.to_path_buf(),
            force: false,
            skip_check_crc: false,
            slices: vec![SliceDescriptor::empty(
                1,
                slice_path(&dir.join("out"), 1),
                SystemTime::UNIX_EPOCH,
            )],
        }
    }

    #[test]
    fn missing_directory_forces_create_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = sample_manifest();
        let mut global = sample_global(dir.path());
        let path_map = PathMap::new();

        let result = plan(
            &manifest,
            SystemTime::UNIX_EPOCH,
            false,
            &path_map,
            &mut global,
            None,
        )
        .unwrap();

        assert_eq!(result.actions, vec![SliceAction::Create]);
        assert!(result.rewrite_directory);
    }

    #[test]
    fn user_force_rewrites_every_slice() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = sample_manifest();
        let mut global = sample_global(dir.path());
        let mut path_map = PathMap::new();
        path_map.insert(
            "a/x".to_string(),
            Entry {
                slice_no: 1,
                offset: 0,
                size: 1,
                last_modified_time: SystemTime::UNIX_EPOCH,
            },
        );

        let result = plan(
            &manifest,
            SystemTime::UNIX_EPOCH,
            true,
            &path_map,
            &mut global,
            None,
        )
        .unwrap();

        assert!(result.force);
        assert_eq!(result.actions, vec![SliceAction::Rewrite]);
        assert!(result.rewrite_directory);
    }
}
