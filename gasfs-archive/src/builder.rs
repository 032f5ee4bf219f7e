//! Top-level build orchestration: ties traversal (C4), allocation (C5),
//! the incremental decision engine (C6) and the writer (C7) together into
//! the single operation `mkgasfs` performs.

use std::path::PathBuf;
use std::time::SystemTime;

use gasfs_core::GasFsError;
use gasfs_manifest::Manifest;

use crate::incremental::{self, SliceAction};
use crate::model::{slice_budget, slice_path, Global, SliceDescriptor};
use crate::progress::ProgressSink;
use crate::reader::ParsedArchive;
use crate::{allocator, traversal, writer};

/// Outcome of a build: the final archive descriptor plus which slices
/// were actually touched, for reporting (`--verbose`).
#[derive(Debug)]
pub struct BuildReport {
    /// The archive descriptor as it stands after the build.
    pub global: Global,
    /// Per-slice action taken, indexed by `slice_no - 1`.
    pub slice_actions: Vec<SliceAction>,
    /// Whether the directory file was rewritten.
    pub directory_rewritten: bool,
}

/// Build (or incrementally rebuild) an archive from `manifest`.
///
/// `progress`, if given, is advanced by one unit for every entry copied
/// into a rewritten slice.
pub fn build(
    manifest: &Manifest,
    manifest_mtime: SystemTime,
    archive_base: PathBuf,
    input_base_dir: PathBuf,
    user_force: bool,
    skip_check_crc: bool,
    progress: Option<&dyn ProgressSink>,
) -> Result<BuildReport, GasFsError> {
    let inputs = traversal::traverse(&input_base_dir, &manifest.input_paths)?;

    let slices_count = manifest.slices;
    let per_slice_budget = slice_budget(manifest.max_slice_size_mib)?;
    let mut budgets = vec![per_slice_budget as i64; slices_count as usize];
    let mut no_add_free_file = vec![false; slices_count as usize];

    let path_map = allocator::allocate(
        slices_count,
        &mut budgets,
        &mut no_add_free_file,
        inputs,
        &manifest.pins,
    )?;

    let mut slices = Vec::with_capacity(slices_count as usize);
    for slice_no in 1..=slices_count {
        let mut descriptor = SliceDescriptor::empty(
            slice_no,
            slice_path(&archive_base, slice_no),
            SystemTime::UNIX_EPOCH,
        );
        descriptor.no_add_free_file = no_add_free_file[slice_no as usize - 1];
        slices.push(descriptor);
    }

    let mut global = Global {
        entries_count: path_map.len() as u32,
        slices_count,
        max_slice_size_mib: manifest.max_slice_size_mib,
        last_modified_time: SystemTime::now(),
        archive_base,
        input_base_dir,
        force: user_force,
        skip_check_crc,
        slices,
    };

    let directory_path = global.directory_path();
    let old_archive = if directory_path.exists() {
        Some(ParsedArchive::open(&directory_path)?)
    } else {
        None
    };

    let plan = incremental::plan(
        manifest,
        manifest_mtime,
        user_force,
        &path_map,
        &mut global,
        old_archive.as_ref(),
    )?;

    for (i, action) in plan.actions.iter().enumerate() {
        let slice_no = (i + 1) as u8;
        if *action != SliceAction::Skip {
            tracing::debug!(slice = slice_no, ?action, "rewriting slice");
            writer::write_slice(&mut global, slice_no, &path_map, progress)?;
        } else {
            tracing::debug!(slice = slice_no, "skipping up-to-date slice");
        }
    }

    if plan.rewrite_directory {
        tracing::debug!("rewriting directory file");
        writer::write_directory(&global, &path_map)?;
    }

    Ok(BuildReport {
        global,
        slice_actions: plan.actions,
        directory_rewritten: plan.rewrite_directory,
    })
}
