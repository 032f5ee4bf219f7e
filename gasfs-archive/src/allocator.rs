//! Slice allocator (C5): two-phase bin packing — pinned placement, then
//! round-robin free-fill.

use std::collections::BTreeMap;

use gasfs_core::GasFsError;
use gasfs_manifest::manifest::PinSection;

use crate::model::{Entry, PathMap};
use crate::traversal::InputFile;

/// Assign every entry in `inputs` to a slice, honouring `pins` first and
/// free-filling the rest round-robin starting at slice 1.
///
/// `budgets[i]` is the remaining byte budget for slice `i + 1`; on success
/// it reflects what is left after allocation. `no_add_free_file[i]` marks
/// slice `i + 1` as ineligible for free-fill (the `****` pin token).
pub fn allocate(
    slices_count: u8,
    budgets: &mut [i64],
    no_add_free_file: &mut [bool],
    inputs: BTreeMap<String, InputFile>,
    pins: &BTreeMap<u8, PinSection>,
) -> Result<PathMap, GasFsError> {
    assert_eq!(budgets.len(), slices_count as usize);
    assert_eq!(no_add_free_file.len(), slices_count as usize);

    let mut remaining_inputs = inputs;
    let mut assigned: BTreeMap<String, (u8, u64, std::time::SystemTime)> = BTreeMap::new();

    // Phase A: pinned placement.
    for (&slice_no, pin) in pins {
        if slice_no == 0 || slice_no > slices_count {
            return Err(GasFsError::ManifestError(format!(
                "pin section [{slice_no:03}] names a slice outside the configured range 1..={slices_count}"
            )));
        }
        if pin.no_add_free_file {
            tracing::debug!(slice = slice_no, "slice closed to free-fill");
            no_add_free_file[slice_no as usize - 1] = true;
        }
        for path in &pin.paths {
            let Some(file) = remaining_inputs.remove(path) else {
                return Err(GasFsError::PinnedEntryMissing(path.clone()));
            };
            let idx = slice_no as usize - 1;
            budgets[idx] -= file.size as i64;
            if budgets[idx] < 0 {
                return Err(GasFsError::SliceOverflow {
                    slice: slice_no,
                    path: path.clone(),
                });
            }
            tracing::debug!(slice = slice_no, path = %path, size = file.size, "pinned placement");
            assigned.insert(path.clone(), (slice_no, file.size, file.mtime));
        }
    }

    // Phase B: round-robin free fill, over the remaining entries in
    // sorted-path order (the BTreeMap's natural iteration order).
    let mut cursor: u8 = 1;
    for (path, file) in remaining_inputs {
        let size = file.size as i64;
        let mut placed = None;
        for step in 0..slices_count {
            let candidate = ((cursor - 1 + step) % slices_count) + 1;
            let idx = candidate as usize - 1;
            if !no_add_free_file[idx] && budgets[idx] >= size {
                budgets[idx] -= size;
                placed = Some(candidate);
                break;
            }
        }
        let Some(slice_no) = placed else {
            tracing::warn!(path = %path, size = file.size, "no slice has room for this entry");
            return Err(GasFsError::InsufficientSlices {
                path: path.clone(),
                size: file.size,
            });
        };
        tracing::debug!(slice = slice_no, path = %path, size = file.size, "free-fill placement");
        assigned.insert(path, (slice_no, file.size, file.mtime));
        cursor = (slice_no % slices_count) + 1;
    }

    // Resolve per-slice offsets: contiguous, in sorted-path order, among
    // entries assigned to the same slice.
    let mut next_offset = vec![0u64; slices_count as usize];
    let mut path_map = PathMap::new();
    for (path, (slice_no, size, mtime)) in assigned {
        let idx = slice_no as usize - 1;
        let offset = next_offset[idx];
        next_offset[idx] += size;
        path_map.insert(
            path,
            Entry {
                slice_no,
                offset,
                size,
                last_modified_time: mtime,
            },
        );
    }

    Ok(path_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn input(size: u64) -> InputFile {
        InputFile {
            size,
            mtime: SystemTime::UNIX_EPOCH,
        }
    }

    /// A single slice with two files lays them out at contiguous offsets,
    /// in path order.
    #[test]
    fn single_slice_lays_out_contiguous_offsets() {
        let mut inputs = BTreeMap::new();
        inputs.insert("a/x".to_string(), input(5));
        inputs.insert("a/y".to_string(), input(6));

        let mut budgets = [1024i64];
        let mut no_add = [false];
        let map = allocate(1, &mut budgets, &mut no_add, inputs, &BTreeMap::new()).unwrap();

        assert_eq!(map["a/x"].offset, 0);
        assert_eq!(map["a/x"].size, 5);
        assert_eq!(map["a/y"].offset, 5);
        assert_eq!(map["a/y"].size, 6);
    }

    /// A pinned path always lands in its named slice, ahead of free-fill.
    #[test]
    fn pinned_path_takes_precedence_over_free_fill() {
        let mut inputs = BTreeMap::new();
        inputs.insert("pin.bin".to_string(), input(3));
        inputs.insert("free.bin".to_string(), input(3));

        let mut pins = BTreeMap::new();
        pins.insert(
            1,
            PinSection {
                paths: vec!["pin.bin".to_string()],
                no_add_free_file: false,
            },
        );

        let mut budgets = [1024i64, 1024i64];
        let mut no_add = [false, false];
        let map = allocate(2, &mut budgets, &mut no_add, inputs, &pins).unwrap();

        assert_eq!(map["pin.bin"].slice_no, 1);
        assert_eq!(map["free.bin"].slice_no, 2);
    }

    /// A `****` pinned slice never receives free-fill entries.
    #[test]
    fn no_add_free_file_slice_is_skipped_by_free_fill() {
        let mut inputs = BTreeMap::new();
        inputs.insert("a".to_string(), input(1));
        inputs.insert("b".to_string(), input(1));
        inputs.insert("c".to_string(), input(1));

        let mut pins = BTreeMap::new();
        pins.insert(
            2,
            PinSection {
                paths: vec![],
                no_add_free_file: true,
            },
        );

        let mut budgets = [1024i64, 1024i64];
        let mut no_add = [false, false];
        let map = allocate(2, &mut budgets, &mut no_add, inputs, &pins).unwrap();

        assert!(map.values().all(|e| e.slice_no == 1));
    }

    #[test]
    fn pinned_missing_input_fails() {
        let inputs = BTreeMap::new();
        let mut pins = BTreeMap::new();
        pins.insert(
            1,
            PinSection {
                paths: vec!["ghost".to_string()],
                no_add_free_file: false,
            },
        );
        let mut budgets = [1024i64];
        let mut no_add = [false];
        let result = allocate(1, &mut budgets, &mut no_add, inputs, &pins);
        assert!(matches!(result, Err(GasFsError::PinnedEntryMissing(_))));
    }

    #[test]
    fn pin_naming_a_slice_outside_the_configured_range_is_rejected() {
        let mut inputs = BTreeMap::new();
        inputs.insert("a".to_string(), input(5));
        let mut pins = BTreeMap::new();
        pins.insert(
            5,
            PinSection {
                paths: vec!["a".to_string()],
                no_add_free_file: false,
            },
        );
        let mut budgets = [1024i64, 1024i64];
        let mut no_add = [false, false];
        let result = allocate(2, &mut budgets, &mut no_add, inputs, &pins);
        assert!(matches!(result, Err(GasFsError::ManifestError(_))));
    }

    #[test]
    fn insufficient_slices_is_reported() {
        let mut inputs = BTreeMap::new();
        inputs.insert("big".to_string(), input(100));
        let mut budgets = [10i64];
        let mut no_add = [false];
        let result = allocate(1, &mut budgets, &mut no_add, inputs, &BTreeMap::new());
        assert!(matches!(result, Err(GasFsError::InsufficientSlices { .. })));
    }

    #[test]
    fn free_fill_cursor_advances_round_robin() {
        let mut inputs = BTreeMap::new();
        inputs.insert("a".to_string(), input(5));
        inputs.insert("b".to_string(), input(5));
        inputs.insert("c".to_string(), input(5));

        let mut budgets = [5i64, 5i64, 5i64];
        let mut no_add = [false, false, false];
        let map = allocate(3, &mut budgets, &mut no_add, inputs, &BTreeMap::new()).unwrap();

        let mut slices: Vec<u8> = map.values().map(|e| e.slice_no).collect();
        slices.sort_unstable();
        assert_eq!(slices, [1, 2, 3]);
    }
}
