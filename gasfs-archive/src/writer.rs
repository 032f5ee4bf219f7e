//! Writer (C7): stream entries into slice files and assemble the
//! directory file.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::time::SystemTime;

use gasfs_core::crc::Crc32;
use gasfs_core::GasFsError;
use gasfs_format::entry::EntryRecord;
use gasfs_format::header::MainHeader;
use gasfs_format::subheader::SubHeader;
use gasfs_format::version::Version;
use gasfs_format::SUB_HEADER_SIZE;

use crate::model::{Global, PathMap};
use crate::progress::ProgressSink;
use crate::reader::build_post_header_region;

/// Size of the buffer used to stream file data into slices.
const COPY_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Stream every entry assigned to `slice_no` into its slice file, in
/// path-sorted order, then patch in the finalised sub-header. Updates
/// `global`'s descriptor for this slice.
///
/// `progress`, if given, is advanced by one unit per entry copied.
pub fn write_slice(
    global: &mut Global,
    slice_no: u8,
    path_map: &PathMap,
    progress: Option<&dyn ProgressSink>,
) -> Result<(), GasFsError> {
    let slice_filename = global.slice(slice_no).filename.clone();
    let mut slice_file =
        File::create(&slice_filename).map_err(|e| GasFsError::io(slice_filename.clone(), e))?;

    // Zero-filled placeholder: if the process is interrupted before the
    // final fix-up write below, this marker fails to parse as a valid
    // sub-header, forcing a rewrite on the next build.
    slice_file
        .write_all(&SubHeader::zeroed())
        .map_err(|e| GasFsError::io(slice_filename.clone(), e))?;

    let mut crc = Crc32::new();
    let mut total_size: u64 = 0;
    let mut last_modified = SystemTime::UNIX_EPOCH;
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

    for (path, entry) in path_map.iter().filter(|(_, e)| e.slice_no == slice_no) {
        let source_path = global.input_base_dir.join(path);
        let mut source =
            File::open(&source_path).map_err(|e| GasFsError::io(source_path.clone(), e))?;

        let mut remaining = entry.size;
        while remaining > 0 {
            let chunk = remaining.min(buffer.len() as u64) as usize;
            source
                .read_exact(&mut buffer[..chunk])
                .map_err(|e| GasFsError::io(source_path.clone(), e))?;
            slice_file
                .write_all(&buffer[..chunk])
                .map_err(|e| GasFsError::io(slice_filename.clone(), e))?;
            crc.update(&buffer[..chunk]);
            remaining -= chunk as u64;
        }

        total_size += entry.size;
        if entry.last_modified_time > last_modified {
            last_modified = entry.last_modified_time;
        }
        if let Some(sink) = progress {
            sink.inc(1);
        }
    }

    let files_count = path_map
        .values()
        .filter(|e| e.slice_no == slice_no)
        .count() as u32;

    let sub_header = SubHeader {
        version: Version::Gfs3,
        slice_no,
        files: files_count,
        total_size,
        crc: crc.finalize(),
        date: last_modified,
    };

    slice_file
        .seek(SeekFrom::Start(0))
        .map_err(|e| GasFsError::io(slice_filename.clone(), e))?;
    slice_file
        .write_all(&sub_header.write())
        .map_err(|e| GasFsError::io(slice_filename.clone(), e))?;

    let descriptor = global.slice_mut(slice_no);
    descriptor.files_count = sub_header.files;
    descriptor.total_size = sub_header.total_size;
    descriptor.crc32 = sub_header.crc;
    descriptor.last_modified_time = sub_header.date;

    Ok(())
}

/// Assemble and write the directory (`_000.gfs`) file: main header,
/// sub-header table, entry array, path blob, with `total_size`/`crc`
/// patched in after the post-header region is computed.
pub fn write_directory(global: &Global, path_map: &PathMap) -> Result<(), GasFsError> {
    let sub_headers: Vec<SubHeader> = global
        .slices
        .iter()
        .map(|s| SubHeader {
            version: Version::Gfs3,
            slice_no: s.slice_no,
            files: s.files_count,
            total_size: s.total_size,
            crc: s.crc32,
            date: s.last_modified_time,
        })
        .collect();

    let ordered_entries: Vec<(EntryRecord, &str)> = path_map
        .iter()
        .map(|(path, entry)| {
            (
                EntryRecord {
                    slice: entry.slice_no,
                    path_offset: 0,
                    offset: entry.offset,
                    size: entry.size,
                },
                path.as_str(),
            )
        })
        .collect();

    let region = build_post_header_region(&sub_headers, &ordered_entries);
    let crc = gasfs_core::crc::update(0, &region);

    let main_header = MainHeader {
        version: Version::Gfs3,
        slices: global.slices_count,
        entries: path_map.len() as u32,
        total_size: region.len() as u32,
        max_slice_size: global.max_slice_size_mib,
        crc,
        date: global.last_modified_time,
    };

    let directory_path = global.directory_path();
    let mut file =
        File::create(&directory_path).map_err(|e| GasFsError::io(directory_path.clone(), e))?;
    file.write_all(&main_header.write())
        .map_err(|e| GasFsError::io(directory_path.clone(), e))?;
    file.write_all(&region)
        .map_err(|e| GasFsError::io(directory_path.clone(), e))?;

    debug_assert_eq!(
        region.len() as u64,
        (SUB_HEADER_SIZE * global.slices.len()) as u64
            + ordered_entries.len() as u64 * gasfs_format::ENTRY_RECORD_SIZE as u64
            + path_map.keys().map(|p| p.len() as u64 + 1).sum::<u64>()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{slice_path, SliceDescriptor};
    use std::time::SystemTime;

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

    /// Two files placed in the same slice land at contiguous offsets, and
    /// the resulting slice/directory files carry the expected markers and
    /// sizes.
    #[test]
    fn writes_slice_and_directory_at_contiguous_offsets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_x"), "hello").unwrap();
        std::fs::write(dir.path().join("a_y"), "world!").unwrap();

        let mut global = sample_global(dir.path());
        let mut path_map = PathMap::new();
        path_map.insert(
            "a/x".to_string(),
            crate::model::Entry {
                slice_no: 1,
                offset: 0,
                size: 5,
                last_modified_time: SystemTime::UNIX_EPOCH,
            },
        );
        path_map.insert(
            "a/y".to_string(),
            crate::model::Entry {
                slice_no: 1,
                offset: 5,
                size: 6,
                last_modified_time: SystemTime::UNIX_EPOCH,
            },
        );

        // Writer reads source files by logical path joined to the base
        // dir; give it files at those exact relative paths.
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("a/x"), "hello").unwrap();
        std::fs::write(dir.path().join("a/y"), "world!").unwrap();

        write_slice(&mut global, 1, &path_map, None).unwrap();
        assert_eq!(global.slice(1).total_size, 11);

        write_directory(&global, &path_map).unwrap();

        let directory_bytes = std::fs::read(global.directory_path()).unwrap();
        assert_eq!(&directory_bytes[0..4], b"GFS3");

        let slice_bytes = std::fs::read(slice_path(&global.archive_base, 1)).unwrap();
        assert_eq!(slice_bytes.len(), SUB_HEADER_SIZE + 11);
        assert_eq!(&slice_bytes[SUB_HEADER_SIZE..SUB_HEADER_SIZE + 5], b"hello");
        assert_eq!(&slice_bytes[SUB_HEADER_SIZE + 5..], b"world!");
    }
}
