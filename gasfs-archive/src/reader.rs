//! Reader (C8, parse+verify half): parse a directory file into memory and
//! verify its structural integrity.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use gasfs_core::crc::Crc32;
use gasfs_core::GasFsError;
use gasfs_format::entry::{pack_entries, read_path_at, EntryRecord};
use gasfs_format::header::MainHeader;
use gasfs_format::subheader::SubHeader;
use gasfs_format::version::Version;
use gasfs_format::{ENTRY_RECORD_SIZE, MAIN_HEADER_SIZE, SUB_HEADER_SIZE};

use crate::model::slice_path;

/// A fully parsed and structurally verified directory file.
#[derive(Debug, Clone)]
pub struct ParsedArchive {
    /// Path of the directory (`_000.gfs`) file this was parsed from.
    pub directory_path: PathBuf,
    /// Archive base path (directory path with the `_000.gfs` suffix
    /// stripped).
    pub base: PathBuf,
    /// The parsed main header.
    pub main_header: MainHeader,
    /// The directory's copy of every slice's sub-header, indexed by
    /// `slice_no - 1`. Empty for [`Version::Gfs1`], which has no
    /// persisted sub-header table.
    pub sub_headers: Vec<SubHeader>,
    /// Logical path → entry record.
    pub entries: BTreeMap<String, EntryRecord>,
}

impl ParsedArchive {
    /// Read and structurally verify a directory file.
    ///
    /// Verifies the marker always, and (for GFS3 only, which is the only
    /// generation that carries them) the archive-level `total_size` and
    /// CRC. Does not touch slice files; see [`ParsedArchive::verify_slice`].
    pub fn open(directory_path: &Path) -> Result<Self, GasFsError> {
        let buf = std::fs::read(directory_path)
            .map_err(|e| GasFsError::io(directory_path.to_path_buf(), e))?;

        if buf.len() < MAIN_HEADER_SIZE {
            return Err(GasFsError::NotArchive(directory_path.to_path_buf()));
        }
        let header_bytes: [u8; MAIN_HEADER_SIZE] = buf[0..MAIN_HEADER_SIZE].try_into().unwrap();
        let main_header = MainHeader::read(&header_bytes)
            .map_err(|_| GasFsError::NotArchive(directory_path.to_path_buf()))?;

        let post_header = &buf[MAIN_HEADER_SIZE..];
        if main_header.version.has_archive_total_size()
            && post_header.len() as u64 != main_header.total_size as u64
        {
            tracing::warn!(
                path = %directory_path.display(),
                header_total_size = main_header.total_size,
                region_len = post_header.len(),
                "archive total_size mismatch"
            );
            return Err(GasFsError::ArchiveCorrupt(format!(
                "total_size mismatch: header says {}, region is {} bytes",
                main_header.total_size,
                post_header.len()
            )));
        }
        if main_header.version.has_archive_crc() {
            let computed = gasfs_core::crc::update(0, post_header);
            if computed != main_header.crc {
                tracing::warn!(
                    path = %directory_path.display(),
                    stored = main_header.crc,
                    computed,
                    "archive CRC mismatch"
                );
                return Err(GasFsError::ArchiveCorrupt(format!(
                    "archive CRC mismatch: header says {:#010x}, computed {:#010x}",
                    main_header.crc, computed
                )));
            }
        }

        let mut cursor = 0usize;
        let mut sub_headers = Vec::new();
        if main_header.version.has_sub_headers() {
            for _ in 0..main_header.slices {
                let bytes: [u8; SUB_HEADER_SIZE] = post_header[cursor..cursor + SUB_HEADER_SIZE]
                    .try_into()
                    .unwrap();
                sub_headers.push(SubHeader::read(&bytes)?);
                cursor += SUB_HEADER_SIZE;
            }
        }

        let entry_array_len = main_header.entries as usize * ENTRY_RECORD_SIZE;
        let entry_bytes = &post_header[cursor..cursor + entry_array_len];
        cursor += entry_array_len;
        let path_blob = &post_header[cursor..];

        let mut entries = BTreeMap::new();
        for chunk in entry_bytes.chunks_exact(ENTRY_RECORD_SIZE) {
            let record = EntryRecord::read(chunk.try_into().unwrap());
            let path = read_path_at(path_blob, record.path_offset).ok_or_else(|| {
                GasFsError::ArchiveCorrupt(format!(
                    "entry path offset {} out of bounds",
                    record.path_offset
                ))
            })?;
            entries.insert(path.to_string(), record);
        }

        let base = strip_directory_suffix(directory_path);

        Ok(ParsedArchive {
            directory_path: directory_path.to_path_buf(),
            base,
            main_header,
            sub_headers,
            entries,
        })
    }

    /// Path of slice `slice_no` (1-based).
    pub fn slice_file_path(&self, slice_no: u8) -> PathBuf {
        slice_path(&self.base, slice_no)
    }

    /// Cross-check slice `slice_no`'s on-disk sub-header against the
    /// directory's copy, and (for GFS3) confirm its recorded
    /// `total_size` matches the file's actual length.
    pub fn verify_slice_header(&self, slice_no: u8) -> Result<SubHeader, GasFsError> {
        if !self.main_header.version.has_sub_headers() {
            return Err(GasFsError::SliceMismatch {
                slice: slice_no,
                detail: format!(
                    "{:?} archives carry no sub-header table to verify against",
                    self.main_header.version
                ),
            });
        }

        let path = self.slice_file_path(slice_no);
        let mut file =
            std::fs::File::open(&path).map_err(|e| GasFsError::io(path.clone(), e))?;
        let mut bytes = [0u8; SUB_HEADER_SIZE];
        file.read_exact(&mut bytes)
            .map_err(|e| GasFsError::io(path.clone(), e))?;
        let on_disk = SubHeader::read(&bytes)?;

        let directory_copy = &self.sub_headers[slice_no as usize - 1];
        if !on_disk.matches_bytes(directory_copy) {
            tracing::warn!(slice = slice_no, "on-disk sub-header does not match directory's copy");
            return Err(GasFsError::SliceMismatch {
                slice: slice_no,
                detail: "on-disk sub-header does not match directory's copy".to_string(),
            });
        }

        if self.main_header.version == Version::Gfs3 {
            let file_size = std::fs::metadata(&path)
                .map_err(|e| GasFsError::io(path.clone(), e))?
                .len();
            let expected = file_size - SUB_HEADER_SIZE as u64;
            if on_disk.total_size != expected {
                tracing::warn!(
                    slice = slice_no,
                    stored = on_disk.total_size,
                    expected,
                    "slice total_size does not match file size"
                );
                return Err(GasFsError::SliceMismatch {
                    slice: slice_no,
                    detail: format!(
                        "stored total_size {} does not match file size minus sub-header ({})",
                        on_disk.total_size, expected
                    ),
                });
            }
        }

        Ok(on_disk)
    }

    /// Stream slice `slice_no`'s data region through CRC and compare
    /// against its sub-header's recorded CRC.
    pub fn verify_slice_crc(&self, slice_no: u8, sub_header: &SubHeader) -> Result<(), GasFsError> {
        let path = self.slice_file_path(slice_no);
        let mut file =
            std::fs::File::open(&path).map_err(|e| GasFsError::io(path.clone(), e))?;
        std::io::Seek::seek(&mut file, std::io::SeekFrom::Start(SUB_HEADER_SIZE as u64))
            .map_err(|e| GasFsError::io(path.clone(), e))?;

        let mut crc = Crc32::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file
                .read(&mut buf)
                .map_err(|e| GasFsError::io(path.clone(), e))?;
            if n == 0 {
                break;
            }
            crc.update(&buf[..n]);
        }
        let computed = crc.finalize();
        if computed != sub_header.crc {
            tracing::warn!(
                slice = slice_no,
                stored = sub_header.crc,
                computed,
                "slice data CRC mismatch"
            );
            return Err(GasFsError::SliceCrcMismatch {
                slice: slice_no,
                stored: sub_header.crc,
                computed,
            });
        }
        Ok(())
    }
}

/// Strip a trailing `_000.gfs` suffix (or `_NNN.gfs` for any NNN) from a
/// directory path to recover the archive base path.
fn strip_directory_suffix(directory_path: &Path) -> PathBuf {
    let file_name = directory_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stripped = file_name
        .strip_suffix("_000.gfs")
        .map(str::to_string)
        .unwrap_or(file_name);
    directory_path.with_file_name(stripped)
}

/// Build the post-header byte region (sub-header table + entry array +
/// path blob) that the directory's `total_size`/`crc` are computed over.
///
/// Exposed for the writer, which needs the identical layout to patch the
/// main header after writing.
pub fn build_post_header_region(
    sub_headers: &[SubHeader],
    ordered_entries: &[(EntryRecord, &str)],
) -> Vec<u8> {
    let mut region = Vec::new();
    for sub_header in sub_headers {
        region.extend_from_slice(&sub_header.write());
    }
    let (records, blob) = pack_entries(ordered_entries);
    region.extend_from_slice(&records);
    region.extend_from_slice(&blob);
    region
}
