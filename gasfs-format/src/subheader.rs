//! Sub-header: a 32-byte record appearing both in the directory's
//! sub-header table and at the head of every slice file.

use std::time::SystemTime;

use gasfs_core::bytes::{
    read_bcd_date, read_u24, read_u32, read_u64, read_u8, read_uint_le, write_bcd_date, write_u24,
    write_u8, write_uint_le,
};
use gasfs_core::GasFsError;

use crate::version::{parse_sub_marker, Version};
use crate::SUB_HEADER_SIZE;

/// One slice's sub-header: identifies the slice, how many entries and
/// bytes it holds, its data CRC (GFS3 only has the field persisted and
/// meaningfully verified) and its last-modified date.
///
/// The `total_size` field is 32-bit on GFS2 and 64-bit on GFS3; the record
/// stays a fixed 32 bytes either way, with the unused tail zeroed as
/// reserved space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubHeader {
    /// Format generation this sub-header was written as.
    pub version: Version,
    /// 1-based slice number.
    pub slice_no: u8,
    /// Number of entries stored in this slice.
    pub files: u32,
    /// Byte length of the slice's data region (excludes this sub-header).
    pub total_size: u64,
    /// CRC-32 over the slice's data region.
    pub crc: u32,
    /// Slice's last-modified date (UTC), `max` over its entries' mtimes.
    pub date: SystemTime,
}

impl SubHeader {
    /// A sub-header that is entirely zero bytes: the placeholder the
    /// writer emits before streaming a slice's data, and the marker of an
    /// interrupted build on a subsequent incremental run (a zeroed marker
    /// fails to parse, forcing a rewrite).
    pub fn zeroed() -> [u8; SUB_HEADER_SIZE] {
        [0u8; SUB_HEADER_SIZE]
    }

    /// Parse a sub-header from exactly [`SUB_HEADER_SIZE`] bytes.
    pub fn read(buf: &[u8; SUB_HEADER_SIZE]) -> Result<Self, GasFsError> {
        let marker: [u8; 4] = buf[0..4].try_into().unwrap();
        let version = parse_sub_marker(&marker)?;

        let slice_no = read_u8(&buf[4..5]);
        let files = read_u24(&buf[5..8]);

        let width = version.sub_header_total_size_width();
        let total_size = read_uint_le(&buf[8..8 + width], width);

        let crc = read_u32(&buf[8 + width..8 + width + 4]);
        let date_bytes: [u8; 7] = buf[8 + width + 4..8 + width + 11].try_into().unwrap();
        let date = read_bcd_date(&date_bytes);

        Ok(SubHeader {
            version,
            slice_no,
            files,
            total_size,
            crc,
            date,
        })
    }

    /// Serialise this sub-header into exactly [`SUB_HEADER_SIZE`] bytes.
    pub fn write(&self) -> [u8; SUB_HEADER_SIZE] {
        let mut buf = [0u8; SUB_HEADER_SIZE];
        buf[0..3].copy_from_slice(b"gFS");
        write_u8(&mut buf[3..4], self.version.byte());
        write_u8(&mut buf[4..5], self.slice_no);
        write_u24(&mut buf[5..8], self.files);

        let width = self.version.sub_header_total_size_width();
        write_uint_le(&mut buf[8..8 + width], width, self.total_size);

        let crc_start = 8 + width;
        buf[crc_start..crc_start + 4].copy_from_slice(&self.crc.to_le_bytes());

        let mut date_bytes = [0u8; 7];
        write_bcd_date(&mut date_bytes, self.date);
        buf[crc_start + 4..crc_start + 11].copy_from_slice(&date_bytes);

        // Remaining bytes stay zeroed reserved space.
        buf
    }

    /// Byte-compare two sub-headers as they would be serialised, which is
    /// the cross-check the directory performs against each slice file's
    /// on-disk sub-header.
    pub fn matches_bytes(&self, other: &Self) -> bool {
        self.write() == other.write()
    }
}
