//! Main header: the first 32 bytes of every directory file.

use std::time::SystemTime;

use gasfs_core::bytes::{
    read_bcd_date, read_u24, read_u32, read_u8, write_bcd_date, write_u24, write_u32, write_u8,
};
use gasfs_core::GasFsError;

use crate::version::{parse_main_marker, Version};
use crate::MAIN_HEADER_SIZE;

/// The 32-byte main header at the start of every directory (`_000.gfs`)
/// file.
///
/// Field layout: `marker[3]="GFS"`, `version[1]`, `slices[1]`, `entries[3]`,
/// `total_size[4]`, `max_slice_size[4]`, `crc[4]`, `date[7 BCD]`,
/// `reserved[5]`. The specification's prose lists a 6-byte reserved tail,
/// which would make the record 33 bytes; since the record is elsewhere
/// stated to be a fixed 32 bytes (matching the sub-header), the reserved
/// field is sized to 5 bytes here and always written as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainHeader {
    /// Format generation.
    pub version: Version,
    /// Number of slices in the archive, 1..=255.
    pub slices: u8,
    /// Total number of entries across all slices.
    pub entries: u32,
    /// Byte length of everything after this header (sub-header table +
    /// entry array + path blob).
    pub total_size: u32,
    /// Configured maximum slice size, in mebibytes.
    pub max_slice_size: u32,
    /// CRC-32 over the post-header region. Only meaningful for GFS3
    /// (`Version::has_archive_crc`); zero otherwise.
    pub crc: u32,
    /// Archive build timestamp (UTC).
    pub date: SystemTime,
}

impl MainHeader {
    /// Parse a main header from exactly [`MAIN_HEADER_SIZE`] bytes.
    pub fn read(buf: &[u8; MAIN_HEADER_SIZE]) -> Result<Self, GasFsError> {
        let marker: [u8; 4] = buf[0..4].try_into().unwrap();
        let version = parse_main_marker(&marker)?;

        let slices = read_u8(&buf[4..5]);
        let entries = read_u24(&buf[5..8]);
        let total_size = read_u32(&buf[8..12]);
        let max_slice_size = read_u32(&buf[12..16]);
        let crc = read_u32(&buf[16..20]);
        let date_bytes: [u8; 7] = buf[20..27].try_into().unwrap();
        let date = read_bcd_date(&date_bytes);

        Ok(MainHeader {
            version,
            slices,
            entries,
            total_size,
            max_slice_size,
            crc,
            date,
        })
    }

    /// Serialise this header into exactly [`MAIN_HEADER_SIZE`] bytes.
    pub fn write(&self) -> [u8; MAIN_HEADER_SIZE] {
        let mut buf = [0u8; MAIN_HEADER_SIZE];
        buf[0..3].copy_from_slice(b"GFS");
        write_u8(&mut buf[3..4], self.version.byte());
        write_u8(&mut buf[4..5], self.slices);
        write_u24(&mut buf[5..8], self.entries);
        write_u32(&mut buf[8..12], self.total_size);
        write_u32(&mut buf[12..16], self.max_slice_size);
        write_u32(&mut buf[16..20], self.crc);
        let mut date_bytes = [0u8; 7];
        write_bcd_date(&mut date_bytes, self.date);
        buf[20..27].copy_from_slice(&date_bytes);
        // buf[27..32] stays zeroed reserved space.
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn round_trips_through_bytes() {
        let header = MainHeader {
            version: Version::Gfs3,
            slices: 4,
            entries: 123,
            total_size: 4096,
            max_slice_size: 8,
            crc: 0xDEAD_BEEF,
            date: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        };

        let bytes = header.write();
        assert_eq!(bytes.len(), MAIN_HEADER_SIZE);
        assert_eq!(&bytes[0..4], b"GFS3");

        let parsed = MainHeader::read(&bytes).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn rejects_bad_marker() {
        let mut bytes = [0u8; MAIN_HEADER_SIZE];
        bytes[0..4].copy_from_slice(b"XXX9");
        assert!(MainHeader::read(&bytes).is_err());
    }
}
