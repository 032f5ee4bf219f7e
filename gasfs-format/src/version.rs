//! Format-generation marker bytes and version dispatch.

use gasfs_core::GasFsError;

/// One of the three on-disk format generations, discriminated by the
/// 4-byte ASCII marker at the start of the main header (`GFS1`/`GFS2`/`GFS3`)
/// and the matching sub-header marker (`gFS1`/`gFS2`/`gFS3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// Main header only; no sub-headers, no CRC.
    Gfs1,
    /// Adds per-slice sub-headers and 32-bit per-slice `total_size`.
    Gfs2,
    /// Current generation: archive-level CRC and `total_size`, 64-bit
    /// per-slice `total_size`, `skip_check_crc`.
    Gfs3,
}

impl Version {
    /// The version byte used in both the main header and sub-header
    /// markers (`'1'`, `'2'` or `'3'`).
    pub fn byte(self) -> u8 {
        match self {
            Version::Gfs1 => b'1',
            Version::Gfs2 => b'2',
            Version::Gfs3 => b'3',
        }
    }

    /// Dispatch on the version byte following a `"GFS"`/`"gFS"` marker
    /// prefix.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'1' => Some(Version::Gfs1),
            b'2' => Some(Version::Gfs2),
            b'3' => Some(Version::Gfs3),
            _ => None,
        }
    }

    /// Width in bytes of the sub-header's `total_size` field for this
    /// version: 32-bit for GFS2, 64-bit for GFS3. GFS1 has no sub-headers.
    pub fn sub_header_total_size_width(self) -> usize {
        match self {
            Version::Gfs1 => 0,
            Version::Gfs2 => 4,
            Version::Gfs3 => 8,
        }
    }

    /// Whether this version stores a meaningful archive-level CRC in the
    /// main header.
    pub fn has_archive_crc(self) -> bool {
        matches!(self, Version::Gfs3)
    }

    /// Whether this version's main header `total_size` field is a
    /// meaningful byte count of the post-header region. GFS3 adds this;
    /// GFS1/GFS2 readers must not enforce it.
    pub fn has_archive_total_size(self) -> bool {
        matches!(self, Version::Gfs3)
    }

    /// Whether this version persists per-slice sub-headers in the
    /// directory file's sub-header table.
    pub fn has_sub_headers(self) -> bool {
        matches!(self, Version::Gfs2 | Version::Gfs3)
    }
}

/// Parse and validate a 4-byte main-header marker (`"GFS" + version`).
pub fn parse_main_marker(marker: &[u8; 4]) -> Result<Version, GasFsError> {
    if &marker[0..3] != b"GFS" {
        return Err(GasFsError::NotArchive(
            String::from_utf8_lossy(marker).into_owned().into(),
        ));
    }
    Version::from_byte(marker[3])
        .ok_or_else(|| GasFsError::NotArchive(String::from_utf8_lossy(marker).into_owned().into()))
}

/// Parse and validate a 4-byte sub-header marker (`"gFS" + version`).
pub fn parse_sub_marker(marker: &[u8; 4]) -> Result<Version, GasFsError> {
    if &marker[0..3] != b"gFS" {
        return Err(GasFsError::NotArchive(
            String::from_utf8_lossy(marker).into_owned().into(),
        ));
    }
    Version::from_byte(marker[3])
        .ok_or_else(|| GasFsError::NotArchive(String::from_utf8_lossy(marker).into_owned().into()))
}
