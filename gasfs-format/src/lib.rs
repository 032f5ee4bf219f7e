//! # gasfs-format
//!
//! On-disk structures for the gasfs archive format: the main header, the
//! sub-header (used both in the directory's sub-header table and at the
//! head of every slice file), the 16-byte entry record, and the NUL-terminated
//! path blob. Three format generations are recognised by their 4-byte ASCII
//! marker — see [`Version`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod entry;
pub mod header;
pub mod subheader;
pub mod version;

pub use entry::EntryRecord;
pub use header::MainHeader;
pub use subheader::SubHeader;
pub use version::Version;

/// Main header record size in bytes, fixed across versions.
pub const MAIN_HEADER_SIZE: usize = 32;
/// Sub-header record size in bytes, fixed across versions.
pub const SUB_HEADER_SIZE: usize = 32;
/// Entry record size in bytes.
pub const ENTRY_RECORD_SIZE: usize = 16;
