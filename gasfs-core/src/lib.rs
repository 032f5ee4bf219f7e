//! # gasfs-core
//!
//! Shared primitives for the gasfs archive-and-slice file system: the
//! little-endian byte codec and BCD date packing used by every on-disk
//! structure, the resumable CRC-32 engine, and the error type returned
//! by every other gasfs crate.
//!
//! This crate knows nothing about the gasfs on-disk layout itself — see
//! `gasfs-format` for the header/sub-header/entry structures that are built
//! out of these primitives.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bytes;
pub mod crc;
pub mod error;

pub use bytes::{read_bcd_date, write_bcd_date};
pub use crc::Crc32;
pub use error::{GasFsError, Result};
