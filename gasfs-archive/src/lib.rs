//! # gasfs-archive
//!
//! The archive-and-slice engine: input traversal, the two-phase slice
//! allocator, the incremental build decision engine, the streaming writer,
//! and the reader/extractor. [`builder::build`] ties the write-side
//! modules together; [`reader::ParsedArchive`] and [`extractor::extract`]
//! do the same for reads.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod allocator;
pub mod builder;
pub mod extractor;
pub mod incremental;
pub mod model;
pub mod progress;
pub mod reader;
pub mod traversal;
pub mod writer;

pub use builder::{build, BuildReport};
pub use extractor::extract;
pub use model::{Entry, Global, PathMap, SliceDescriptor};
pub use progress::ProgressSink;
pub use reader::ParsedArchive;
