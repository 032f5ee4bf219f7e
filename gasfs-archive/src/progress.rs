//! Progress reporting hook for the writer's and extractor's copy loops.
//!
//! This crate has no opinion on how progress is displayed, so it depends on
//! no UI toolkit; a caller (typically a CLI binary) supplies a sink that
//! wraps whatever progress widget it likes.

/// Receives incremental "one unit of work done" notifications during a
/// build or extraction.
pub trait ProgressSink {
    /// Advance the sink's position by `delta` units.
    fn inc(&self, delta: u64);
}

impl<T: ProgressSink + ?Sized> ProgressSink for &T {
    fn inc(&self, delta: u64) {
        (**self).inc(delta)
    }
}
