//! Shared helpers for the `mkgasfs` and `exgasfs` binaries.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

use gasfs_archive::ProgressSink;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

/// Initialise the global tracing subscriber.
///
/// Honours `RUST_LOG`; defaults to `info` for the gasfs crates and `warn`
/// elsewhere when `--verbose` is not set, or `debug` when it is.
pub fn init_logging(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gasfs={default_directive}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .try_init();
}

/// Create a progress bar with the gasfs tools' standard styling, hidden
/// entirely unless `enable` is set.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is valid")
            .progress_chars("█▓▒░ "),
    );
    pb
}

/// Adapts an [`indicatif::ProgressBar`] to [`gasfs_archive::ProgressSink`],
/// so the library crate's copy loops can drive it without depending on
/// `indicatif` themselves.
pub struct Bar(pub ProgressBar);

impl ProgressSink for Bar {
    fn inc(&self, delta: u64) {
        self.0.inc(delta);
    }
}
