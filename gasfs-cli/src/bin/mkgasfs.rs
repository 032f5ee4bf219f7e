//! `mkgasfs` — build (or incrementally rebuild) a gasfs archive from a
//! `.gfi` manifest.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gasfs_archive::{builder, traversal};
use gasfs_manifest::Manifest;

/// Build a gasfs archive from an input manifest.
#[derive(Parser, Debug)]
#[command(name = "mkgasfs", version, about)]
struct Cli {
    /// Input manifest (`.gfi`) describing the archive to build.
    input: PathBuf,

    /// Archive base path; defaults to the manifest's filename without its
    /// extension.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Base directory input paths are resolved relative to; defaults to
    /// the manifest file's own directory.
    #[arg(long)]
    basedir: Option<PathBuf>,

    /// Write the effective manifest back out as a `.gfi` file.
    #[arg(long)]
    list: Option<PathBuf>,

    /// Print per-slice build decisions.
    #[arg(short, long)]
    verbose: bool,

    /// Rebuild every slice and the directory unconditionally.
    #[arg(short, long)]
    force: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    gasfs_cli::init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), gasfs_core::GasFsError> {
    let manifest = Manifest::read_file(&cli.input)?;
    let manifest_mtime = std::fs::metadata(&cli.input)
        .and_then(|m| m.modified())
        .map_err(|e| gasfs_core::GasFsError::io(cli.input.clone(), e))?;

    let archive_base = cli.output.unwrap_or_else(|| {
        let mut base = cli.input.clone();
        base.set_extension("");
        base
    });
    let base_dir = cli.basedir.unwrap_or_else(|| {
        cli.input
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    });

    // Walking the inputs twice (once to size the bar, once inside `build`
    // to actually copy them) is cheap next to the copy itself.
    let entry_count = traversal::traverse(&base_dir, &manifest.input_paths)?.len() as u64;

    // The bar and --verbose's per-slice lines both report on the same work;
    // show one or the other, not both garbling each other's output.
    let bar = gasfs_cli::Bar(gasfs_cli::create_progress_bar(entry_count, !cli.verbose));

    let report = builder::build(
        &manifest,
        manifest_mtime,
        archive_base,
        base_dir,
        cli.force,
        false,
        Some(&bar),
    )?;
    bar.0.finish_and_clear();

    if cli.verbose {
        for (i, action) in report.slice_actions.iter().enumerate() {
            println!("slice {:03}: {:?}", i + 1, action);
        }
        println!(
            "directory: {}",
            if report.directory_rewritten {
                "rewritten"
            } else {
                "skipped"
            }
        );
    }

    if let Some(list_path) = cli.list {
        std::fs::write(&list_path, manifest.to_gfi_string())
            .map_err(|e| gasfs_core::GasFsError::io(list_path, e))?;
    }

    Ok(())
}
