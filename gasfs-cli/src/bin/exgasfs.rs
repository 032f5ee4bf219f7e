//! `exgasfs` — verify and extract a gasfs archive.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gasfs_archive::extractor::matches_any_prefix;
use gasfs_archive::{extract, ParsedArchive};
use gasfs_manifest::Manifest;
use serde::Serialize;

/// JSON-serializable view of one archive entry, for `--json`.
#[derive(Debug, Serialize)]
struct EntryJson {
    path: String,
    slice: u8,
    offset: u64,
    size: u64,
}

/// JSON-serializable view of an archive listing, for `--json`.
#[derive(Debug, Serialize)]
struct ArchiveListJson {
    archive: String,
    slices: u8,
    entries: Vec<EntryJson>,
}

/// Extract matching entries from a gasfs archive.
#[derive(Parser, Debug)]
#[command(name = "exgasfs", version, about)]
struct Cli {
    /// Archive directory file (`<base>_000.gfs`); the `_000.gfs` suffix is
    /// stripped to derive the archive's base name.
    input: PathBuf,

    /// Logical path prefixes to extract; matches all entries if empty.
    filters: Vec<String>,

    /// Destination directory for extracted files.
    #[arg(long, default_value = ".")]
    extract: PathBuf,

    /// Restrict extraction to a single slice number.
    #[arg(long)]
    slice: Option<u8>,

    /// Write the archive's entries back out as a manifest-style `.gfi`
    /// file (path list only).
    #[arg(long)]
    list: Option<PathBuf>,

    /// Skip per-slice data CRC verification.
    #[arg(long)]
    skipcheckcrc: bool,

    /// Print the archive's entry listing as JSON instead of extracting.
    #[arg(long)]
    json: bool,

    /// Print verification progress.
    #[arg(short, long)]
    verbose: bool,
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
    let archive = ParsedArchive::open(&cli.input)?;

    if cli.verbose {
        println!(
            "{} ({} slices, {} entries)",
            archive.directory_path.display(),
            archive.main_header.slices,
            archive.main_header.entries
        );
    }

    if let Some(list_path) = cli.list {
        // Wrapped as a single-section `.gfi` so the listing round-trips
        // through `Manifest::parse` the same way mkgasfs's `--list` does.
        let listing = Manifest {
            slices: archive.main_header.slices,
            max_slice_size_mib: archive.main_header.max_slice_size,
            input_paths: archive.entries.keys().cloned().collect(),
            pins: Default::default(),
        };
        std::fs::write(&list_path, listing.to_gfi_string())
            .map_err(|e| gasfs_core::GasFsError::io(list_path, e))?;
    }

    if cli.json {
        let listing = ArchiveListJson {
            archive: archive.directory_path.display().to_string(),
            slices: archive.main_header.slices,
            entries: archive
                .entries
                .iter()
                .map(|(path, entry)| EntryJson {
                    path: path.clone(),
                    slice: entry.slice,
                    offset: entry.offset,
                    size: entry.size,
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&listing)?;
        println!("{json}");
        return Ok(());
    }

    std::fs::create_dir_all(&cli.extract)
        .map_err(|e| gasfs_core::GasFsError::io(cli.extract.clone(), e))?;

    let matching_count = archive
        .entries
        .iter()
        .filter(|(path, entry)| {
            matches_any_prefix(path, &cli.filters) && cli.slice.is_none_or(|s| s == entry.slice)
        })
        .count() as u64;
    let bar = gasfs_cli::Bar(gasfs_cli::create_progress_bar(
        matching_count,
        !cli.verbose,
    ));

    let result = extract(
        &archive,
        &cli.filters,
        &cli.extract,
        cli.skipcheckcrc,
        cli.slice,
        Some(&bar),
    );
    bar.0.finish_and_clear();
    result
}
