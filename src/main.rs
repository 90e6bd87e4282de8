//! Yal CLI - pack directories into compressed, optionally encrypted containers.
//!
//! This is the main entry point for the `yal` command-line application.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use yal::archive::compress::DEFAULT_LEVEL;
use yal::archive::Skipped;
use yal::prelude::*;

/// Exit status for usage errors.
const EXIT_USAGE: u8 = 1;
/// Exit status when packing fails.
const EXIT_PACK: u8 = 2;
/// Exit status when unpacking or listing fails.
const EXIT_UNPACK: u8 = 3;

/// Yal - parallel compressed directory containers
#[derive(Parser)]
#[command(name = "yal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a directory tree into a container
    Pack {
        /// Directory to pack
        source: PathBuf,

        /// Container file to create
        container: PathBuf,

        /// Encrypt the container with this password
        #[arg(short, long, env = "YAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Worker threads (0 = all cores)
        #[arg(short = 'j', long, env = "YAL_THREADS", default_value_t = 0)]
        threads: usize,

        /// Zstandard compression level
        #[arg(short, long, default_value_t = DEFAULT_LEVEL, allow_negative_numbers = true,
              value_parser = clap::value_parser!(i32).range(-7..=22))]
        level: i32,

        /// Sort inputs and lay blocks out in path order for reproducible output
        #[arg(long)]
        deterministic: bool,
    },

    /// Restore a container into a directory
    Unpack {
        /// Container file to read
        container: PathBuf,

        /// Destination directory
        destination: PathBuf,

        /// Password of an encrypted container
        #[arg(short, long, env = "YAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Worker threads (0 = all cores)
        #[arg(short = 'j', long, env = "YAL_THREADS", default_value_t = 0)]
        threads: usize,
    },

    /// List the contents of a container
    List {
        /// Container file to read
        container: PathBuf,

        /// Password of an encrypted container
        #[arg(short, long, env = "YAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Show sizes and offsets
        #[arg(short, long)]
        detailed: bool,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // help and version are reported through the error path too
            let code = if e.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_tracing(cli.verbose);

    let failure = cli.command.failure_code();
    let result = match cli.command {
        Commands::Pack {
            source,
            container,
            password,
            threads,
            level,
            deterministic,
        } => {
            let mut options = PackOptions::new()
                .threads(threads)
                .level(level)
                .deterministic(deterministic);
            options.password = password;
            cmd_pack(&source, &container, &options)
        }
        Commands::Unpack {
            container,
            destination,
            password,
            threads,
        } => {
            let mut options = UnpackOptions::new().threads(threads);
            options.password = password;
            cmd_unpack(&container, &destination, &options)
        }
        Commands::List {
            container,
            password,
            detailed,
        } => cmd_list(&container, password.as_deref(), detailed),
    };

    ExitCode::from(exit_status(&result, failure))
}

impl Commands {
    /// Exit status reported when this command fails.
    fn failure_code(&self) -> u8 {
        match self {
            Commands::Pack { .. } => EXIT_PACK,
            Commands::Unpack { .. } | Commands::List { .. } => EXIT_UNPACK,
        }
    }
}

fn exit_status(result: &Result<()>, failure: u8) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:#}");
            failure
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn cmd_pack(source: &Path, container: &Path, options: &PackOptions) -> Result<()> {
    if !source.is_dir() {
        anyhow::bail!("{} is not a directory", source.display());
    }
    println!("Packing {} -> {}", source.display(), container.display());
    tracing::debug!(?options, "pack options");

    let pb = progress_bar()?;
    let on_progress = |_done: usize, total: usize| {
        pb.set_length(total as u64);
        pb.inc(1);
    };

    let start = Instant::now();
    let report = pack(source, container, options, &on_progress)
        .with_context(|| format!("Failed to pack {}", source.display()))?;
    pb.finish_and_clear();

    println!(
        "Packed {} files in {:?}: {} -> {} bytes{}",
        report.packed,
        start.elapsed(),
        report.original_bytes,
        report.compressed_bytes,
        if report.encrypted { " (encrypted)" } else { "" }
    );
    print_skipped(&report.skipped);

    Ok(())
}

fn cmd_unpack(container: &Path, destination: &Path, options: &UnpackOptions) -> Result<()> {
    println!("Unpacking {} -> {}", container.display(), destination.display());
    tracing::debug!(?options, "unpack options");

    let pb = progress_bar()?;
    let on_progress = |_done: usize, total: usize| {
        pb.set_length(total as u64);
        pb.inc(1);
    };

    let start = Instant::now();
    let report = unpack(container, destination, options, &on_progress)
        .with_context(|| format!("Failed to unpack {}", container.display()))?;
    pb.finish_and_clear();

    println!(
        "Restored {} files ({} bytes) in {:?}",
        report.restored,
        report.restored_bytes,
        start.elapsed()
    );
    print_skipped(&report.skipped);

    Ok(())
}

fn cmd_list(container: &Path, password: Option<&str>, detailed: bool) -> Result<()> {
    let archive = Archive::open(container, password)
        .with_context(|| format!("Failed to open {}", container.display()))?;
    tracing::debug!(?archive, "opened container");

    for entry in archive.entries() {
        if detailed {
            println!(
                "{:>12} {:>12} {:>12} {}",
                entry.original_size, entry.compressed_size, entry.offset, entry.relative_path
            );
        } else {
            println!("{}", entry.relative_path);
        }
    }

    println!(
        "\nTotal: {} entries, {} bytes of data{}",
        archive.len(),
        archive.data_len(),
        if archive.is_encrypted() { ", encrypted" } else { "" }
    );

    Ok(())
}

fn print_skipped(skipped: &[Skipped]) {
    if skipped.is_empty() {
        return;
    }
    tracing::warn!(count = skipped.len(), "operation finished with skipped files");
    eprintln!("Skipped {} files:", skipped.len());
    for s in skipped {
        eprintln!("  {}: {}", s.path, s.reason);
    }
}
