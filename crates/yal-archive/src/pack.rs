//! Parallel pack pipeline.
//!
//! Files are read and compressed on a fixed worker pool. Each worker claims
//! its data range from one shared counter with a single fetch-and-add, so
//! ranges never overlap no matter which worker finishes first. Results are
//! collected in input order, one slot per file.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use crate::compress::{self, DEFAULT_LEVEL};
use crate::crypto;
use crate::entry::{self, FileEntry};
use crate::format::{self, EncryptedEnvelope};
use crate::pool;
use crate::progress::{Progress, Tracker};
use crate::report::{PackReport, SkipReason, Skipped};
use crate::walk::{self, SourceFile};
use crate::Result;

/// Settings for [`pack`].
#[derive(Clone)]
pub struct PackOptions {
    /// Encrypt the container when set to a non-empty password.
    pub password: Option<String>,
    /// Worker count; `0` uses the detected hardware parallelism.
    pub threads: usize,
    /// Zstandard compression level.
    pub level: i32,
    /// Sort inputs by path and lay blocks out in that order, making the
    /// output independent of scheduling.
    pub deterministic: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            password: None,
            threads: 0,
            level: DEFAULT_LEVEL,
            deterministic: false,
        }
    }
}

impl PackOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    /// The password, if encryption is requested.
    pub fn effective_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

impl fmt::Debug for PackOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackOptions")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("threads", &self.threads)
            .field("level", &self.level)
            .field("deterministic", &self.deterministic)
            .finish()
    }
}

/// A fully compressed directory, ready to be written.
#[derive(Debug, Clone, Default)]
pub struct PackedContainer {
    /// Directory entries with final offsets.
    pub entries: Vec<FileEntry>,
    /// `blocks[i]` is the compressed data of `entries[i]`.
    pub blocks: Vec<Vec<u8>>,
    /// Files that could not be read or compressed.
    pub skipped: Vec<Skipped>,
}

impl PackedContainer {
    /// Summarize this container as a report.
    pub fn report(&self, encrypted: bool) -> PackReport {
        PackReport {
            packed: self.entries.len(),
            original_bytes: self.entries.iter().map(|e| e.original_size).sum(),
            compressed_bytes: entry::data_len(&self.entries),
            encrypted,
            skipped: self.skipped.clone(),
        }
    }

    /// Write the container, encrypted when `password` is given.
    pub fn write_to<W: Write>(&self, writer: &mut W, password: Option<&str>) -> Result<()> {
        match password {
            Some(password) => {
                let plain = format::serialize(&self.entries, &self.blocks)?;
                let (iv, ciphertext) = crypto::encrypt(&plain, password)?;
                EncryptedEnvelope { iv, ciphertext }.write_to(writer)
            }
            None => format::write_container(writer, &self.entries, &self.blocks),
        }
    }

    /// Serialize into memory.
    pub fn to_bytes(&self, password: Option<&str>) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out, password)?;
        Ok(out)
    }
}

enum Slot {
    Packed(FileEntry, Vec<u8>),
    Skipped(Skipped),
}

/// Compress every file below `source` into an in-memory container.
///
/// Entries the walk could not store are reported ahead of files that failed
/// to read or compress.
pub fn build(source: &Path, options: &PackOptions, progress: &dyn Progress) -> Result<PackedContainer> {
    let tree = walk::collect_files(source, options.deterministic)?;
    tracing::debug!(
        files = tree.files.len(),
        skipped = tree.skipped.len(),
        source = %source.display(),
        "enumerated source tree"
    );
    for skipped in &tree.skipped {
        tracing::warn!(path = %skipped.path, reason = %skipped.reason, "skipping file");
    }

    let mut packed = compress_files(&tree.files, options, progress)?;
    let mut skipped = tree.skipped;
    skipped.append(&mut packed.skipped);
    packed.skipped = skipped;
    Ok(packed)
}

/// Compress `files` on a dedicated worker pool.
pub fn compress_files(
    files: &[SourceFile],
    options: &PackOptions,
    progress: &dyn Progress,
) -> Result<PackedContainer> {
    let pool = pool::build(options.threads, "pack")?;
    let next_offset = AtomicU64::new(0);
    let tracker = Tracker::new(files.len(), progress);

    let slots: Vec<Slot> = pool.install(|| {
        files
            .par_iter()
            .map(|file| {
                let slot = pack_one(file, options.level, &next_offset);
                tracker.tick();
                slot
            })
            .collect()
    });

    let mut packed = PackedContainer {
        entries: Vec::with_capacity(slots.len()),
        blocks: Vec::with_capacity(slots.len()),
        skipped: Vec::new(),
    };
    for slot in slots {
        match slot {
            Slot::Packed(entry, block) => {
                packed.entries.push(entry);
                packed.blocks.push(block);
            }
            Slot::Skipped(skipped) => {
                tracing::warn!(path = %skipped.path, reason = %skipped.reason, "skipping file");
                packed.skipped.push(skipped);
            }
        }
    }

    if options.deterministic {
        entry::relayout(&mut packed.entries);
    }
    Ok(packed)
}

fn pack_one(file: &SourceFile, level: i32, next_offset: &AtomicU64) -> Slot {
    let skip = |reason| {
        Slot::Skipped(Skipped {
            path: file.relative_path.clone(),
            reason,
        })
    };

    let data = match fs::read(&file.path) {
        Ok(data) => data,
        Err(e) => return skip(SkipReason::Read(e.to_string())),
    };
    let block = match compress::compress_bounded(&data, level) {
        Ok(block) => block,
        Err(e) => return skip(SkipReason::Compress(e.to_string())),
    };

    let compressed_size = block.len() as u64;
    let offset = next_offset.fetch_add(compressed_size, Ordering::Relaxed);
    tracing::trace!(path = %file.relative_path, offset, compressed_size, "compressed");

    Slot::Packed(
        FileEntry {
            relative_path: file.relative_path.clone(),
            original_size: data.len() as u64,
            compressed_size,
            offset,
        },
        block,
    )
}

/// Pack the directory tree at `source` into a container file at `container`.
///
/// Files that cannot be read or compressed are left out and listed in the
/// returned report; only failures affecting the container itself are errors.
pub fn pack(
    source: &Path,
    container: &Path,
    options: &PackOptions,
    progress: &dyn Progress,
) -> Result<PackReport> {
    let packed = build(source, options, progress)?;
    let password = options.effective_password();

    let mut writer = BufWriter::new(File::create(container)?);
    packed.write_to(&mut writer, password)?;
    writer.flush()?;

    let report = packed.report(password.is_some());
    tracing::info!(
        packed = report.packed,
        skipped = report.skipped.len(),
        original_bytes = report.original_bytes,
        compressed_bytes = report.compressed_bytes,
        encrypted = report.encrypted,
        container = %container.display(),
        "pack finished"
    );
    Ok(report)
}
