//! Structured outcomes of pack and unpack.
//!
//! Per-file failures never abort an operation. They are collected here so
//! callers can see exactly which files were left out and why.

use std::fmt;

/// Why a single file was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The source file could not be read.
    Read(String),
    /// The compressor failed.
    Compress(String),
    /// The entry's data range lies outside the container.
    OutOfBounds,
    /// The block did not decompress to the recorded size.
    Decompress(String),
    /// The stored path would escape the destination directory.
    UnsafePath,
    /// The restored file could not be written.
    Write(String),
    /// The file name is not valid UTF-8 and cannot be stored.
    NonUtf8Path,
    /// A symlink to a directory, which is not descended.
    SymlinkedDirectory,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Read(e) => write!(f, "read failed: {e}"),
            SkipReason::Compress(e) => write!(f, "compression failed: {e}"),
            SkipReason::OutOfBounds => f.write_str("data range outside container"),
            SkipReason::Decompress(e) => write!(f, "decompression failed: {e}"),
            SkipReason::UnsafePath => f.write_str("path escapes destination"),
            SkipReason::Write(e) => write!(f, "write failed: {e}"),
            SkipReason::NonUtf8Path => f.write_str("file name is not valid UTF-8"),
            SkipReason::SymlinkedDirectory => f.write_str("symlinked directory not followed"),
        }
    }
}

/// A file that was not packed or not restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub path: String,
    pub reason: SkipReason,
}

/// Result of a successful pack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackReport {
    /// Number of files stored in the container.
    pub packed: usize,
    /// Sum of original sizes of stored files.
    pub original_bytes: u64,
    /// Length of the data section.
    pub compressed_bytes: u64,
    /// Whether the container was written encrypted.
    pub encrypted: bool,
    /// Files that were left out.
    pub skipped: Vec<Skipped>,
}

impl PackReport {
    /// True when every enumerated file made it into the container.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Result of a successful unpack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpackReport {
    /// Number of files written to the destination.
    pub restored: usize,
    /// Total bytes written.
    pub restored_bytes: u64,
    /// Entries that were not restored.
    pub skipped: Vec<Skipped>,
}

impl UnpackReport {
    /// True when every directory entry was restored.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}
