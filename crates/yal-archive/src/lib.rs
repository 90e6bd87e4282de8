//! YAL container packing and unpacking.
//!
//! A YAL container stores a directory tree as a single file: a header,
//! a directory of entry records and a data section of independently
//! Zstandard-compressed blocks. It can optionally be wrapped in a
//! password-protected AES-256-CBC envelope.
//!
//! - Parallel compression on a fixed worker pool with race-free offset
//!   allocation
//! - Parallel extraction with positional reads from one shared source
//! - Per-file failures are skipped and reported, never fatal
//! - PBKDF2-HMAC-SHA1 key derivation with the envelope IV as salt
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use yal_archive::{pack, unpack, NoProgress, PackOptions, UnpackOptions};
//!
//! let report = pack(
//!     Path::new("assets"),
//!     Path::new("assets.yal"),
//!     &PackOptions::new().password("secret"),
//!     &NoProgress,
//! )?;
//! println!("packed {} files", report.packed);
//!
//! unpack(
//!     Path::new("assets.yal"),
//!     Path::new("restored"),
//!     &UnpackOptions::new().password("secret"),
//!     &NoProgress,
//! )?;
//! # Ok::<(), yal_archive::Error>(())
//! ```

mod archive;
pub mod compress;
pub mod crypto;
mod entry;
mod error;
pub mod format;
mod pack;
mod pool;
mod progress;
mod report;
mod unpack;
mod walk;

pub use archive::Archive;
pub use entry::{check_layout, relayout, Directory, FileEntry, RECORD_FIXED_LEN};
pub use error::{Error, ErrorKind, Result};
pub use format::Magic;
pub use pack::{build, compress_files, pack, PackOptions, PackedContainer};
pub use pool::{default_threads, FALLBACK_THREADS};
pub use progress::{NoProgress, Progress};
pub use report::{PackReport, SkipReason, Skipped, UnpackReport};
pub use unpack::{extract_all, unpack, UnpackOptions};
pub use walk::{collect_files, safe_join, SourceFile, SourceTree};
