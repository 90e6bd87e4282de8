//! Yal - pack directory trees into single compressed containers.
//!
//! This crate provides a unified interface to the Yal library crates.
//!
//! # Crates
//!
//! - [`yal_common`] - Positional byte sources and little-endian helpers
//! - [`yal_archive`] - Container format, parallel pack/unpack, encryption
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use yal::prelude::*;
//!
//! pack(Path::new("assets"), Path::new("assets.yal"), &PackOptions::new(), &NoProgress)?;
//!
//! let archive = Archive::open("assets.yal", None)?;
//! for entry in archive.entries() {
//!     println!("{}: {} bytes", entry.relative_path, entry.original_size);
//! }
//! # Ok::<(), yal::archive::Error>(())
//! ```

pub use yal_archive as archive;
pub use yal_common as common;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use yal_archive::{
        pack, unpack, Archive, FileEntry, NoProgress, PackOptions, PackReport, Progress,
        SkipReason, UnpackOptions, UnpackReport,
    };
    pub use yal_common::{ByteSource, FileSource};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::fs;

    #[test]
    fn test_prelude_roundtrip() {
        let source = tempfile::tempdir().unwrap();
        fs::write(source.path().join("a.txt"), b"hello").unwrap();
        let work = tempfile::tempdir().unwrap();
        let container = work.path().join("a.yal");

        pack(source.path(), &container, &PackOptions::new(), &NoProgress).unwrap();
        let archive = Archive::open(&container, None).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.read(&archive.entries()[0]).unwrap(), b"hello");
    }

    #[test]
    fn test_version_set() {
        assert!(!super::VERSION.is_empty());
    }
}
