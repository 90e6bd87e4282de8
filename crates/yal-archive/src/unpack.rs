//! Parallel unpack pipeline.

use std::fmt;
use std::fs;
use std::path::Path;

use rayon::prelude::*;

use crate::archive::Archive;
use crate::entry::FileEntry;
use crate::pool;
use crate::progress::{Progress, Tracker};
use crate::report::{SkipReason, Skipped, UnpackReport};
use crate::walk;
use crate::{Error, Result};

/// Settings for [`unpack`].
#[derive(Clone, Default)]
pub struct UnpackOptions {
    /// Password for encrypted containers.
    pub password: Option<String>,
    /// Worker count; `0` uses the detected hardware parallelism.
    pub threads: usize,
}

impl UnpackOptions {
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
}

impl fmt::Debug for UnpackOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnpackOptions")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("threads", &self.threads)
            .finish()
    }
}

/// Restore the container at `container` into `destination`.
///
/// Entries that cannot be read, decompressed or written are skipped and
/// listed in the returned report; the remaining entries are still restored.
pub fn unpack(
    container: &Path,
    destination: &Path,
    options: &UnpackOptions,
    progress: &dyn Progress,
) -> Result<UnpackReport> {
    let archive = Archive::open(container, options.password.as_deref())?;
    tracing::debug!(
        entries = archive.len(),
        encrypted = archive.is_encrypted(),
        "parsed directory"
    );
    let report = extract_all(&archive, destination, options.threads, progress)?;
    tracing::info!(
        restored = report.restored,
        skipped = report.skipped.len(),
        bytes = report.restored_bytes,
        destination = %destination.display(),
        "unpack finished"
    );
    Ok(report)
}

/// Restore every entry of an opened archive into `destination`.
pub fn extract_all(
    archive: &Archive,
    destination: &Path,
    threads: usize,
    progress: &dyn Progress,
) -> Result<UnpackReport> {
    fs::create_dir_all(destination)?;

    let pool = pool::build(threads, "unpack")?;
    let tracker = Tracker::new(archive.len(), progress);

    let outcomes: Vec<std::result::Result<u64, SkipReason>> = pool.install(|| {
        archive
            .entries()
            .par_iter()
            .map(|entry| {
                let outcome = restore_one(archive, entry, destination);
                tracker.tick();
                outcome
            })
            .collect()
    });

    let mut report = UnpackReport::default();
    for (entry, outcome) in archive.entries().iter().zip(outcomes) {
        match outcome {
            Ok(bytes) => {
                report.restored += 1;
                report.restored_bytes += bytes;
            }
            Err(reason) => {
                tracing::warn!(path = %entry.relative_path, %reason, "skipping entry");
                report.skipped.push(Skipped {
                    path: entry.relative_path.clone(),
                    reason,
                });
            }
        }
    }
    Ok(report)
}

fn restore_one(
    archive: &Archive,
    entry: &FileEntry,
    destination: &Path,
) -> std::result::Result<u64, SkipReason> {
    let target =
        walk::safe_join(destination, &entry.relative_path).ok_or(SkipReason::UnsafePath)?;

    let block = archive.read_block(entry).map_err(|e| match e {
        Error::Io(e) => SkipReason::Read(e.to_string()),
        _ => SkipReason::OutOfBounds,
    })?;
    let data = crate::compress::decompress_exact(&block, entry.original_size)
        .map_err(|e| SkipReason::Decompress(e.to_string()))?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| SkipReason::Write(e.to_string()))?;
    }
    fs::write(&target, &data).map_err(|e| SkipReason::Write(e.to_string()))?;
    tracing::trace!(path = %entry.relative_path, bytes = data.len(), "restored");
    Ok(data.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress;
    use crate::pack::PackedContainer;
    use crate::progress::NoProgress;

    fn container_with(entries: Vec<(&str, &[u8])>) -> PackedContainer {
        let mut packed = PackedContainer::default();
        let mut offset = 0;
        for (path, data) in entries {
            let block = compress::compress_bounded(data, 3).unwrap();
            packed.entries.push(FileEntry {
                relative_path: path.into(),
                original_size: data.len() as u64,
                compressed_size: block.len() as u64,
                offset,
            });
            offset += block.len() as u64;
            packed.blocks.push(block);
        }
        packed
    }

    #[test]
    fn test_corrupt_block_is_skipped() {
        let mut packed = container_with(vec![
            ("good.txt", &b"fine"[..]),
            ("bad.txt", &b"broken soon"[..]),
        ]);
        // claim a different original size so the block no longer matches
        packed.entries[1].original_size += 1;
        let archive = Archive::from_bytes(packed.to_bytes(None).unwrap(), None).unwrap();

        let dest = tempfile::tempdir().unwrap();
        let report = extract_all(&archive, dest.path(), 2, &NoProgress).unwrap();

        assert_eq!(report.restored, 1);
        assert_eq!(report.restored_bytes, 4);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, "bad.txt");
        assert!(matches!(report.skipped[0].reason, SkipReason::Decompress(_)));
        assert_eq!(fs::read(dest.path().join("good.txt")).unwrap(), b"fine");
        assert!(!dest.path().join("bad.txt").exists());
    }

    #[test]
    fn test_absurd_original_size_is_skipped() {
        let mut packed = container_with(vec![
            ("good.txt", &b"fine"[..]),
            ("bad.txt", &b"huge claim"[..]),
        ]);
        packed.entries[1].original_size = u64::MAX;
        let archive = Archive::from_bytes(packed.to_bytes(None).unwrap(), None).unwrap();

        let dest = tempfile::tempdir().unwrap();
        let report = extract_all(&archive, dest.path(), 2, &NoProgress).unwrap();

        assert_eq!(report.restored, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, "bad.txt");
        assert!(matches!(report.skipped[0].reason, SkipReason::Decompress(_)));
        assert_eq!(fs::read(dest.path().join("good.txt")).unwrap(), b"fine");
    }

    #[test]
    fn test_escaping_path_is_skipped() {
        let packed = container_with(vec![
            ("../escape.txt", &b"nope"[..]),
            ("ok/inner.txt", &b"yes"[..]),
        ]);
        let archive = Archive::from_bytes(packed.to_bytes(None).unwrap(), None).unwrap();

        let root = tempfile::tempdir().unwrap();
        let dest = root.path().join("out");
        let report = extract_all(&archive, &dest, 1, &NoProgress).unwrap();

        assert_eq!(report.restored, 1);
        assert_eq!(report.skipped[0].reason, SkipReason::UnsafePath);
        assert!(!root.path().join("escape.txt").exists());
        assert_eq!(fs::read(dest.join("ok/inner.txt")).unwrap(), b"yes");
    }

    #[test]
    fn test_debug_redacts_password() {
        let printed = format!("{:?}", UnpackOptions::new().password("hunter2"));
        assert!(!printed.contains("hunter2"));
    }
}
