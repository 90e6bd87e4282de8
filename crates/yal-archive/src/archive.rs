//! Container reader.
//!
//! [`Archive`] resolves the encryption envelope, parses the directory and
//! serves single-entry reads. The directory is parsed once and read-only
//! afterwards, so an `Archive` can be shared by extraction workers.

use std::path::Path;

use yal_common::{ByteSource, FileSource};

use crate::compress;
use crate::crypto;
use crate::entry::{self, Directory, FileEntry};
use crate::format::{self, EncryptedEnvelope, Magic};
use crate::{Error, Result};

/// An opened YAL container.
pub struct Archive {
    source: Box<dyn ByteSource>,
    directory: Directory,
    encrypted: bool,
}

impl Archive {
    /// Open a container file.
    ///
    /// Encrypted containers are decrypted into memory with `password`; plain
    /// containers are read in place.
    pub fn open<P: AsRef<Path>>(path: P, password: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(container = %path.display(), "opening container");
        Self::load(Box::new(FileSource::open(path)?), password)
    }

    /// Open a container held in memory.
    pub fn from_bytes(bytes: Vec<u8>, password: Option<&str>) -> Result<Self> {
        Self::load(Box::new(bytes), password)
    }

    fn load(source: Box<dyn ByteSource>, password: Option<&str>) -> Result<Self> {
        match format::read_magic(&*source)? {
            Magic::Plain => {
                let directory = format::parse(&*source)?;
                Ok(Self {
                    source,
                    directory,
                    encrypted: false,
                })
            }
            Magic::Encrypted => {
                let password = password
                    .filter(|p| !p.is_empty())
                    .ok_or(Error::PasswordRequired)?;
                let envelope = EncryptedEnvelope::read_from(&*source)?;
                drop(source);

                let plain = crypto::decrypt(&envelope.ciphertext, &envelope.iv, password)?;
                tracing::debug!(bytes = plain.len(), "decrypted container");
                let directory = format::parse(&plain)?;
                Ok(Self {
                    source: Box::new(plain),
                    directory,
                    encrypted: true,
                })
            }
        }
    }

    /// The parsed directory.
    #[inline]
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Entries in stored order.
    #[inline]
    pub fn entries(&self) -> &[FileEntry] {
        &self.directory.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.directory.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    /// Whether the container was stored encrypted.
    #[inline]
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Length of the data section as stored.
    pub fn data_len(&self) -> u64 {
        self.source.len().saturating_sub(self.directory.data_start)
    }

    /// Find an entry by relative path.
    pub fn find(&self, path: &str) -> Option<&FileEntry> {
        self.directory.find(path)
    }

    /// Read the compressed block of `entry`.
    pub fn read_block(&self, entry: &FileEntry) -> Result<Vec<u8>> {
        let start = self
            .directory
            .data_start
            .checked_add(entry.offset)
            .filter(|start| {
                start
                    .checked_add(entry.compressed_size)
                    .is_some_and(|end| end <= self.source.len())
            })
            .ok_or_else(|| {
                Error::Format(format!(
                    "data range of {:?} lies outside the container",
                    entry.relative_path
                ))
            })?;
        Ok(self.source.read_vec_at(start, entry.compressed_size)?)
    }

    /// Read and decompress `entry`.
    pub fn read(&self, entry: &FileEntry) -> Result<Vec<u8>> {
        let block = self.read_block(entry)?;
        compress::decompress_exact(&block, entry.original_size)
    }

    /// Check that entry ranges tile the data section exactly.
    ///
    /// Returns the data section length.
    pub fn verify_layout(&self) -> Result<u64> {
        let covered = entry::check_layout(self.entries())?;
        if covered != self.data_len() {
            return Err(Error::Format(format!(
                "entries cover {covered} bytes but the data section holds {}",
                self.data_len()
            )));
        }
        Ok(covered)
    }
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("entries", &self.directory.len())
            .field("data_start", &self.directory.data_start)
            .field("encrypted", &self.encrypted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::PackedContainer;

    fn packed() -> PackedContainer {
        let data_a = b"hello".to_vec();
        let data_b = vec![0u8; 1000];
        let block_a = compress::compress_bounded(&data_a, 3).unwrap();
        let block_b = compress::compress_bounded(&data_b, 3).unwrap();
        PackedContainer {
            entries: vec![
                FileEntry {
                    relative_path: "a.txt".into(),
                    original_size: 5,
                    compressed_size: block_a.len() as u64,
                    offset: block_b.len() as u64,
                },
                FileEntry {
                    relative_path: "sub/b.bin".into(),
                    original_size: 1000,
                    compressed_size: block_b.len() as u64,
                    offset: 0,
                },
            ],
            blocks: vec![block_a, block_b],
            skipped: Vec::new(),
        }
    }

    #[test]
    fn test_plain_in_memory() {
        let bytes = packed().to_bytes(None).unwrap();
        let archive = Archive::from_bytes(bytes, None).unwrap();

        assert!(!archive.is_encrypted());
        assert_eq!(archive.len(), 2);
        archive.verify_layout().unwrap();

        let a = archive.find("a.txt").unwrap();
        assert_eq!(archive.read(a).unwrap(), b"hello");
        let b = archive.find("sub/b.bin").unwrap();
        assert_eq!(archive.read(b).unwrap(), vec![0u8; 1000]);
    }

    #[test]
    fn test_encrypted_in_memory() {
        let bytes = packed().to_bytes(Some("secret")).unwrap();
        assert_eq!(&bytes[..4], b"YALC");

        let archive = Archive::from_bytes(bytes.clone(), Some("secret")).unwrap();
        assert!(archive.is_encrypted());
        assert_eq!(archive.read(&archive.entries()[0]).unwrap(), b"hello");

        assert!(matches!(
            Archive::from_bytes(bytes.clone(), None),
            Err(Error::PasswordRequired)
        ));
        assert!(matches!(
            Archive::from_bytes(bytes.clone(), Some("")),
            Err(Error::PasswordRequired)
        ));
        let err = Archive::from_bytes(bytes, Some("wrong")).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic(_)), "got {err:?}");
    }

    #[test]
    fn test_out_of_bounds_entry() {
        let mut container = packed();
        let bytes = container.to_bytes(None).unwrap();
        let archive = Archive::from_bytes(bytes, None).unwrap();

        container.entries[0].offset = u64::MAX - 1;
        assert!(matches!(
            archive.read_block(&container.entries[0]),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_truncated_data_section_fails_layout_check() {
        let mut bytes = packed().to_bytes(None).unwrap();
        bytes.pop();
        let archive = Archive::from_bytes(bytes, None).unwrap();
        assert!(archive.verify_layout().is_err());
    }
}
