//! Container binary layout.
//!
//! A plain container is laid out as:
//!
//! ```text
//! "YAL1" | count: u64 | count x record | data section
//! record = path_len: u64 | path bytes | original_size: u64
//!        | compressed_size: u64 | offset: u64
//! ```
//!
//! The data section holds every compressed block at `data_start + offset`.
//! An encrypted container is `"YALC" | iv: [u8; 16] | ciphertext`, where the
//! ciphertext decrypts to a complete plain container. All integers are
//! little-endian.

use std::io::Write;

use yal_common::{ByteSource, SourceReader, WriteExt};

use crate::crypto::IV_LEN;
use crate::entry::{self, Directory, FileEntry, RECORD_FIXED_LEN};
use crate::{Error, Result};

/// Magic of a plain container.
pub const MAGIC_PLAIN: [u8; 4] = *b"YAL1";

/// Magic of an encrypted container.
pub const MAGIC_ENCRYPTED: [u8; 4] = *b"YALC";

/// Length of the magic plus the entry count.
pub const HEADER_LEN: u64 = 4 + 8;

/// Container flavour, as identified by its magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magic {
    Plain,
    Encrypted,
}

impl Magic {
    pub fn from_bytes(bytes: [u8; 4]) -> Result<Self> {
        match bytes {
            MAGIC_PLAIN => Ok(Magic::Plain),
            MAGIC_ENCRYPTED => Ok(Magic::Encrypted),
            other => Err(Error::InvalidMagic(other)),
        }
    }

    pub fn as_bytes(&self) -> &'static [u8; 4] {
        match self {
            Magic::Plain => &MAGIC_PLAIN,
            Magic::Encrypted => &MAGIC_ENCRYPTED,
        }
    }
}

/// Classify a container by its first four bytes.
pub fn read_magic<S: ByteSource + ?Sized>(source: &S) -> Result<Magic> {
    let mut reader = SourceReader::new(source);
    Magic::from_bytes(reader.read_array::<4>()?)
}

/// Serialize a directory and its data blocks into a complete plain container.
///
/// `blocks[i]` holds the compressed bytes of `entries[i]`. All offsets must
/// be final.
pub fn serialize(entries: &[FileEntry], blocks: &[Vec<u8>]) -> Result<Vec<u8>> {
    let directory_len: u64 = entries.iter().map(FileEntry::record_len).sum();
    let capacity = HEADER_LEN + directory_len + entry::data_len(entries);
    let mut out = Vec::with_capacity(capacity as usize);
    write_container(&mut out, entries, blocks)?;
    Ok(out)
}

/// Stream a plain container to `writer`.
///
/// Produces the same bytes as [`serialize`]. Blocks are emitted in ascending
/// offset order, which is their physical order in the data section.
pub fn write_container<W: Write>(
    writer: &mut W,
    entries: &[FileEntry],
    blocks: &[Vec<u8>],
) -> Result<()> {
    validate(entries, blocks)?;

    writer.write_all(Magic::Plain.as_bytes())?;
    writer.write_u64_le(entries.len() as u64)?;
    for entry in entries {
        writer.write_prefixed_bytes(entry.relative_path.as_bytes())?;
        writer.write_u64_le(entry.original_size)?;
        writer.write_u64_le(entry.compressed_size)?;
        writer.write_u64_le(entry.offset)?;
    }

    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by_key(|&i| (entries[i].offset, entries[i].compressed_size));
    for i in order {
        writer.write_all(&blocks[i])?;
    }
    Ok(())
}

fn validate(entries: &[FileEntry], blocks: &[Vec<u8>]) -> Result<()> {
    if entries.len() != blocks.len() {
        return Err(Error::Format(format!(
            "{} entries but {} data blocks",
            entries.len(),
            blocks.len()
        )));
    }
    for (entry, block) in entries.iter().zip(blocks) {
        if block.len() as u64 != entry.compressed_size {
            return Err(Error::Format(format!(
                "block for {:?} is {} bytes, directory records {}",
                entry.relative_path,
                block.len(),
                entry.compressed_size
            )));
        }
    }
    entry::check_layout(entries)?;
    Ok(())
}

/// Parse the directory of a plain container.
///
/// The returned [`Directory::data_start`] is the position immediately after
/// the last record. Encrypted containers must be decrypted first.
pub fn parse<S: ByteSource + ?Sized>(source: &S) -> Result<Directory> {
    let mut reader = SourceReader::new(source);
    match Magic::from_bytes(reader.read_array::<4>()?)? {
        Magic::Plain => {}
        Magic::Encrypted => {
            return Err(Error::Format(
                "container is encrypted; decrypt it before parsing the directory".into(),
            ))
        }
    }

    let count = reader.read_u64()?;
    if count > reader.remaining() / RECORD_FIXED_LEN {
        return Err(Error::Format(format!(
            "entry count {count} cannot fit in the remaining {} bytes",
            reader.remaining()
        )));
    }

    let mut entries = Vec::with_capacity(count as usize);
    for index in 0..count {
        let path = reader.read_prefixed_bytes()?;
        let relative_path = String::from_utf8(path)
            .map_err(|_| Error::Format(format!("entry {index} has a non UTF-8 path")))?;
        entries.push(FileEntry {
            relative_path,
            original_size: reader.read_u64()?,
            compressed_size: reader.read_u64()?,
            offset: reader.read_u64()?,
        });
    }

    Ok(Directory {
        entries,
        data_start: reader.position(),
    })
}

/// The framing of an encrypted container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    pub iv: [u8; IV_LEN],
    pub ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Write `"YALC" | iv | ciphertext`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(Magic::Encrypted.as_bytes())?;
        writer.write_all(&self.iv)?;
        writer.write_all(&self.ciphertext)?;
        Ok(())
    }

    /// Read an envelope, checking the magic.
    pub fn read_from<S: ByteSource + ?Sized>(source: &S) -> Result<Self> {
        let mut reader = SourceReader::new(source);
        match Magic::from_bytes(reader.read_array::<4>()?)? {
            Magic::Encrypted => {}
            Magic::Plain => return Err(Error::Format("container is not encrypted".into())),
        }
        let iv = reader.read_array::<IV_LEN>()?;
        let ciphertext = reader.read_remaining()?;
        Ok(Self { iv, ciphertext })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Vec<FileEntry>, Vec<Vec<u8>>) {
        // blocks were allocated out of index order, as concurrent workers do
        let entries = vec![
            FileEntry {
                relative_path: "a.txt".into(),
                original_size: 5,
                compressed_size: 3,
                offset: 4,
            },
            FileEntry {
                relative_path: "sub/b.bin".into(),
                original_size: 1000,
                compressed_size: 4,
                offset: 0,
            },
        ];
        let blocks = vec![b"AAA".to_vec(), b"BBBB".to_vec()];
        (entries, blocks)
    }

    #[test]
    fn test_serialize_layout() {
        let (entries, blocks) = sample();
        let bytes = serialize(&entries, &blocks).unwrap();

        assert_eq!(&bytes[..4], b"YAL1");
        assert_eq!(&bytes[4..12], &2u64.to_le_bytes());
        assert_eq!(&bytes[12..20], &5u64.to_le_bytes());
        assert_eq!(&bytes[20..25], b"a.txt");

        let dir = parse(&bytes).unwrap();
        assert_eq!(dir.entries, entries);
        let data_start = dir.data_start as usize;
        assert_eq!(data_start, 12 + (32 + 5) + (32 + 9));
        assert_eq!(&bytes[data_start..], b"BBBBAAA");
        assert_eq!(bytes.len() as u64, dir.data_start + dir.data_len());
    }

    #[test]
    fn test_parse_from_slice_and_vec_agree() {
        let (entries, blocks) = sample();
        let bytes = serialize(&entries, &blocks).unwrap();
        assert_eq!(parse(&bytes).unwrap(), parse(bytes.as_slice()).unwrap());
    }

    #[test]
    fn test_empty_container() {
        let bytes = serialize(&[], &[]).unwrap();
        assert_eq!(bytes.len() as u64, HEADER_LEN);
        let dir = parse(&bytes).unwrap();
        assert!(dir.is_empty());
        assert_eq!(dir.data_start, HEADER_LEN);
    }

    #[test]
    fn test_unknown_magic() {
        let mut bytes = serialize(&[], &[]).unwrap();
        bytes[..4].copy_from_slice(b"PK\x03\x04");
        assert!(matches!(parse(&bytes), Err(Error::InvalidMagic(_))));
        assert!(matches!(read_magic(&bytes), Err(Error::InvalidMagic(_))));
    }

    #[test]
    fn test_short_input() {
        assert!(matches!(parse(&b"YA".to_vec()), Err(Error::Format(_))));
    }

    #[test]
    fn test_truncated_directory() {
        let (entries, blocks) = sample();
        let bytes = serialize(&entries, &blocks).unwrap();
        let truncated = bytes[..30].to_vec();
        assert!(matches!(parse(&truncated), Err(Error::Format(_))));
    }

    #[test]
    fn test_oversized_path_length() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"YAL1");
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 40]);
        assert!(matches!(parse(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_absurd_count() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"YAL1");
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(parse(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_encrypted_magic_is_not_parsed() {
        let envelope = EncryptedEnvelope {
            iv: [7u8; IV_LEN],
            ciphertext: vec![1, 2, 3],
        };
        let mut bytes = Vec::new();
        envelope.write_to(&mut bytes).unwrap();

        assert_eq!(read_magic(&bytes).unwrap(), Magic::Encrypted);
        assert!(matches!(parse(&bytes), Err(Error::Format(_))));
        assert_eq!(EncryptedEnvelope::read_from(&bytes).unwrap(), envelope);
    }

    #[test]
    fn test_serialize_rejects_overlap() {
        let (mut entries, blocks) = sample();
        entries[0].offset = 2;
        assert!(matches!(serialize(&entries, &blocks), Err(Error::Format(_))));
    }

    #[test]
    fn test_serialize_rejects_size_mismatch() {
        let (entries, mut blocks) = sample();
        blocks[0].push(0);
        assert!(serialize(&entries, &blocks).is_err());
        assert!(serialize(&entries, &blocks[..1]).is_err());
    }
}
