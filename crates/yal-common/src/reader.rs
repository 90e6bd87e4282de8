//! Cursor-style reader over a [`ByteSource`].
//!
//! [`SourceReader`] keeps a position and reads little-endian values from any
//! byte source. Every read checks the remaining length first, so a corrupt
//! length field fails cleanly instead of triggering a huge allocation.

use std::io::{self, Read, Seek, SeekFrom};

use crate::{ByteSource, Error, Result};

/// A positioned reader over a byte source.
///
/// # Example
///
/// ```
/// use yal_common::SourceReader;
///
/// let data = vec![0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xAA];
/// let mut reader = SourceReader::new(&data);
///
/// assert_eq!(reader.read_u64().unwrap(), 1);
/// assert_eq!(reader.read_bytes(1).unwrap(), vec![0xAA]);
/// assert!(reader.is_empty());
/// ```
#[derive(Debug)]
pub struct SourceReader<'a, S: ByteSource + ?Sized> {
    source: &'a S,
    position: u64,
}

impl<'a, S: ByteSource + ?Sized> SourceReader<'a, S> {
    /// Create a new reader positioned at the start of the source.
    #[inline]
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    /// Get the current position.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Get the total length of the underlying source.
    #[inline]
    pub fn len(&self) -> u64 {
        self.source.len()
    }

    /// Get the number of bytes remaining to read.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.source.len().saturating_sub(self.position)
    }

    /// Check if there are no more bytes to read.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn ensure(&self, count: u64) -> Result<()> {
        if self.remaining() < count {
            return Err(Error::UnexpectedEof {
                needed: count,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Read a fixed-size array and advance the position.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure(N as u64)?;
        let mut out = [0u8; N];
        self.source.read_at(self.position, &mut out)?;
        self.position += N as u64;
        Ok(out)
    }

    /// Read `count` bytes into a new buffer and advance the position.
    pub fn read_bytes(&mut self, count: u64) -> Result<Vec<u8>> {
        self.ensure(count)?;
        let bytes = self.source.read_vec_at(self.position, count)?;
        self.position += count;
        Ok(bytes)
    }

    /// Read a little-endian u64.
    #[inline]
    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_array::<8>().map(u64::from_le_bytes)
    }

    /// Read a u64 length prefix followed by that many bytes.
    pub fn read_prefixed_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u64()?;
        self.read_bytes(len)
    }

    /// Read everything from the current position to the end of the source.
    pub fn read_remaining(&mut self) -> Result<Vec<u8>> {
        let count = self.remaining();
        self.read_bytes(count)
    }
}

impl<S: ByteSource + ?Sized> Read for SourceReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = (buf.len() as u64).min(self.remaining()) as usize;
        if n == 0 {
            return Ok(0);
        }
        self.source.read_at(self.position, &mut buf[..n])?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<S: ByteSource + ?Sized> Seek for SourceReader<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(delta) => self.source.len().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek to a negative position")
        })?;
        self.position = target;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x0807060504030201u64.to_le_bytes());
        data.extend_from_slice(&u64::MAX.to_le_bytes());
        let mut reader = SourceReader::new(&data);

        assert_eq!(reader.read_u64().unwrap(), 0x0807060504030201);
        assert_eq!(reader.read_u64().unwrap(), u64::MAX);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_prefixed_bytes() {
        let mut data = Vec::new();
        data.extend_from_slice(&5u64.to_le_bytes());
        data.extend_from_slice(b"hello");
        let mut reader = SourceReader::new(&data);

        assert_eq!(reader.read_prefixed_bytes().unwrap(), b"hello");
        assert_eq!(reader.position(), 13);
    }

    #[test]
    fn test_oversized_length_is_eof() {
        let mut data = Vec::new();
        data.extend_from_slice(&u64::MAX.to_le_bytes());
        let mut reader = SourceReader::new(&data);

        match reader.read_prefixed_bytes() {
            Err(Error::UnexpectedEof { needed, available }) => {
                assert_eq!(needed, u64::MAX);
                assert_eq!(available, 0);
            }
            other => panic!("expected eof, got {other:?}"),
        }
    }

    #[test]
    fn test_io_read_and_seek() {
        let data = b"abcdef".to_vec();
        let mut reader = SourceReader::new(&data);

        reader.seek(SeekFrom::End(-2)).unwrap();
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "ef");

        reader.seek(SeekFrom::Start(1)).unwrap();
        reader.seek(SeekFrom::Current(1)).unwrap();
        assert_eq!(reader.read_array::<2>().unwrap(), *b"cd");
        assert!(reader.seek(SeekFrom::Current(-10)).is_err());
    }
}
