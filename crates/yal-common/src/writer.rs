//! Little-endian write helpers.

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

/// Extension methods for writing container fields to any [`Write`].
pub trait WriteExt: Write {
    /// Write a little-endian u64.
    #[inline]
    fn write_u64_le(&mut self, value: u64) -> io::Result<()> {
        self.write_u64::<LittleEndian>(value)
    }

    /// Write a u64 length prefix followed by the bytes themselves.
    fn write_prefixed_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_u64_le(bytes.len() as u64)?;
        self.write_all(bytes)
    }
}

impl<W: Write + ?Sized> WriteExt for W {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceReader;

    #[test]
    fn test_prefixed_bytes_layout() {
        let mut out = Vec::new();
        out.write_prefixed_bytes(b"sub/b.bin").unwrap();
        assert_eq!(out.len(), 8 + 9);
        assert_eq!(&out[..8], &9u64.to_le_bytes());

        let mut reader = SourceReader::new(&out);
        assert_eq!(reader.read_prefixed_bytes().unwrap(), b"sub/b.bin");
    }
}
