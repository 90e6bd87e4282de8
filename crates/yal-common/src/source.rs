//! Seekable byte sources.
//!
//! A [`ByteSource`] is anything that can serve exact reads at an absolute
//! offset. Containers are parsed against this capability only, so the same
//! code handles a container on disk and one that was decrypted into memory.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use parking_lot::Mutex;

/// Random-access, read-only byte storage.
///
/// Implementations must be safe to share between worker threads; every read
/// carries its own offset, so there is no shared cursor to race on.
pub trait ByteSource: Send + Sync {
    /// Total length in bytes.
    fn len(&self) -> u64;

    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Fails with [`io::ErrorKind::UnexpectedEof`] if the range extends past
    /// the end of the source.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Check if the source holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read `len` bytes at `offset` into a new buffer.
    fn read_vec_at(&self, offset: u64, len: u64) -> io::Result<Vec<u8>> {
        check_range(offset, len, self.len())?;
        let mut buf = vec![0u8; len as usize];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }
}

fn check_range(offset: u64, len: u64, total: u64) -> io::Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= total => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("range {offset}+{len} exceeds source length {total}"),
        )),
    }
}

impl ByteSource for [u8] {
    #[inline]
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        check_range(offset, buf.len() as u64, ByteSource::len(self))?;
        let start = offset as usize;
        buf.copy_from_slice(&self[start..start + buf.len()]);
        Ok(())
    }
}

impl ByteSource for Vec<u8> {
    #[inline]
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    #[inline]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.as_slice().read_at(offset, buf)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &S {
    #[inline]
    fn len(&self) -> u64 {
        (**self).len()
    }

    #[inline]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_at(offset, buf)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    #[inline]
    fn len(&self) -> u64 {
        (**self).len()
    }

    #[inline]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_at(offset, buf)
    }
}

/// A file handle exposed as a [`ByteSource`].
///
/// The handle sits behind a mutex; a read holds the lock across its seek and
/// read so concurrent callers never observe each other's cursor.
#[derive(Debug)]
pub struct FileSource {
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    /// Open a file for positional reads.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::new(File::open(path)?)
    }

    /// Wrap an already open file.
    pub fn new(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }
}

impl ByteSource for FileSource {
    #[inline]
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        check_range(offset, buf.len() as u64, self.len)?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }
}
