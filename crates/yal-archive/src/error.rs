//! Error types for the YAL archive crate.

use thiserror::Error;

/// Errors that can occur when packing, unpacking or reading YAL containers.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the container, an input file or an output file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The leading four bytes are not a known container magic.
    #[error("invalid container magic: {0:02x?}")]
    InvalidMagic([u8; 4]),

    /// Malformed or truncated container structure.
    #[error("format error: {0}")]
    Format(String),

    /// Key derivation, random generation or cipher failure.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The container is encrypted and no usable password was supplied.
    #[error("container is encrypted; a non-empty password is required")]
    PasswordRequired,

    /// The compressor rejected its input.
    #[error("compression error: {0}")]
    Compression(String),

    /// Compressed data did not decode to the recorded size.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// The worker pool could not be started.
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Format,
    Crypto,
    CorruptData,
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::ThreadPool(_) => ErrorKind::Io,
            Error::InvalidMagic(_) | Error::Format(_) => ErrorKind::Format,
            Error::Crypto(_) | Error::PasswordRequired => ErrorKind::Crypto,
            Error::Compression(_) | Error::CorruptData(_) => ErrorKind::CorruptData,
        }
    }
}

impl From<yal_common::Error> for Error {
    fn from(err: yal_common::Error) -> Self {
        match err {
            yal_common::Error::UnexpectedEof { needed, available } => Error::Format(format!(
                "truncated container: needed {needed} bytes but only {available} available"
            )),
            yal_common::Error::Io(e) => Error::Io(e),
        }
    }
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_maps_to_format() {
        let err: Error = yal_common::Error::UnexpectedEof {
            needed: 8,
            available: 3,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("needed 8"));
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::PasswordRequired.kind(), ErrorKind::Crypto);
        assert_eq!(Error::InvalidMagic(*b"ZIP!").kind(), ErrorKind::Format);
        assert_eq!(
            Error::CorruptData("size mismatch".into()).kind(),
            ErrorKind::CorruptData
        );
    }
}
