//! Error types for yal-common.

use thiserror::Error;

/// Common error type for YAL binary I/O.
#[derive(Debug, Error)]
pub enum Error {
    /// End of source reached while reading.
    #[error("unexpected end of data: needed {needed} bytes but only {available} available")]
    UnexpectedEof { needed: u64, available: u64 },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
