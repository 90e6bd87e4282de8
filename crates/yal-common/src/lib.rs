//! Common utilities for YAL.
//!
//! This crate provides the byte-level building blocks shared by the YAL crates:
//!
//! - [`ByteSource`] - random-access reads, implemented by [`FileSource`] and
//!   by in-memory buffers
//! - [`SourceReader`] - a bounds-checked cursor over any byte source
//! - [`WriteExt`] - little-endian write helpers

mod error;
mod reader;
mod source;
mod writer;

pub use error::{Error, Result};
pub use reader::SourceReader;
pub use source::{ByteSource, FileSource};
pub use writer::WriteExt;
