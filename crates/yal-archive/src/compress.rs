//! Zstandard block compression.

use crate::{Error, Result};

/// Compression level used when none is configured.
pub const DEFAULT_LEVEL: i32 = 3;

/// Compress `data` into a buffer sized to the worst-case bound, then shrink
/// it to the bytes actually written.
pub fn compress_bounded(data: &[u8], level: i32) -> Result<Vec<u8>> {
    let bound = zstd::zstd_safe::compress_bound(data.len());
    let mut output = vec![0u8; bound];
    let written = zstd::bulk::compress_to_buffer(data, &mut output, level)
        .map_err(|e| Error::Compression(e.to_string()))?;
    output.truncate(written);
    Ok(output)
}

/// Largest decoded size of one zstd block.
const MAX_BLOCK_LEN: u64 = 128 * 1024;

/// Upper bound on what `compressed_len` bytes of zstd can decode to.
///
/// Every block costs at least a three byte header and yields at most
/// [`MAX_BLOCK_LEN`] bytes.
fn decoded_ceiling(compressed_len: usize) -> u64 {
    (compressed_len as u64 / 3 + 1).saturating_mul(MAX_BLOCK_LEN)
}

/// Decompress `data` into a buffer of exactly `expected_len` bytes.
///
/// Fails with [`Error::CorruptData`] if the frame is invalid, declares a
/// different size, cannot possibly decode to `expected_len`, or decodes to
/// fewer bytes. The size is checked before anything is allocated.
pub fn decompress_exact(data: &[u8], expected_len: u64) -> Result<Vec<u8>> {
    match zstd::zstd_safe::get_frame_content_size(data) {
        Ok(Some(declared)) if declared != expected_len => {
            return Err(Error::CorruptData(format!(
                "frame declares {declared} bytes, expected {expected_len}"
            )))
        }
        Ok(_) => {}
        Err(_) => return Err(Error::CorruptData("not a zstd frame".into())),
    }

    let ceiling = decoded_ceiling(data.len());
    if expected_len > ceiling {
        return Err(Error::CorruptData(format!(
            "{} compressed bytes cannot decode to {expected_len} bytes",
            data.len()
        )));
    }
    let expected = usize::try_from(expected_len)
        .map_err(|_| Error::CorruptData(format!("size {expected_len} exceeds address space")))?;

    let mut output = Vec::new();
    output
        .try_reserve_exact(expected)
        .map_err(|e| Error::CorruptData(format!("cannot allocate {expected} bytes: {e}")))?;
    output.resize(expected, 0);

    let written = zstd::bulk::decompress_to_buffer(data, &mut output)
        .map_err(|e| Error::CorruptData(e.to_string()))?;
    if written != expected {
        return Err(Error::CorruptData(format!(
            "decompressed {written} bytes, expected {expected}"
        )));
    }
    Ok(output)
}
