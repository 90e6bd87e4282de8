//! Directory records.

use crate::{Error, Result};

/// Fixed bytes per directory record, excluding the path itself.
pub const RECORD_FIXED_LEN: u64 = 8 * 4;

/// One file stored in a container.
///
/// `offset` is relative to the start of the data section, not the start of
/// the container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileEntry {
    /// Path relative to the packed root, `/`-separated.
    pub relative_path: String,
    /// Size of the file before compression.
    pub original_size: u64,
    /// Size of the compressed block in the data section.
    pub compressed_size: u64,
    /// Start of the compressed block within the data section.
    pub offset: u64,
}

impl FileEntry {
    /// Exclusive end of this entry's data range, `None` on overflow.
    #[inline]
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.compressed_size)
    }

    /// Serialized size of this record in the directory.
    #[inline]
    pub fn record_len(&self) -> u64 {
        RECORD_FIXED_LEN + self.relative_path.len() as u64
    }
}

/// A parsed container directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    /// Entries in stored order.
    pub entries: Vec<FileEntry>,
    /// Absolute position of the data section within the plain container.
    pub data_start: u64,
}

impl Directory {
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all compressed sizes, i.e. the expected data section length.
    pub fn data_len(&self) -> u64 {
        data_len(&self.entries)
    }

    /// Find an entry by its relative path.
    pub fn find(&self, path: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.relative_path == path)
    }
}

/// Sum of compressed sizes across `entries`.
pub fn data_len(entries: &[FileEntry]) -> u64 {
    entries.iter().map(|e| e.compressed_size).sum()
}

/// Check that the data ranges of `entries` tile `[0, total)` exactly.
///
/// Sorted by offset, each range must start where the previous one ended.
/// Returns the total covered length.
pub fn check_layout(entries: &[FileEntry]) -> Result<u64> {
    let mut order: Vec<&FileEntry> = entries.iter().collect();
    order.sort_by_key(|e| (e.offset, e.compressed_size));

    let mut cursor = 0u64;
    for entry in order {
        if entry.offset != cursor {
            return Err(Error::Format(format!(
                "data range of {:?} starts at {} but previous range ends at {}",
                entry.relative_path, entry.offset, cursor
            )));
        }
        cursor = entry.end().ok_or_else(|| {
            Error::Format(format!("data range of {:?} overflows", entry.relative_path))
        })?;
    }
    Ok(cursor)
}

/// Reassign offsets so blocks are laid out back to back in index order.
pub fn relayout(entries: &mut [FileEntry]) {
    let mut cursor = 0u64;
    for entry in entries {
        entry.offset = cursor;
        cursor += entry.compressed_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, offset: u64, size: u64) -> FileEntry {
        FileEntry {
            relative_path: path.to_string(),
            original_size: size * 2,
            compressed_size: size,
            offset,
        }
    }

    #[test]
    fn test_layout_out_of_order_is_valid() {
        let entries = vec![entry("b", 10, 5), entry("a", 0, 10), entry("c", 15, 1)];
        assert_eq!(check_layout(&entries).unwrap(), 16);
    }

    #[test]
    fn test_layout_gap_and_overlap() {
        let gap = vec![entry("a", 0, 10), entry("b", 11, 5)];
        assert!(check_layout(&gap).is_err());

        let overlap = vec![entry("a", 0, 10), entry("b", 9, 5)];
        assert!(check_layout(&overlap).is_err());
    }

    #[test]
    fn test_empty_blocks_share_offsets() {
        // zero-length blocks never appear in practice but must not break the check
        let entries = vec![entry("a", 0, 0), entry("b", 0, 4)];
        assert_eq!(check_layout(&entries).unwrap(), 4);
    }

    #[test]
    fn test_relayout() {
        let mut entries = vec![entry("a", 7, 3), entry("b", 0, 7)];
        relayout(&mut entries);
        assert_eq!(entries[0].offset, 0);
        assert_eq!(entries[1].offset, 3);
        assert_eq!(check_layout(&entries).unwrap(), 10);
    }

    #[test]
    fn test_overflowing_range() {
        let entries = vec![entry("a", 0, 8), entry("b", 8, u64::MAX)];
        assert_eq!(entries[1].end(), None);
        assert!(matches!(check_layout(&entries), Err(Error::Format(_))));
    }

    #[test]
    fn test_record_len() {
        assert_eq!(entry("a.txt", 0, 1).record_len(), 32 + 5);
    }
}
