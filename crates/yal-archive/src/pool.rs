//! Worker pool sizing.

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{Error, Result};

/// Worker count used when hardware parallelism cannot be detected.
pub const FALLBACK_THREADS: usize = 4;

/// Number of workers to use when none is configured.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_THREADS)
}

/// Build the fixed pool for one operation.
///
/// `threads == 0` selects [`default_threads`].
pub(crate) fn build(threads: usize, name: &'static str) -> Result<ThreadPool> {
    let threads = if threads == 0 { default_threads() } else { threads };
    tracing::debug!(threads, "starting {name} worker pool");
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(move |i| format!("yal-{name}-{i}"))
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threads_nonzero() {
        assert!(default_threads() >= 1);
    }

    #[test]
    fn test_build_explicit_size() {
        let pool = build(3, "test").unwrap();
        assert_eq!(pool.current_num_threads(), 3);
    }
}
