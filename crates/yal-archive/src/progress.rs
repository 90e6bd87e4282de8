//! Progress reporting.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives `(completed, total)` counts as files finish.
///
/// Called from worker threads, possibly out of order; `completed` is taken
/// from a shared counter so it never repeats.
pub trait Progress: Send + Sync {
    fn on_progress(&self, completed: usize, total: usize);
}

/// A sink that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    #[inline]
    fn on_progress(&self, _completed: usize, _total: usize) {}
}

impl<F> Progress for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    #[inline]
    fn on_progress(&self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Shared completion counter feeding a [`Progress`] sink.
pub(crate) struct Tracker<'a> {
    done: AtomicUsize,
    total: usize,
    sink: &'a dyn Progress,
}

impl<'a> Tracker<'a> {
    pub(crate) fn new(total: usize, sink: &'a dyn Progress) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total,
            sink,
        }
    }

    /// Count one finished file, successful or not.
    pub(crate) fn tick(&self) {
        let completed = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        self.sink.on_progress(completed, self.total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_tracker_counts() {
        let seen = Mutex::new(Vec::new());
        let sink = |done: usize, total: usize| seen.lock().unwrap().push((done, total));
        let tracker = Tracker::new(3, &sink);

        tracker.tick();
        tracker.tick();
        tracker.tick();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }
}
