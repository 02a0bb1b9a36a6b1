//! Extraction progress shared between the extraction worker and page lookups.

use std::collections::BTreeSet;

use parking_lot::{Condvar, Mutex};

/// Outcome of waiting for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAvailability {
    /// The page is on disk.
    Ready,
    /// Extraction of the page failed; it stays unavailable for the session.
    Failed,
    /// The source was disposed before the page was reached.
    Closed,
}

/// Counters reported by an archive backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractionStats {
    /// Pages processed so far, in page order. Drives page availability.
    pub extracted: usize,
    /// Pages decompressed and written during this session.
    pub written: usize,
    /// Pages already present in the cache directory.
    pub reused: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct ProgressState {
    stats: ExtractionStats,
    failed: BTreeSet<usize>,
    closed: bool,
}

/// Monotonic page counter with a completion signal.
///
/// The worker processes pages strictly in order, so "page `i` is available" is equivalent to
/// "more than `i` pages were processed". Waiters block on a condition variable that is notified
/// after every processed page and once more when the source closes.
#[derive(Debug, Default)]
pub struct ExtractionProgress {
    state: Mutex<ProgressState>,
    changed: Condvar,
}

impl ExtractionProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_written(&self) {
        self.update(|state| state.stats.written += 1);
    }

    pub fn record_reused(&self) {
        self.update(|state| state.stats.reused += 1);
    }

    pub fn record_failed(&self, index: usize) {
        self.update(|state| {
            state.stats.failed += 1;
            state.failed.insert(index);
        });
    }

    /// Number of pages processed so far.
    pub fn extracted(&self) -> usize {
        self.state.lock().stats.extracted
    }

    pub fn stats(&self) -> ExtractionStats {
        self.state.lock().stats
    }

    /// Wake every waiter; pages not yet reached resolve to [`PageAvailability::Closed`].
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.changed.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Non-blocking availability check. `None` means the page has not been reached yet.
    pub fn status(&self, index: usize) -> Option<PageAvailability> {
        let state = self.state.lock();
        Self::resolve(&state, index)
    }

    /// Block until the page at `index` was processed or the source closed.
    pub fn wait_for(&self, index: usize) -> PageAvailability {
        let mut state = self.state.lock();
        loop {
            if let Some(availability) = Self::resolve(&state, index) {
                return availability;
            }
            self.changed.wait(&mut state);
        }
    }

    fn resolve(state: &ProgressState, index: usize) -> Option<PageAvailability> {
        if state.stats.extracted > index {
            if state.failed.contains(&index) {
                Some(PageAvailability::Failed)
            } else {
                Some(PageAvailability::Ready)
            }
        } else if state.closed {
            Some(PageAvailability::Closed)
        } else {
            None
        }
    }

    fn update(&self, f: impl FnOnce(&mut ProgressState)) {
        let mut state = self.state.lock();
        f(&mut state);
        state.stats.extracted += 1;
        self.changed.notify_all();
    }
}
