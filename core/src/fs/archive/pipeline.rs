//! Extraction of archive entries into the per-container cache.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::Result;
use crate::cache::{ExtractionCache, ExtractionProgress};

use super::reader::ArchiveReader;

/// When entries are extracted relative to the container becoming usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionPolicy {
    /// Every page is extracted before the source is returned.
    Eager,
    /// A worker thread extracts pages in order while the source is in use.
    Background,
}

impl ExtractionPolicy {
    /// Archives strictly larger than `eager_threshold` bytes are extracted eagerly; seeking
    /// backwards in large sequential-seek archives is slow.
    pub fn for_size(compressed_bytes: u64, eager_threshold: u64) -> Self {
        if compressed_bytes > eager_threshold {
            ExtractionPolicy::Eager
        } else {
            ExtractionPolicy::Background
        }
    }
}

/// Cooperative cancellation signal handed to an extraction run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// How an extraction run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Completed,
    Cancelled,
    Capped,
    /// The worker could not open its archive reader.
    Unreadable,
}

/// Read one entry and write it to `<cache-dir>/<index><ext>`.
pub fn extract_entry(
    reader: &mut dyn ArchiveReader,
    cache: &ExtractionCache,
    index: usize,
    name: &str,
) -> Result<PathBuf> {
    let bytes = reader.read_entry(name)?;
    cache.write(index, name, &bytes)
}

/// Extract `pages` strictly in order, advancing `progress` after each one.
///
/// Pages already in the cache are skipped without touching the reader. A failing entry is
/// logged and recorded as failed; the run carries on with the next one. `cancel` is checked
/// before every entry and `cap` stops the run once that many pages were processed.
pub fn run_extraction(
    reader: &mut dyn ArchiveReader,
    pages: &[String],
    cache: &ExtractionCache,
    progress: &ExtractionProgress,
    cancel: &CancellationToken,
    cap: Option<usize>,
) -> ExtractionOutcome {
    for (index, name) in pages.iter().enumerate() {
        if cancel.is_cancelled() {
            debug!(target: "fs::extract", index, "extraction cancelled");
            return ExtractionOutcome::Cancelled;
        }
        if cap.is_some_and(|cap| progress.extracted() >= cap) {
            debug!(target: "fs::extract", index, "extraction cap reached");
            return ExtractionOutcome::Capped;
        }

        if cache.contains(index, name) {
            progress.record_reused();
            continue;
        }

        match extract_entry(reader, cache, index, name) {
            Ok(path) => {
                debug!(target: "fs::extract", index, path = %path.display(), "extracted page");
                progress.record_written();
            }
            Err(err) => {
                warn!(target: "fs::extract", index, entry = %name, "failed to extract page: {err:#}");
                progress.record_failed(index);
            }
        }
    }

    ExtractionOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ExtractionStats, PageAvailability};
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::fs;

    #[derive(Debug, Default)]
    struct MemoryReader {
        entries: HashMap<String, Vec<u8>>,
        reads: Vec<String>,
    }

    impl MemoryReader {
        fn with(names: &[&str]) -> Self {
            let entries =
                names.iter().map(|name| (name.to_string(), name.as_bytes().to_vec())).collect();
            Self { entries, reads: Vec::new() }
        }
    }

    impl ArchiveReader for MemoryReader {
        fn entry_names(&mut self) -> Result<Vec<String>> {
            Ok(self.entries.keys().cloned().collect())
        }

        fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
            self.reads.push(name.to_string());
            self.entries.get(name).cloned().ok_or_else(|| anyhow!("corrupt entry {name}"))
        }
    }

    fn fixture() -> (tempfile::TempDir, ExtractionCache) {
        let temp = tempfile::tempdir().unwrap();
        let container = temp.path().join("book.zip");
        fs::write(&container, b"zip").unwrap();
        let cache = ExtractionCache::open(&temp.path().join("scratch"), &container).unwrap();
        (temp, cache)
    }

    fn pages(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn policy_threshold_is_exclusive() {
        assert_eq!(ExtractionPolicy::for_size(41, 40), ExtractionPolicy::Eager);
        assert_eq!(ExtractionPolicy::for_size(40, 40), ExtractionPolicy::Background);
    }

    #[test]
    fn extracts_every_page_in_order() {
        let (_temp, cache) = fixture();
        let pages = pages(&["1.png", "2.png", "3.jpg"]);
        let mut reader = MemoryReader::with(&["1.png", "2.png", "3.jpg"]);
        let progress = ExtractionProgress::new();

        let outcome =
            run_extraction(&mut reader, &pages, &cache, &progress, &CancellationToken::new(), None);

        assert_eq!(outcome, ExtractionOutcome::Completed);
        assert_eq!(reader.reads, pages);
        assert_eq!(progress.extracted(), 3);
        assert_eq!(fs::read(cache.page_path(2, "3.jpg")).unwrap(), b"3.jpg");
    }

    #[test]
    fn failing_entry_is_recorded_and_skipped() {
        let (_temp, cache) = fixture();
        let pages = pages(&["1.png", "2.png", "3.png"]);
        let mut reader = MemoryReader::with(&["1.png", "3.png"]);
        let progress = ExtractionProgress::new();

        run_extraction(&mut reader, &pages, &cache, &progress, &CancellationToken::new(), None);

        assert_eq!(progress.stats(), ExtractionStats { extracted: 3, written: 2, reused: 0, failed: 1 });
        assert_eq!(progress.status(1), Some(PageAvailability::Failed));
        assert!(cache.contains(2, "3.png"));
    }

    #[test]
    fn cached_pages_are_not_read_again() {
        let (_temp, cache) = fixture();
        let pages = pages(&["1.png", "2.png"]);
        cache.write(0, "1.png", b"cached").unwrap();

        let mut reader = MemoryReader::with(&["1.png", "2.png"]);
        let progress = ExtractionProgress::new();
        run_extraction(&mut reader, &pages, &cache, &progress, &CancellationToken::new(), None);

        assert_eq!(reader.reads, vec!["2.png"]);
        assert_eq!(progress.stats().reused, 1);
        assert_eq!(fs::read(cache.page_path(0, "1.png")).unwrap(), b"cached");
    }

    #[test]
    fn cancelled_token_stops_before_next_entry() {
        let (_temp, cache) = fixture();
        let pages = pages(&["1.png", "2.png"]);
        let mut reader = MemoryReader::with(&["1.png", "2.png"]);
        let progress = ExtractionProgress::new();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = run_extraction(&mut reader, &pages, &cache, &progress, &token, None);
        assert_eq!(outcome, ExtractionOutcome::Cancelled);
        assert!(reader.reads.is_empty());
        assert_eq!(progress.extracted(), 0);
    }

    #[test]
    fn cap_limits_progress() {
        let (_temp, cache) = fixture();
        let pages = pages(&["1.png", "2.png", "3.png"]);
        let mut reader = MemoryReader::with(&["1.png", "2.png", "3.png"]);
        let progress = ExtractionProgress::new();

        let outcome =
            run_extraction(&mut reader, &pages, &cache, &progress, &CancellationToken::new(), Some(2));
        assert_eq!(outcome, ExtractionOutcome::Capped);
        assert_eq!(progress.extracted(), 2);
        assert!(!cache.contains(2, "3.png"));
    }
}
