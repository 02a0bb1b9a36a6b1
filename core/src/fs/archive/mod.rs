//! Zip/rar page sources backed by an extraction cache.

pub mod pipeline;
pub mod reader;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{ExtractionCache, ExtractionProgress, ExtractionStats, PageAvailability};
use crate::config::ReaderConfig;
use crate::error::SourceError;
use crate::types::ContainerKind;

use super::order;
use super::source::{PageSource, checked_index};

pub use pipeline::{CancellationToken, ExtractionOutcome, ExtractionPolicy, run_extraction};
pub use reader::{ArchiveReader, OpenReader, RarReader, ZipReader, open_reader, reader_opener};

/// Archive-backed page source.
///
/// Large archives are extracted completely while opening. Smaller ones start a worker thread
/// that extracts pages in page order; [`PageSource::get_file`] waits for the worker to pass
/// the requested index. The archive reader belongs to the eager burst or to the worker and is
/// never touched by page lookups.
#[derive(Debug)]
pub struct ArchiveSource {
    path: PathBuf,
    kind: ContainerKind,
    pages: Arc<[String]>,
    cache: ExtractionCache,
    progress: Arc<ExtractionProgress>,
    policy: ExtractionPolicy,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<ExtractionOutcome>>>,
    placeholder: PathBuf,
}

impl ArchiveSource {
    /// Open the archive at `path` with the built-in reader for `kind`.
    ///
    /// The entry listing uses a short-lived reader on the calling thread. Extraction opens
    /// its own reader where it runs and keeps it until the last entry.
    pub fn open(
        path: &Path,
        kind: ContainerKind,
        config: &ReaderConfig,
    ) -> Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }
        let compressed_bytes = fs::metadata(path)?.len();
        let names = open_reader(kind, path)
            .and_then(|mut listing| listing.entry_names())
            .map_err(|err| SourceError::unreadable(path, err))?;
        Self::from_parts(path, kind, names, reader_opener(kind, path), compressed_bytes, config)
    }

    /// Open an archive through a caller-supplied reader that lists and extracts.
    ///
    /// `compressed_bytes` selects the extraction policy against the configured threshold.
    pub fn from_reader(
        path: &Path,
        kind: ContainerKind,
        mut reader: Box<dyn ArchiveReader + Send>,
        compressed_bytes: u64,
        config: &ReaderConfig,
    ) -> Result<Self, SourceError> {
        let names = reader.entry_names().map_err(|err| SourceError::unreadable(path, err))?;
        let open: OpenReader = Box::new(move || Ok(reader as Box<dyn ArchiveReader>));
        Self::from_parts(path, kind, names, open, compressed_bytes, config)
    }

    /// Build a source from an entry listing and a deferred reader for extraction.
    pub fn from_parts(
        path: &Path,
        kind: ContainerKind,
        entry_names: Vec<String>,
        open: OpenReader,
        compressed_bytes: u64,
        config: &ReaderConfig,
    ) -> Result<Self, SourceError> {
        let pages: Arc<[String]> = order::order_pages(entry_names, &config.ordering()).into();
        let cache = ExtractionCache::open(&config.scratch_root, path)
            .map_err(|err| SourceError::unreadable(path, err))?;

        let policy = ExtractionPolicy::for_size(compressed_bytes, config.eager_threshold_bytes);
        let progress = Arc::new(ExtractionProgress::new());
        let cancel = CancellationToken::new();

        info!(
            target: "fs::archive",
            path = %path.display(),
            pages = pages.len(),
            ?policy,
            cache = %cache.dir().display(),
            "opened archive"
        );

        let worker = match policy {
            ExtractionPolicy::Eager => {
                let mut reader = open().map_err(|err| SourceError::unreadable(path, err))?;
                let outcome = run_extraction(
                    reader.as_mut(),
                    &pages,
                    &cache,
                    &progress,
                    &CancellationToken::new(),
                    None,
                );
                debug!(target: "fs::archive", ?outcome, stats = ?progress.stats(), "eager extraction done");
                None
            }
            ExtractionPolicy::Background => Some(spawn_worker(
                open,
                Arc::clone(&pages),
                cache.clone(),
                Arc::clone(&progress),
                cancel.clone(),
                config.extraction_cap,
            )?),
        };

        Ok(Self {
            path: path.to_path_buf(),
            kind,
            pages,
            cache,
            progress,
            policy,
            cancel,
            worker: Mutex::new(worker),
            placeholder: config.placeholder.clone(),
        })
    }

    pub fn policy(&self) -> ExtractionPolicy {
        self.policy
    }

    pub fn cache(&self) -> &ExtractionCache {
        &self.cache
    }

    pub fn stats(&self) -> ExtractionStats {
        self.progress.stats()
    }

    /// Stop the background worker before its next entry. Pages already written stay on disk
    /// and lookups for pages it never reached keep waiting until the source is disposed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn resolve(&self, index: usize, availability: PageAvailability) -> PathBuf {
        match availability {
            PageAvailability::Ready => self.cache.page_path(index, &self.pages[index]),
            PageAvailability::Failed | PageAvailability::Closed => self.placeholder.clone(),
        }
    }
}

fn spawn_worker(
    open: OpenReader,
    pages: Arc<[String]>,
    cache: ExtractionCache,
    progress: Arc<ExtractionProgress>,
    cancel: CancellationToken,
    cap: Option<usize>,
) -> Result<JoinHandle<ExtractionOutcome>, SourceError> {
    let handle = thread::Builder::new().name("folio-extract".to_string()).spawn(move || {
        let mut reader = match open() {
            Ok(reader) => reader,
            Err(err) => {
                warn!(target: "fs::archive", "extraction worker could not open archive: {err:#}");
                progress.close();
                return ExtractionOutcome::Unreadable;
            }
        };
        let outcome = run_extraction(reader.as_mut(), &pages, &cache, &progress, &cancel, cap);
        debug!(target: "fs::archive", ?outcome, stats = ?progress.stats(), "extraction worker done");
        outcome
    })?;
    Ok(handle)
}

impl PageSource for ArchiveSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn kind(&self) -> ContainerKind {
        self.kind
    }

    fn pages(&self) -> &[String] {
        &self.pages
    }

    fn get_file(&self, index: isize) -> Option<PathBuf> {
        let index = checked_index(index, self.pages.len())?;
        let availability = self.progress.wait_for(index);
        Some(self.resolve(index, availability))
    }

    fn try_get_file(&self, index: isize) -> Option<PathBuf> {
        let index = checked_index(index, self.pages.len())?;
        let availability = self.progress.status(index)?;
        Some(self.resolve(index, availability))
    }

    fn extraction_progress(&self) -> usize {
        self.progress.extracted()
    }

    fn dispose(&self) {
        self.cancel.cancel();
        self.progress.close();

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            match worker.join() {
                Ok(outcome) => {
                    debug!(target: "fs::archive", path = %self.path.display(), ?outcome, "worker joined")
                }
                Err(_) => warn!(target: "fs::archive", path = %self.path.display(), "extraction worker panicked"),
            }
        }
    }
}

impl Drop for ArchiveSource {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::sync::mpsc::{Receiver, Sender, channel};
    use std::time::Duration;

    /// Reader that hands out one entry per permit received on its channel.
    struct GatedReader {
        names: Vec<String>,
        permits: Receiver<()>,
        broken: Vec<String>,
    }

    impl GatedReader {
        fn new(names: &[&str]) -> (Self, Sender<()>) {
            let (tx, rx) = channel();
            let reader = Self {
                names: names.iter().map(|name| name.to_string()).collect(),
                permits: rx,
                broken: Vec::new(),
            };
            (reader, tx)
        }
    }

    impl ArchiveReader for GatedReader {
        fn entry_names(&mut self) -> crate::Result<Vec<String>> {
            Ok(self.names.clone())
        }

        fn read_entry(&mut self, name: &str) -> crate::Result<Vec<u8>> {
            self.permits.recv().map_err(|_| anyhow!("gate closed"))?;
            if self.broken.iter().any(|broken| broken == name) {
                return Err(anyhow!("corrupt entry {name}"));
            }
            Ok(name.as_bytes().to_vec())
        }
    }

    struct MemoryReader(HashMap<String, Vec<u8>>);

    impl ArchiveReader for MemoryReader {
        fn entry_names(&mut self) -> crate::Result<Vec<String>> {
            Ok(self.0.keys().cloned().collect())
        }

        fn read_entry(&mut self, name: &str) -> crate::Result<Vec<u8>> {
            self.0.get(name).cloned().ok_or_else(|| anyhow!("missing {name}"))
        }
    }

    fn setup() -> (tempfile::TempDir, PathBuf, ReaderConfig) {
        let temp = tempfile::tempdir().unwrap();
        let container = temp.path().join("book.zip");
        fs::write(&container, b"zip").unwrap();
        let config = ReaderConfig::default()
            .with_scratch_root(temp.path().join("scratch"))
            .with_placeholder(temp.path().join("placeholder.png"));
        (temp, container, config)
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("condition not reached");
    }

    #[test]
    fn large_archive_is_extracted_before_open_returns() {
        let (_temp, container, config) = setup();
        let entries = ["3.png", "1.png", "2.png"]
            .iter()
            .map(|name| (name.to_string(), b"page".to_vec()))
            .collect();
        let config = config.with_eager_threshold(40 * 1024 * 1024);

        let source = ArchiveSource::from_reader(
            &container,
            ContainerKind::Rar,
            Box::new(MemoryReader(entries)),
            50 * 1024 * 1024,
            &config,
        )
        .unwrap();

        assert_eq!(source.policy(), ExtractionPolicy::Eager);
        assert_eq!(source.extraction_progress(), source.total_pages());
        assert_eq!(source.pages(), ["1.png", "2.png", "3.png"]);
        assert_eq!(source.try_get_file(2), Some(source.cache().dir().join("2.png")));
    }

    #[test]
    fn get_file_waits_for_worker_to_pass_index() {
        let (_temp, container, config) = setup();
        let (reader, permits) = GatedReader::new(&["1.png", "2.png"]);
        let source = Arc::new(
            ArchiveSource::from_reader(&container, ContainerKind::Zip, Box::new(reader), 5, &config)
                .unwrap(),
        );
        assert_eq!(source.policy(), ExtractionPolicy::Background);
        assert_eq!(source.try_get_file(0), None);

        let lookup = {
            let source = Arc::clone(&source);
            thread::spawn(move || source.get_file(0))
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!lookup.is_finished());

        permits.send(()).unwrap();
        let path = lookup.join().unwrap().unwrap();
        assert_eq!(path, source.cache().dir().join("0.png"));
        assert_eq!(fs::read(&path).unwrap(), b"1.png");
        assert_eq!(source.get_file(0), Some(path));

        permits.send(()).unwrap();
        wait_until(|| source.extraction_progress() == 2);
        assert_eq!(source.get_file(-1), None);
        assert_eq!(source.get_file(2), None);
    }

    #[test]
    fn cancelled_worker_freezes_progress_until_disposed() {
        let (_temp, container, config) = setup();
        let (reader, permits) = GatedReader::new(&["1.png", "2.png", "3.png", "4.png"]);
        let source = Arc::new(
            ArchiveSource::from_reader(&container, ContainerKind::Zip, Box::new(reader), 5, &config)
                .unwrap(),
        );

        permits.send(()).unwrap();
        wait_until(|| source.extraction_progress() == 1);
        source.cancel();
        permits.send(()).unwrap();
        drop(permits);
        thread::sleep(Duration::from_millis(30));
        let frozen = source.extraction_progress();
        assert!(frozen <= 2);

        let lookup = {
            let source = Arc::clone(&source);
            thread::spawn(move || source.get_file(3))
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!lookup.is_finished());
        assert_eq!(source.extraction_progress(), frozen);

        source.dispose();
        assert_eq!(lookup.join().unwrap(), Some(config.placeholder.clone()));
        assert_eq!(source.get_file(0), Some(source.cache().dir().join("0.png")));
    }

    #[test]
    fn failed_entry_resolves_to_placeholder() {
        let (_temp, container, config) = setup();
        let (mut reader, permits) = GatedReader::new(&["1.png", "2.png"]);
        reader.broken.push("1.png".to_string());
        let source =
            ArchiveSource::from_reader(&container, ContainerKind::Zip, Box::new(reader), 5, &config)
                .unwrap();

        permits.send(()).unwrap();
        permits.send(()).unwrap();
        assert_eq!(source.get_file(0), Some(config.placeholder.clone()));
        assert_eq!(source.get_file(1), Some(source.cache().dir().join("1.png")));
        assert_eq!(source.stats().failed, 1);
        assert_eq!(source.get_file(0), Some(config.placeholder.clone()));
    }

    #[test]
    fn extraction_cap_stops_worker() {
        let (_temp, container, config) = setup();
        let config = config.with_extraction_cap(Some(1));
        let (reader, permits) = GatedReader::new(&["1.png", "2.png"]);
        let source =
            ArchiveSource::from_reader(&container, ContainerKind::Zip, Box::new(reader), 5, &config)
                .unwrap();

        permits.send(()).unwrap();
        assert!(source.get_file(0).is_some());
        let _ = permits.send(());
        thread::sleep(Duration::from_millis(20));
        assert_eq!(source.extraction_progress(), 1);
        assert_eq!(source.try_get_file(1), None);
    }

    #[test]
    fn empty_archive_opens_with_no_pages() {
        let (_temp, container, config) = setup();
        let (reader, _permits) = GatedReader::new(&["notes.txt"]);
        let source =
            ArchiveSource::from_reader(&container, ContainerKind::Zip, Box::new(reader), 5, &config)
                .unwrap();
        assert_eq!(source.total_pages(), 0);
        assert_eq!(source.get_file(0), None);
        assert!(!source.is_folder());
    }

    #[test]
    fn worker_that_cannot_open_its_reader_serves_placeholders() {
        let (_temp, container, config) = setup();
        let names = vec!["1.png".to_string(), "2.png".to_string()];
        let open: OpenReader = Box::new(|| Err(anyhow!("archive vanished")));
        let source =
            ArchiveSource::from_parts(&container, ContainerKind::Rar, names, open, 5, &config)
                .unwrap();

        assert_eq!(source.total_pages(), 2);
        assert_eq!(source.get_file(1), Some(config.placeholder.clone()));
        assert_eq!(source.extraction_progress(), 0);
    }

    #[test]
    fn eager_open_reports_unreadable_reader() {
        let (_temp, container, config) = setup();
        let open: OpenReader = Box::new(|| Err(anyhow!("archive vanished")));
        let err = ArchiveSource::from_parts(
            &container,
            ContainerKind::Rar,
            vec!["1.png".to_string()],
            open,
            50 * 1024 * 1024,
            &config,
        )
        .expect_err("eager burst needs a reader");
        assert!(matches!(err, SourceError::Unreadable { .. }));
    }

    #[test]
    fn missing_archive_is_not_found() {
        let (temp, _container, config) = setup();
        let err = ArchiveSource::open(&temp.path().join("gone.zip"), ContainerKind::Zip, &config)
            .expect_err("missing archive");
        assert!(matches!(err, SourceError::NotFound(_)));
    }
}
