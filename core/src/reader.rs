//! Reading session: the active container, its navigator, and container replacement.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{ScanCache, container_key};
use crate::config::ReaderConfig;
use crate::error::{NavigationError, SourceError};
use crate::fs::{self, FolderSource, PageSource};
use crate::nav::Navigator;
use crate::types::{ContainerKind, Direction, PageSize, Step};

/// Receives the container path once a container counts as browsed.
pub type BrowsedSink = Arc<dyn Fn(&Path) + Send + Sync>;

/// One reading session. At most one container is active at a time.
///
/// Opening a container that fails leaves the active one untouched. Opening one that succeeds
/// disposes the previous source, which stops its extraction worker and releases any thread
/// blocked in [`PageSource::get_file`] on it.
///
/// An archive that maps to the active archive's cache directory is the exception: the active
/// source is closed before loading, so only one worker ever writes to that directory. If
/// that reopen fails, no container is active afterwards.
pub struct Reader {
    config: ReaderConfig,
    scans: ScanCache,
    source: Option<Arc<dyn PageSource>>,
    navigator: Navigator,
    browsed_sink: Option<BrowsedSink>,
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("config", &self.config)
            .field("scans", &self.scans)
            .field("source", &self.source)
            .field("navigator", &self.navigator)
            .finish_non_exhaustive()
    }
}

impl Reader {
    pub fn new(config: ReaderConfig) -> Self {
        let scans = ScanCache::new(config.scan_cache_capacity);
        Self { config, scans, source: None, navigator: Navigator::new(0), browsed_sink: None }
    }

    pub fn with_browsed_sink(mut self, sink: impl Fn(&Path) + Send + Sync + 'static) -> Self {
        self.browsed_sink = Some(Arc::new(sink));
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Open `path` and make it the active container.
    pub fn open(&mut self, path: &Path) -> Result<(), SourceError> {
        if self.shares_cache_with_active(path) {
            info!(target: "reader", path = %path.display(), "reopening active archive");
            self.close();
        }

        let source = match self.load(path) {
            Ok(source) => source,
            Err(err) => {
                warn!(target: "reader", path = %path.display(), "open failed: {err}");
                return Err(err);
            }
        };

        let total = source.total_pages();
        let mut navigator = Navigator::new(total)
            .with_layout(self.navigator.page_size(), self.navigator.direction());
        if let Some(sink) = self.browsed_sink.as_ref() {
            let sink = Arc::clone(sink);
            let browsed = path.to_path_buf();
            navigator = navigator.with_browsed_hook(move || sink(&browsed));
        }

        if let Some(previous) = self.source.replace(source) {
            previous.dispose();
        }
        self.navigator = navigator;
        info!(target: "reader", path = %path.display(), pages = total, "container active");
        Ok(())
    }

    fn shares_cache_with_active(&self, path: &Path) -> bool {
        self.source.as_ref().is_some_and(|active| {
            !active.is_folder() && container_key(active.path()) == container_key(path)
        })
    }

    fn load(&mut self, path: &Path) -> Result<Arc<dyn PageSource>, SourceError> {
        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }

        match ContainerKind::detect(path) {
            Some(ContainerKind::Folder) => {
                let policy = self.config.ordering();
                let pages = self
                    .scans
                    .get_or_scan(path, &policy, || fs::list_folder(path, &policy))
                    .map_err(|err| SourceError::unreadable(path, err))?;
                Ok(Arc::new(FolderSource::from_listing(path, pages)))
            }
            Some(_) => fs::open_source(path, &self.config),
            None => Err(SourceError::Unsupported(path.to_path_buf())),
        }
    }

    /// Forget the cached listing of a folder so the next open rescans it.
    pub fn refresh(&mut self, folder: &Path) {
        self.scans.invalidate(folder);
    }

    /// Dispose the active container, if any.
    pub fn close(&mut self) {
        if let Some(source) = self.source.take() {
            info!(target: "reader", path = %source.path().display(), "container closed");
            source.dispose();
        }
        self.navigator =
            Navigator::new(0).with_layout(self.navigator.page_size(), self.navigator.direction());
    }

    /// Shared handle to the active source, e.g. for a rendering thread.
    pub fn source(&self) -> Option<Arc<dyn PageSource>> {
        self.source.clone()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn total_pages(&self) -> usize {
        self.navigator.total_pages()
    }

    pub fn position(&self) -> isize {
        self.navigator.position()
    }

    pub fn extraction_progress(&self) -> usize {
        self.source.as_ref().map(|source| source.extraction_progress()).unwrap_or(0)
    }

    pub fn go_forward(&mut self, step: Step) -> isize {
        self.navigator.go_forward(step)
    }

    pub fn go_back(&mut self, step: Step) -> isize {
        self.navigator.go_back(step)
    }

    pub fn go_to_page(&mut self, page: usize) -> Result<isize, NavigationError> {
        self.navigator.go_to_page(page)
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.navigator.set_page_size(page_size);
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.navigator.set_direction(direction);
    }

    /// Local path of the current page, blocking until it is available.
    pub fn current_file(&self) -> Option<PathBuf> {
        self.file_at(self.navigator.current())
    }

    /// Local paths for the left and right display slots.
    pub fn visible_files(&self) -> (Option<PathBuf>, Option<PathBuf>) {
        let spread = self.navigator.spread();
        (self.file_at(spread.left), self.file_at(spread.right))
    }

    fn file_at(&self, index: Option<usize>) -> Option<PathBuf> {
        let source = self.source.as_ref()?;
        let index = isize::try_from(index?).ok()?;
        source.get_file(index)
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        if let Some(source) = self.source.take() {
            source.dispose();
        }
    }
}
