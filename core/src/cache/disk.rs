//! Per-container extraction cache on local storage.
//!
//! Layout: `<scratch-root>/<blake3(container path)>/<index><original extension>`, plus a
//! `source.json` marker describing the container the directory was filled from.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Error, anyhow};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::fs::util;

use super::Result;

const MARKER_FILE: &str = "source.json";

/// Identity of the container a cache directory belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SourceMarker {
    path: String,
    len: u64,
    modified_ms: u64,
}

impl SourceMarker {
    fn describe(container: &Path) -> Result<Self> {
        let meta = fs::metadata(container)
            .with_context(|| format!("reading metadata of {}", container.display()))?;
        let modified_ms = meta
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|delta| delta.as_millis() as u64)
            .unwrap_or(0);
        Ok(Self { path: container.to_string_lossy().into_owned(), len: meta.len(), modified_ms })
    }
}

/// Materialized pages of one container. Files are never evicted within a session.
#[derive(Debug, Clone)]
pub struct ExtractionCache {
    dir: PathBuf,
}

impl ExtractionCache {
    /// Create or reuse the cache directory for `container` under `scratch_root`.
    ///
    /// Existing files are reused when the marker matches the container's path, size and
    /// modification time. Otherwise the directory is emptied first, so a changed archive or a
    /// colliding key never serves stale pages.
    pub fn open(scratch_root: &Path, container: &Path) -> Result<Self> {
        let container = canonical(container);
        let dir = scratch_root.join(cache_key(&container));
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating extraction cache at {}", dir.display()))?;

        let current = SourceMarker::describe(&container)?;
        let marker_path = dir.join(MARKER_FILE);
        let stored = fs::read(&marker_path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<SourceMarker>(&bytes).ok());

        match stored {
            Some(ref marker) if *marker == current => {}
            Some(marker) => {
                info!(
                    target: "cache::extraction",
                    dir = %dir.display(),
                    previous = %marker.path,
                    "cache marker mismatch, purging"
                );
                fs::remove_dir_all(&dir)
                    .with_context(|| format!("purging extraction cache at {}", dir.display()))?;
                fs::create_dir_all(&dir)
                    .with_context(|| format!("recreating extraction cache at {}", dir.display()))?;
                write_atomic(&dir, &marker_path, &serde_json::to_vec_pretty(&current)?)?;
            }
            None => write_atomic(&dir, &marker_path, &serde_json::to_vec_pretty(&current)?)?,
        }

        Ok(Self { dir })
    }

    /// Directory holding this container's pages.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a page lands at once extracted: its index plus the entry's original extension.
    pub fn page_path(&self, index: usize, entry_name: &str) -> PathBuf {
        self.dir.join(format!("{index}{}", util::extension(entry_name)))
    }

    /// Whether the page was already materialized, possibly by an earlier session.
    pub fn contains(&self, index: usize, entry_name: &str) -> bool {
        self.page_path(index, entry_name).is_file()
    }

    /// Persist page bytes atomically, returning the final path.
    pub fn write(&self, index: usize, entry_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.page_path(index, entry_name);
        write_atomic(&self.dir, &path, bytes)?;
        Ok(path)
    }
}

/// Stable directory name for a container path.
pub fn cache_key(container: &Path) -> String {
    blake3::hash(container.to_string_lossy().as_bytes()).to_hex().to_string()
}

/// Cache directory name [`ExtractionCache::open`] picks for `container`.
pub fn container_key(container: &Path) -> String {
    cache_key(&canonical(container))
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    if path.parent() != Some(dir) {
        return Err(anyhow!("{} is outside cache directory {}", path.display(), dir.display()));
    }
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("allocating temp file in {}", dir.display()))?;
    tmp.write_all(bytes).with_context(|| format!("writing {}", path.display()))?;
    tmp.flush().with_context(|| format!("flushing {}", path.display()))?;
    tmp.persist(path).map_err(|err| Error::from(err.error))?;
    Ok(())
}
