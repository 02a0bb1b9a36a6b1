//! Explicit cache of folder listings.
//!
//! Listings are keyed by the folder and the ordering options that produced them, and stay valid
//! until [`ScanCache::invalidate`] or [`ScanCache::clear`] is called. Nothing is re-validated
//! against the file system on lookup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hashlink::LruCache;
use tracing::debug;

use crate::config::OrderingPolicy;

use super::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ScanKey {
    root: PathBuf,
    extensions: Vec<String>,
    integer_ratio_bits: u64,
}

impl ScanKey {
    fn new(root: &Path, policy: &OrderingPolicy) -> Self {
        Self {
            root: root.to_path_buf(),
            extensions: policy.extensions.clone(),
            integer_ratio_bits: policy.integer_ratio.to_bits(),
        }
    }
}

/// Ordered page names per (folder, ordering options), bounded by least-recent use.
#[derive(Debug)]
pub struct ScanCache {
    entries: LruCache<ScanKey, Arc<[String]>>,
}

impl ScanCache {
    pub fn new(capacity: usize) -> Self {
        Self { entries: LruCache::new(capacity.max(1)) }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached listing, or run `scan` and remember its result.
    pub fn get_or_scan<F>(
        &mut self,
        root: &Path,
        policy: &OrderingPolicy,
        scan: F,
    ) -> Result<Arc<[String]>>
    where
        F: FnOnce() -> Result<Vec<String>>,
    {
        let key = ScanKey::new(root, policy);
        if let Some(pages) = self.entries.get(&key) {
            debug!(target: "cache::scan", root = %root.display(), "scan cache hit");
            return Ok(Arc::clone(pages));
        }

        let pages: Arc<[String]> = scan()?.into();
        self.entries.insert(key, Arc::clone(&pages));
        Ok(pages)
    }

    /// Drop every listing of `root`, whatever options produced it.
    pub fn invalidate(&mut self, root: &Path) {
        let stale: Vec<ScanKey> =
            self.entries.iter().filter(|(key, _)| key.root == root).map(|(key, _)| key.clone()).collect();
        for key in stale {
            self.entries.remove(&key);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
