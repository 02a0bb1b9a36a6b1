//! Reader configuration: extension allow-list, scratch root, and extraction tuning.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::Result;

const APP_QUALIFIER: &str = "com";
const APP_ORGANISATION: &str = "Folio";
const APP_NAME: &str = "folio";

/// Recognized page extensions (lowercase, without the dot).
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "avif", "gif", "bmp"];

/// Share of integer stems above which a listing is ordered numerically.
pub const DEFAULT_INTEGER_RATIO: f64 = 0.75;

/// Archives larger than this are extracted eagerly on open.
pub const DEFAULT_EAGER_THRESHOLD_BYTES: u64 = 40 * 1024 * 1024;

/// Policy inputs for the ordering algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderingPolicy {
    pub extensions: Vec<String>,
    pub integer_ratio: f64,
}

impl OrderingPolicy {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { extensions: normalize_extensions(extensions), integer_ratio: DEFAULT_INTEGER_RATIO }
    }

    pub fn with_integer_ratio(mut self, ratio: f64) -> Self {
        self.integer_ratio = ratio;
        self
    }
}

impl Default for OrderingPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Recognized page extensions, matched case-insensitively.
    pub extensions: Vec<String>,
    /// Writable directory that holds one extraction cache directory per archive.
    pub scratch_root: PathBuf,
    /// Minimum share of integer stems that selects integer ordering.
    pub integer_ratio: f64,
    /// Compressed size above which archives are extracted before they become usable.
    pub eager_threshold_bytes: u64,
    /// Stop background extraction once this many pages are available.
    pub extraction_cap: Option<usize>,
    /// Path handed out for pages that failed to extract.
    pub placeholder: PathBuf,
    /// Number of folder listings kept by the scan cache.
    pub scan_cache_capacity: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            scratch_root: default_scratch_root(),
            integer_ratio: DEFAULT_INTEGER_RATIO,
            eager_threshold_bytes: DEFAULT_EAGER_THRESHOLD_BYTES,
            extraction_cap: None,
            placeholder: PathBuf::from("assets/placeholder.png"),
            scan_cache_capacity: 8,
        }
    }
}

impl ReaderConfig {
    /// Load a JSON config file. Missing fields fall back to their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("reading config file {}", path.display()))?;
        let config = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    pub fn with_scratch_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.scratch_root = path.into();
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = normalize_extensions(extensions);
        self
    }

    pub fn with_eager_threshold(mut self, bytes: u64) -> Self {
        self.eager_threshold_bytes = bytes;
        self
    }

    pub fn with_extraction_cap(mut self, cap: Option<usize>) -> Self {
        self.extraction_cap = cap;
        self
    }

    pub fn with_placeholder<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.placeholder = path.into();
        self
    }

    pub fn ordering(&self) -> OrderingPolicy {
        OrderingPolicy::new(&self.extensions).with_integer_ratio(self.integer_ratio)
    }
}

fn normalize_extensions<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn default_scratch_root() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from(APP_QUALIFIER, APP_ORGANISATION, APP_NAME) {
        dirs.cache_dir().join("pages")
    } else {
        std::env::temp_dir().join("folio-pages")
    }
}
