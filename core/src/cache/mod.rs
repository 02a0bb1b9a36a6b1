//! Extraction cache, extraction progress, and folder scan caching.

pub mod disk;
pub mod progress;
pub mod scan;

pub use disk::{ExtractionCache, cache_key, container_key};
pub use progress::{ExtractionProgress, ExtractionStats, PageAvailability};
pub use scan::ScanCache;

pub type Result<T> = crate::Result<T>;
