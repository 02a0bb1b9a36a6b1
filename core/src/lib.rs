//! Page source core for the local comic reader.
//!
//! Turns a folder or a zip/rar archive into an ordered list of page files on local disk,
//! extracting archives into a reusable scratch cache, and tracks the reading position.

#![deny(missing_debug_implementations)]

pub mod cache;
pub mod config;
pub mod error;
pub mod fs;
pub mod log;
pub mod nav;
pub mod reader;
pub mod types;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

pub use config::{OrderingPolicy, ReaderConfig};
pub use error::{NavigationError, SourceError};
pub use fs::{ArchiveSource, FolderSource, PageSource, open_source};
pub use nav::Navigator;
pub use reader::Reader;
pub use types::{ContainerKind, Direction, PageSize, Spread, Step};

/// Returns the version of the core crate for telemetry and debugging.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
