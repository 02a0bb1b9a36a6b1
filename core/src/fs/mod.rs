//! Container backends: folders, zip and rar archives behind one [`PageSource`] interface.

pub mod archive;
pub mod folder;
pub mod order;
pub mod source;
pub(crate) mod util;

use std::path::Path;
use std::sync::Arc;

use crate::config::ReaderConfig;
use crate::error::SourceError;
use crate::types::ContainerKind;

pub use archive::{ArchiveReader, ArchiveSource, CancellationToken, ExtractionPolicy, OpenReader};
pub use folder::{FolderSource, list_folder};
pub use order::{integer_stem, is_integer_dominant, lexical_numeric_cmp, order_pages};
pub use source::PageSource;

/// Shared result type for fs operations.
pub type Result<T> = crate::Result<T>;

/// Open `path` with the backend its kind calls for.
pub fn open_source(
    path: &Path,
    config: &ReaderConfig,
) -> std::result::Result<Arc<dyn PageSource>, SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }

    match ContainerKind::detect(path) {
        Some(ContainerKind::Folder) => {
            let source = FolderSource::open(path, &config.ordering())
                .map_err(|err| SourceError::unreadable(path, err))?;
            Ok(Arc::new(source))
        }
        Some(kind) => Ok(Arc::new(ArchiveSource::open(path, kind, config)?)),
        None => Err(SourceError::Unsupported(path.to_path_buf())),
    }
}
