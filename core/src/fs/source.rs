//! Capability interface shared by every container backend.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::types::ContainerKind;

/// An opened container: an ordered, immutable page list with on-demand local paths.
///
/// Indices are signed so the navigator's `-1` "no content" position can be passed through
/// directly; negative and out-of-range indices resolve to `None`.
pub trait PageSource: Send + Sync + fmt::Debug {
    /// Path of the container this source was opened from.
    fn path(&self) -> &Path;

    fn kind(&self) -> ContainerKind;

    /// Entry names in browsing order.
    fn pages(&self) -> &[String];

    fn total_pages(&self) -> usize {
        self.pages().len()
    }

    fn is_folder(&self) -> bool {
        self.kind() == ContainerKind::Folder
    }

    /// Local path of the page at `index`, blocking until it is materialized.
    ///
    /// Pages that could not be materialized resolve to the configured placeholder path.
    fn get_file(&self, index: isize) -> Option<PathBuf>;

    /// Like [`PageSource::get_file`] but returns `None` instead of blocking.
    fn try_get_file(&self, index: isize) -> Option<PathBuf>;

    /// Number of pages available locally.
    fn extraction_progress(&self) -> usize;

    /// Release backend resources. Safe to call more than once.
    fn dispose(&self);
}

/// Map a signed position onto a valid page index.
pub(crate) fn checked_index(index: isize, total: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|&index| index < total)
}
