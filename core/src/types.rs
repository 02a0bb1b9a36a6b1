//! Shared data structures exchanged between the page sources, the navigator, and the host.

use std::path::Path;

/// Backend selected for an opened container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Folder,
    Zip,
    Rar,
}

impl ContainerKind {
    /// Pick the backend from the container path: directories are folders, archives go by
    /// extension. Returns `None` for anything else.
    pub fn detect(path: &Path) -> Option<Self> {
        if path.is_dir() {
            return Some(ContainerKind::Folder);
        }

        match path.extension().and_then(|ext| ext.to_str()).map(|s| s.to_ascii_lowercase()) {
            Some(ref ext) if ext == "zip" || ext == "cbz" => Some(ContainerKind::Zip),
            Some(ref ext) if ext == "rar" || ext == "cbr" => Some(ContainerKind::Rar),
            _ => None,
        }
    }

    pub fn is_archive(self) -> bool {
        !matches!(self, ContainerKind::Folder)
    }
}

/// Number of pages shown at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    #[default]
    Single,
    Double,
}

impl PageSize {
    pub fn pages(self) -> usize {
        match self {
            PageSize::Single => 1,
            PageSize::Double => 2,
        }
    }

    /// Map an externally supplied page count. Only `1` and `2` are valid.
    pub fn from_pages(pages: usize) -> Option<Self> {
        match pages {
            1 => Some(PageSize::Single),
            2 => Some(PageSize::Double),
            _ => None,
        }
    }
}

/// Reading direction. Decides which physical slot holds the current page in a spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    LeftToRight,
    RightToLeft,
}

/// Size of a relative move: a single nudge or a full page-size step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Single,
    Page,
}

/// Page indices occupying the two physical display slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Spread {
    pub left: Option<usize>,
    pub right: Option<usize>,
}

impl Spread {
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}
