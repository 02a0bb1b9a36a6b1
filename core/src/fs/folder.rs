//! Directory-backed page source. Pages are already on disk, so nothing is extracted.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use tracing::info;

use crate::config::OrderingPolicy;
use crate::types::ContainerKind;

use super::source::{PageSource, checked_index};
use super::{Result, order, util};

#[derive(Debug, Clone)]
pub struct FolderSource {
    root: PathBuf,
    pages: Arc<[String]>,
}

impl FolderSource {
    /// Scan `root` and order its recognized files.
    pub fn open(root: &Path, policy: &OrderingPolicy) -> Result<Self> {
        let pages = list_folder(root, policy)?;
        Ok(Self::from_listing(root, pages.into()))
    }

    /// Build a source from a listing produced earlier by [`list_folder`].
    pub fn from_listing(root: &Path, pages: Arc<[String]>) -> Self {
        info!(target: "fs::folder", root = %root.display(), pages = pages.len(), "opened folder");
        Self { root: root.to_path_buf(), pages }
    }
}

impl PageSource for FolderSource {
    fn path(&self) -> &Path {
        &self.root
    }

    fn kind(&self) -> ContainerKind {
        ContainerKind::Folder
    }

    fn pages(&self) -> &[String] {
        &self.pages
    }

    fn get_file(&self, index: isize) -> Option<PathBuf> {
        self.try_get_file(index)
    }

    fn try_get_file(&self, index: isize) -> Option<PathBuf> {
        checked_index(index, self.pages.len()).map(|index| self.root.join(&self.pages[index]))
    }

    fn extraction_progress(&self) -> usize {
        self.pages.len()
    }

    fn dispose(&self) {}
}

/// Ordered names of the recognized files directly inside `root`.
pub fn list_folder(root: &Path, policy: &OrderingPolicy) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(anyhow!("folder {:?} is not a directory", root));
    }

    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("reading folder {:?}", root))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if !util::is_hidden(&name) => names.push(name),
            _ => {}
        }
    }

    // read_dir order is platform-defined; integer ordering breaks ties by input order.
    names.sort();
    Ok(order::order_pages(names, policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn orders_integer_names_numerically() {
        let dir = tempdir().unwrap();
        for name in ["3.png", "1.png", "2.png"] {
            fs::write(dir.path().join(name), b"page").unwrap();
        }

        let source = FolderSource::open(dir.path(), &OrderingPolicy::default()).unwrap();
        assert_eq!(source.pages(), ["1.png", "2.png", "3.png"]);
        assert_eq!(source.total_pages(), 3);
        assert!(source.is_folder());
        assert_eq!(source.extraction_progress(), 3);
    }

    #[test]
    fn resolves_paths_without_extraction() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a1.jpg"), b"page").unwrap();
        fs::write(dir.path().join("notes.txt"), b"text").unwrap();
        fs::create_dir(dir.path().join("sub.png")).unwrap();
        fs::write(dir.path().join("._a1.jpg"), b"fork").unwrap();

        let source = FolderSource::open(dir.path(), &OrderingPolicy::default()).unwrap();
        assert_eq!(source.total_pages(), 1);
        assert_eq!(source.get_file(0), Some(dir.path().join("a1.jpg")));
        assert_eq!(source.get_file(0), source.get_file(0));
        assert_eq!(source.get_file(-1), None);
        assert_eq!(source.get_file(1), None);
        source.dispose();
        assert_eq!(source.try_get_file(0), Some(dir.path().join("a1.jpg")));
    }

    #[test]
    fn empty_folder_has_no_pages() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), b"text").unwrap();

        let source = FolderSource::open(dir.path(), &OrderingPolicy::default()).unwrap();
        assert_eq!(source.total_pages(), 0);
        assert_eq!(source.get_file(0), None);
    }

    #[test]
    fn missing_folder_is_an_error() {
        let dir = tempdir().unwrap();
        let err = list_folder(&dir.path().join("gone"), &OrderingPolicy::default())
            .expect_err("missing folder");
        assert!(err.to_string().contains("not a directory"));
    }
}
