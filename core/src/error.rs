//! User-visible failures raised by container opening and absolute navigation.

use std::path::PathBuf;

use thiserror::Error;

/// Failure opening a container. The previously active container stays untouched.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("container {0:?} does not exist")]
    NotFound(PathBuf),
    #[error("unsupported container {0:?}: expected a folder, a zip or a rar archive")]
    Unsupported(PathBuf),
    #[error("failed to read container {path:?}: {message}")]
    Unreadable { path: PathBuf, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SourceError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        SourceError::Unreadable { path: path.into(), message: format!("{err:#}") }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("page {requested} is out of range (1..={total})")]
    OutOfRange { requested: usize, total: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_message_names_bounds() {
        let err = NavigationError::OutOfRange { requested: 12, total: 10 };
        assert_eq!(err.to_string(), "page 12 is out of range (1..=10)");
    }

    #[test]
    fn unreadable_error_flattens_context_chain() {
        let inner = anyhow::anyhow!("bad header").context("listing entries");
        let err = SourceError::unreadable("book.zip", inner);
        let message = err.to_string();
        assert!(message.contains("listing entries"));
        assert!(message.contains("bad header"));
    }
}
