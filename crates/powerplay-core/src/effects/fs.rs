//! Filesystem document source.

use std::io;
use std::path::{Component, Path, PathBuf};

use super::Fetcher;
use crate::error::FetchError;

/// Serves documents from a directory, the way a static host would.
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Fetcher for DirFetcher {
    fn fetch(&self, path: &str) -> Result<String, FetchError> {
        let rel = Path::new(path.trim_start_matches('/'));
        // Stay inside the root, like a static host would.
        if rel.components().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir)) {
            return Err(FetchError::Status(404));
        }
        match std::fs::read_to_string(self.root.join(rel)) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(FetchError::Status(404)),
            Err(e) => Err(FetchError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_relative_documents() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("subjects")).unwrap();
        std::fs::write(dir.path().join("subjects/ict.html"), "<pre>{}</pre>").unwrap();

        let fetcher = DirFetcher::new(dir.path());
        assert_eq!(fetcher.fetch("subjects/ict.html").unwrap(), "<pre>{}</pre>");
        assert_eq!(fetcher.fetch("/subjects/ict.html").unwrap(), "<pre>{}</pre>");
    }

    #[test]
    fn missing_file_is_404() {
        let dir = TempDir::new().unwrap();
        let fetcher = DirFetcher::new(dir.path());
        assert!(matches!(fetcher.fetch("nope.html"), Err(FetchError::Status(404))));
    }

    #[test]
    fn parent_traversal_is_refused() {
        let dir = TempDir::new().unwrap();
        let fetcher = DirFetcher::new(dir.path().join("inner"));
        assert!(matches!(fetcher.fetch("../secret.html"), Err(FetchError::Status(404))));
    }
}
