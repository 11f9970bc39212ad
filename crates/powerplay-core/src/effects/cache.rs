//! Offline cache — a versioned on-disk cache in front of another source.
//!
//! Routing per request:
//! - video/image/API hosts pass straight through, never stored
//! - documents (`.html`, directory navigations) go network-first and fall
//!   back to the cached copy when the network fails
//! - everything else is cache-first, populated on miss
//!
//! Each cache directory is named after a version (a build timestamp by
//! default). The first fetch activates the cache and deletes every other
//! version's directory.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{Clock, Fetcher, SystemClock};
use crate::error::FetchError;
use crate::paths;

const DIR_PREFIX: &str = "pp-cache-";

/// How a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Passthrough,
    NetworkFirst,
    CacheFirst,
}

/// Route for a request path or URL.
pub fn route_for(path: &str) -> Route {
    if let Some(host) = paths::url_host(path) {
        let external = paths::PASSTHROUGH_HOSTS
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{}", h)));
        if external {
            return Route::Passthrough;
        }
    }
    let bare = path.split(['?', '#']).next().unwrap_or(path);
    let last = bare.rsplit('/').next().unwrap_or(bare);
    if bare.ends_with(".html") || last.is_empty() {
        Route::NetworkFirst
    } else {
        Route::CacheFirst
    }
}

/// Fetcher decorator implementing the offline cache.
pub struct CachingFetcher<F> {
    inner: F,
    root: PathBuf,
    version: String,
    activated: Mutex<bool>,
}

impl<F: Fetcher> CachingFetcher<F> {
    /// Cache under `root`, versioned by the current time.
    pub fn new(inner: F, root: impl Into<PathBuf>) -> Self {
        Self::with_version(inner, root, SystemClock.now_ms().to_string())
    }

    pub fn with_version(inner: F, root: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            inner,
            root: root.into(),
            version: version.into(),
            activated: Mutex::new(false),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(format!("{}{}", DIR_PREFIX, self.version))
    }

    /// Create this version's directory and drop every other version.
    /// Runs once; later calls are no-ops.
    pub fn activate(&self) {
        let mut activated = self.activated.lock();
        if *activated {
            return;
        }
        *activated = true;

        let dir = self.cache_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            log::warn!("powerplay: cannot create cache {}: {}", dir.display(), e);
            return;
        }
        let Ok(entries) = std::fs::read_dir(&self.root) else { return };
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_other_version = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(DIR_PREFIX))
                && path != dir;
            if is_other_version && path.is_dir() {
                match std::fs::remove_dir_all(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => log::warn!("powerplay: cannot remove stale cache {}: {}", path.display(), e),
                }
            }
        }
        log::info!("powerplay: cache {} active, {} stale removed", self.version, removed);
    }

    fn entry_path(&self, path: &str) -> PathBuf {
        self.cache_dir().join(paths::encode_component(path))
    }

    fn cached(&self, path: &str) -> Option<String> {
        std::fs::read_to_string(self.entry_path(path)).ok()
    }

    fn store(&self, path: &str, body: &str) {
        let target = self.entry_path(path);
        if let Err(e) = write_file(&target, body) {
            log::warn!("powerplay: cache write {} failed: {}", target.display(), e);
        }
    }
}

fn write_file(target: &Path, body: &str) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(target, body)
}

impl<F: Fetcher> Fetcher for CachingFetcher<F> {
    fn fetch(&self, path: &str) -> Result<String, FetchError> {
        self.activate();
        match route_for(path) {
            Route::Passthrough => self.inner.fetch(path),
            Route::NetworkFirst => match self.inner.fetch(path) {
                Ok(body) => {
                    self.store(path, &body);
                    Ok(body)
                }
                // The server answered; nothing to fall back from.
                Err(e @ FetchError::Status(_)) => Err(e),
                Err(e) => {
                    log::warn!("powerplay: network failed for {} ({}), trying cache", path, e);
                    self.cached(path).ok_or_else(|| FetchError::NotCached(path.to_string()))
                }
            },
            Route::CacheFirst => {
                if let Some(body) = self.cached(path) {
                    return Ok(body);
                }
                let body = self.inner.fetch(path)?;
                self.store(path, &body);
                Ok(body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// In-memory source that can be switched offline.
    struct Flaky {
        docs: Mutex<HashMap<String, String>>,
        offline: AtomicBool,
        calls: AtomicUsize,
    }

    impl Flaky {
        fn new(docs: &[(&str, &str)]) -> Self {
            Self {
                docs: Mutex::new(docs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()),
                offline: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Fetcher for &Flaky {
        fn fetch(&self, path: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(FetchError::Http("offline".into()));
            }
            self.docs.lock().get(path).cloned().ok_or(FetchError::Status(404))
        }
    }

    #[test]
    fn routes() {
        assert_eq!(route_for("https://www.youtube.com/embed/x"), Route::Passthrough);
        assert_eq!(route_for("https://i.ytimg.com/vi/x/mqdefault.jpg"), Route::Passthrough);
        assert_eq!(route_for("https://fonts.googleapis.com/css"), Route::Passthrough);
        assert_eq!(route_for("subjects/ict.html"), Route::NetworkFirst);
        assert_eq!(route_for("https://host/Power-Play/"), Route::NetworkFirst);
        assert_eq!(route_for("style.css"), Route::CacheFirst);
        assert_eq!(route_for("https://notyoutube.com.evil/x.png"), Route::CacheFirst);
    }

    #[test]
    fn documents_fall_back_to_cache_when_offline() {
        let dir = TempDir::new().unwrap();
        let source = Flaky::new(&[("ict.html", "v1")]);
        let cache = CachingFetcher::with_version(&source, dir.path(), "1");

        assert_eq!(cache.fetch("ict.html").unwrap(), "v1");
        source.docs.lock().insert("ict.html".into(), "v2".into());
        assert_eq!(cache.fetch("ict.html").unwrap(), "v2", "network-first sees fresh content");

        source.offline.store(true, Ordering::SeqCst);
        assert_eq!(cache.fetch("ict.html").unwrap(), "v2");
        assert!(matches!(cache.fetch("math.html"), Err(FetchError::NotCached(_))));
    }

    #[test]
    fn missing_documents_are_not_masked() {
        let dir = TempDir::new().unwrap();
        let source = Flaky::new(&[]);
        let cache = CachingFetcher::with_version(&source, dir.path(), "1");
        assert!(matches!(cache.fetch("ict.html"), Err(FetchError::Status(404))));
    }

    #[test]
    fn static_assets_are_cache_first() {
        let dir = TempDir::new().unwrap();
        let source = Flaky::new(&[("style.css", "body{}")]);
        let cache = CachingFetcher::with_version(&source, dir.path(), "1");

        assert_eq!(cache.fetch("style.css").unwrap(), "body{}");
        assert_eq!(cache.fetch("style.css").unwrap(), "body{}");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn activation_drops_other_versions() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("pp-cache-old")).unwrap();
        std::fs::create_dir_all(dir.path().join("unrelated")).unwrap();

        let source = Flaky::new(&[("style.css", "x")]);
        let cache = CachingFetcher::with_version(&source, dir.path(), "new");
        cache.fetch("style.css").unwrap();

        assert!(!dir.path().join("pp-cache-old").exists());
        assert!(dir.path().join("pp-cache-new").exists());
        assert!(dir.path().join("unrelated").exists());
    }
}
