use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::FetchError;

/// Source of catalog documents.
///
/// `path` is relative to the source's root (`subjects/ict.html`) or an
/// absolute URL. All methods take `&self`; sources manage their own state.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, path: &str) -> Result<String, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    fn fetch(&self, path: &str) -> Result<String, FetchError> {
        (**self).fetch(path)
    }
}

/// The embedded video surface the navigator drives.
pub trait PlayerSurface: Send + Sync {
    /// Point the surface at an embed URL (autoplays).
    fn load(&self, embed_url: &str);
    /// Clear the source, stopping playback.
    fn stop(&self);
    fn is_fullscreen(&self) -> bool;
    fn exit_fullscreen(&self);
}

/// Surface for headless use. Never fullscreen.
pub struct NoopPlayer;

impl PlayerSurface for NoopPlayer {
    fn load(&self, _: &str) {}
    fn stop(&self) {}
    fn is_fullscreen(&self) -> bool { false }
    fn exit_fullscreen(&self) {}
}

/// Millisecond wall clock, injectable for the double-back timing window.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

pub mod cache;
pub mod catalog;
pub mod fs;
#[cfg(feature = "http")]
pub mod http;

pub use cache::CachingFetcher;
pub use catalog::load_catalog;
pub use fs::DirFetcher;

/// Pick a document source for a catalog root: HTTP for `http(s)://`
/// roots, the filesystem otherwise.
pub fn fetcher_for_root(root: &str) -> Arc<dyn Fetcher> {
    if crate::paths::is_http_url(root) {
        return http_fetcher(root);
    }
    Arc::new(DirFetcher::new(root))
}

#[cfg(feature = "http")]
fn http_fetcher(root: &str) -> Arc<dyn Fetcher> {
    Arc::new(http::HttpFetcher::new(root))
}

#[cfg(not(feature = "http"))]
fn http_fetcher(root: &str) -> Arc<dyn Fetcher> {
    log::warn!("powerplay: built without http support, treating {} as a directory", root);
    Arc::new(DirFetcher::new(root))
}
