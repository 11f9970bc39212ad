//! HTTP document source.
//!
//! Feature-gated behind `http` to keep the default build minimal.

use super::Fetcher;
use crate::error::FetchError;
use crate::paths;

/// Fetches documents relative to a base URL, bypassing HTTP caches.
pub struct HttpFetcher {
    base: String,
}

impl HttpFetcher {
    pub fn new(base: &str) -> Self {
        Self { base: base.trim_end_matches('/').to_string() }
    }

    pub fn url_for(&self, path: &str) -> String {
        if paths::is_http_url(path) {
            path.to_string()
        } else {
            format!("{}/{}", self.base, path.trim_start_matches('/'))
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, path: &str) -> Result<String, FetchError> {
        let url = self.url_for(path);
        let mut response = ureq::get(&url)
            .header("Cache-Control", "no-store")
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => FetchError::Status(code),
                other => FetchError::Http(other.to_string()),
            })?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| FetchError::Http(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_joins_base_and_path() {
        let f = HttpFetcher::new("https://example.com/Power-Play/");
        assert_eq!(f.url_for("subjects/ict.html"), "https://example.com/Power-Play/subjects/ict.html");
        assert_eq!(f.url_for("/ict.html"), "https://example.com/Power-Play/ict.html");
    }

    #[test]
    fn url_for_keeps_absolute_urls() {
        let f = HttpFetcher::new("https://example.com");
        assert_eq!(
            f.url_for("https://i.ytimg.com/vi/a/mqdefault.jpg"),
            "https://i.ytimg.com/vi/a/mqdefault.jpg"
        );
    }
}
