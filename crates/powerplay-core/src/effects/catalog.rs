//! Catalog loading effect — fetch a subject's document and decode it.
//!
//! The catalog is returned by value. Nothing is cached here beyond what
//! the source itself does, and nothing is retried.

use super::Fetcher;
use crate::document::parse_document;
use crate::error::{Error, Result};
use crate::models::Catalog;
use crate::paths;

/// Load the catalog for `subject`.
///
/// Candidates are tried in order and the first one fetched wins. Any
/// failure, including an unparseable winner, is `CatalogNotFound`.
pub fn load_catalog(fetcher: &dyn Fetcher, subject: &str) -> Result<Catalog> {
    let mut document = None;
    for candidate in paths::catalog_candidates(subject) {
        match fetcher.fetch(&candidate) {
            Ok(text) => {
                document = Some((candidate, text));
                break;
            }
            Err(e) => log::debug!("powerplay: {} unavailable: {}", candidate, e),
        }
    }

    let not_found = || Error::CatalogNotFound { subject: subject.to_string() };
    let (source, text) = document.ok_or_else(not_found)?;
    match parse_document(&text) {
        Some(catalog) => {
            log::info!(
                "powerplay: loaded {} ({} papers, {} videos)",
                source,
                catalog.paper_labels().count(),
                catalog.video_count()
            );
            Ok(catalog)
        }
        None => {
            log::warn!("powerplay: {} holds no catalog", source);
            Err(not_found())
        }
    }
}
