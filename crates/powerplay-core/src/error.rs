//! Error types.
//!
//! `Error` is what navigation and configuration callers see. `FetchError`
//! stays inside the catalog sources; the loader folds it into
//! `Error::CatalogNotFound` before it reaches the user.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error for the powerplay core.
#[derive(Debug, Error)]
pub enum Error {
    /// Neither candidate document existed, or none of them parsed.
    #[error("subject file not found or invalid: {subject}")]
    CatalogNotFound { subject: String },

    #[error("wrong passphrase")]
    WrongPassphrase,

    /// Navigation attempted while the gate is still closed.
    #[error("navigator is locked")]
    Locked,

    /// A forward transition needs context that has not been selected yet.
    #[error("no {0} selected")]
    MissingContext(&'static str),

    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config {path}: {reason}")]
    ConfigRejected { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Transport-level failure of a single fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("status {0}")]
    Status(u16),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("http: {0}")]
    Http(String),

    /// Offline and nothing cached for this request.
    #[error("not cached: {0}")]
    NotCached(String),
}
