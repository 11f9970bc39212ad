//! powerplay-core — offline-first lesson video browser.
//!
//! Subjects → papers → (chapters →) a playlist of YouTube lessons. Catalogs
//! are fetched per subject, parsed as data and cached; navigation is a
//! state machine over a pluggable history.
//!
//! # Architecture
//!
//! ```text
//! Layer 0: Models, config, paths (pure)
//! Layer 1: Effects (fetch, cache, player surface, clock)
//! Layer 2: Navigator (pages, history, playlist)
//! Layer 3: Front ends (CLI, C ABI) render the View
//! ```

pub mod config;
pub mod document;
pub mod effects;
pub mod error;
pub mod history;
pub mod models;
pub mod navigator;
pub mod paths;
pub mod playlist;
pub mod view;

pub use config::{AppConfig, SubjectConfig};
pub use error::{Error, FetchError, Result};
pub use history::{History, MemoryHistory};
pub use models::*;
pub use navigator::{LoadRequest, Navigator, Notice, PopOutcome};
pub use playlist::Playlist;
pub use view::View;
