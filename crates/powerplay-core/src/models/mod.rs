//! Powerplay data models.
//!
//! Catalogs and videos are what the static subject files hold; navigation
//! states are what history entries carry.

pub mod catalog;
pub mod nav;
pub mod video;

pub use catalog::{Catalog, PaperEntry};
pub use nav::{NavState, Page};
pub use video::Video;
