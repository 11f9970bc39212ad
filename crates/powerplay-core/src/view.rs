//! View model — what the presentation layer draws.
//!
//! The navigator keeps one `View` current; front ends read it after every
//! call and render it however they like.

use serde::Serialize;

use crate::models::{Page, Video};
use crate::playlist::Playlist;

pub const IDLE_TITLE: &str = "Select a video to play";
pub const EMPTY_TITLE: &str = "No videos found here.";
pub const NO_META: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NowPlaying {
    pub title: String,
    pub meta: String,
    /// `None` when the video source is cleared.
    pub embed_url: Option<String>,
}

impl NowPlaying {
    pub fn idle() -> Self {
        Self { title: IDLE_TITLE.into(), meta: NO_META.into(), embed_url: None }
    }

    pub fn empty() -> Self {
        Self { title: EMPTY_TITLE.into(), meta: NO_META.into(), embed_url: None }
    }

    pub fn playing(video: &Video) -> Self {
        Self {
            title: video.playing_title().into(),
            meta: video.subtitle.clone().unwrap_or_default(),
            embed_url: Some(video.embed_url()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    /// `None` until the gate is passed.
    pub page: Option<Page>,
    /// Papers: the subject. Chapters: `subject — paper`.
    pub heading: String,
    /// Paper or chapter card labels of the visible grid.
    pub cards: Vec<String>,
    /// Player line under the title: `— paper (chapter)`.
    pub subtitle: String,
    pub now_playing: NowPlaying,
    /// A catalog load is outstanding.
    pub loading: bool,
}

impl Default for View {
    fn default() -> Self {
        Self {
            page: None,
            heading: String::new(),
            cards: Vec::new(),
            subtitle: String::new(),
            now_playing: NowPlaying::idle(),
            loading: false,
        }
    }
}

pub fn paper_cards(papers: u32) -> Vec<String> {
    (1..=papers).map(|i| format!("Paper {}", i)).collect()
}

pub fn chapter_cards(chapters: u32) -> Vec<String> {
    (1..=chapters).map(|i| format!("Chapter {}", i)).collect()
}

pub fn chapters_heading(subject: &str, paper: &str) -> String {
    format!("{} — {}", subject, paper)
}

pub fn player_subtitle(paper: &str, chapter: Option<&str>) -> String {
    match chapter {
        Some(c) => format!("— {} ({})", paper, c),
        None => format!("— {}", paper),
    }
}

/// One playlist row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistRow {
    pub title: String,
    pub subtitle: String,
    pub thumbnail_url: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistView {
    pub total: usize,
    pub query: String,
    pub rows: Vec<PlaylistRow>,
}

pub fn render_playlist(playlist: &Playlist) -> PlaylistView {
    let current = playlist.current_index();
    let rows = playlist
        .active()
        .enumerate()
        .map(|(i, v)| PlaylistRow {
            title: v.list_title().into(),
            subtitle: v.list_subtitle().into(),
            thumbnail_url: v.thumbnail_url(),
            active: current == Some(i),
        })
        .collect();
    PlaylistView { total: playlist.active_len(), query: playlist.query().into(), rows }
}
