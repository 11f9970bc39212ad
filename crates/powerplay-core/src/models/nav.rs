//! Navigation states.
//!
//! `NavState` is the payload recorded with every history entry. It is
//! serialized as `{page, subject?, paper?, chapter?}` so hosts can hand it
//! to a browser history API unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::paths;

/// The four application pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Home,
    Papers,
    Chapters,
    Player,
}

impl Page {
    pub fn as_str(self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::Papers => "papers",
            Page::Chapters => "chapters",
            Page::Player => "player",
        }
    }
}

/// History entry payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavState {
    pub page: Page,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
}

impl NavState {
    pub fn home() -> Self {
        Self { page: Page::Home, subject: None, paper: None, chapter: None }
    }

    pub fn papers(subject: &str) -> Self {
        Self { page: Page::Papers, subject: Some(subject.into()), paper: None, chapter: None }
    }

    pub fn chapters(subject: &str, paper: &str) -> Self {
        Self {
            page: Page::Chapters,
            subject: Some(subject.into()),
            paper: Some(paper.into()),
            chapter: None,
        }
    }

    pub fn player(subject: &str, paper: &str, chapter: Option<&str>) -> Self {
        Self {
            page: Page::Player,
            subject: Some(subject.into()),
            paper: Some(paper.into()),
            chapter: chapter.map(String::from),
        }
    }

    /// Decode a host-supplied state. Unknown or missing page tags give `None`.
    pub fn from_value(v: &Value) -> Option<Self> {
        serde_json::from_value(v.clone()).ok()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Whether the fields the page needs are present.
    ///
    /// Player states are exempt: a player entry without subject/paper is
    /// shown as an empty player rather than treated as corrupt.
    pub fn is_well_formed(&self) -> bool {
        match self.page {
            Page::Home | Page::Player => true,
            Page::Papers => self.subject.is_some(),
            Page::Chapters => self.subject.is_some() && self.paper.is_some(),
        }
    }

    /// Cosmetic URL fragment for this entry.
    pub fn fragment(&self) -> String {
        match (self.page, self.subject.as_deref(), self.paper.as_deref()) {
            (Page::Papers, Some(s), _) => paths::papers_fragment(s),
            (Page::Chapters, Some(s), Some(p)) => paths::chapters_fragment(s, p),
            (Page::Player, _, _) => paths::PLAYER_FRAGMENT.into(),
            _ => paths::HOME_FRAGMENT.into(),
        }
    }
}
