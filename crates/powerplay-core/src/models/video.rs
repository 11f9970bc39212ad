//! Video records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::paths;

/// One externally hosted lesson video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

impl Video {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), title: None, subtitle: None }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    /// Lenient decode of a catalog entry.
    ///
    /// Returns `None` for non-objects and records without a usable id.
    /// Ids given as watch/short links are reduced to the bare id.
    pub fn from_value(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        let raw_id = match obj.get("id")? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let id = if paths::is_http_url(&raw_id) {
            paths::youtube_id(&raw_id)?.to_string()
        } else {
            raw_id
        };
        if id.is_empty() {
            return None;
        }
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(String::from);
        Some(Self { id, title: text("title"), subtitle: text("subtitle") })
    }

    /// Title shown in playlist rows.
    pub fn list_title(&self) -> &str {
        self.title.as_deref().filter(|t| !t.is_empty()).unwrap_or("Untitled")
    }

    /// Subtitle shown in playlist rows.
    pub fn list_subtitle(&self) -> &str {
        self.subtitle.as_deref().filter(|t| !t.is_empty()).unwrap_or("Lesson")
    }

    /// Title shown above the player.
    pub fn playing_title(&self) -> &str {
        self.title.as_deref().filter(|t| !t.is_empty()).unwrap_or("Untitled Video")
    }

    /// Case-insensitive match of `needle` (already lowercased) against
    /// title and subtitle joined by a space.
    pub fn matches(&self, needle: &str) -> bool {
        let haystack = format!(
            "{} {}",
            self.title.as_deref().unwrap_or(""),
            self.subtitle.as_deref().unwrap_or("")
        );
        haystack.to_lowercase().contains(needle)
    }

    pub fn thumbnail_url(&self) -> String {
        paths::thumbnail_url(&self.id)
    }

    pub fn embed_url(&self) -> String {
        paths::embed_url(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_applies_defaults() {
        let v = Video::from_value(&json!({"id": "abc"})).unwrap();
        assert_eq!(v.list_title(), "Untitled");
        assert_eq!(v.list_subtitle(), "Lesson");
        assert_eq!(v.playing_title(), "Untitled Video");
    }

    #[test]
    fn from_value_rejects_missing_id() {
        assert!(Video::from_value(&json!({"title": "No id"})).is_none());
        assert!(Video::from_value(&json!({"id": "  "})).is_none());
        assert!(Video::from_value(&json!("abc")).is_none());
    }

    #[test]
    fn from_value_reduces_watch_links() {
        let v = Video::from_value(&json!({"id": "https://www.youtube.com/watch?v=xyz&t=3"})).unwrap();
        assert_eq!(v.id, "xyz");
    }

    #[test]
    fn matches_title_and_subtitle() {
        let v = Video::new("a").with_title("Vector Basics").with_subtitle("Lecture 2");
        assert!(v.matches("vector"));
        assert!(v.matches("basics lec"));
        assert!(!v.matches("optics"));
    }
}
