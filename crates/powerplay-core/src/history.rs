//! History adapter.
//!
//! The navigator pushes to and reads from a `History`; it never treats
//! the history as the source of truth. Browser hosts back this with the
//! history API, everything else uses `MemoryHistory`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::NavState;

pub trait History: Send {
    /// Add a new entry after the current one, discarding forward entries.
    fn push(&mut self, state: NavState);
    /// Overwrite the current entry (or create the first one).
    fn replace(&mut self, state: NavState);
    fn current(&self) -> Option<NavState>;
    /// Move back one entry and return it. `None` at the first entry.
    fn back(&mut self) -> Option<NavState>;
    /// Move forward one entry and return it. `None` at the last entry.
    fn forward(&mut self) -> Option<NavState>;
    /// Follow a pop the host already performed: move to the nearest entry
    /// holding `state`, or overwrite the current entry if none does.
    fn seek(&mut self, state: &NavState);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub state: NavState,
    /// Cosmetic URL fragment, e.g. `#Physics-Paper%201`.
    pub fragment: String,
}

impl HistoryEntry {
    fn new(state: NavState) -> Self {
        let fragment = state.fragment();
        Self { state, fragment }
    }
}

/// Browser-style entry stack with a cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryHistory {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_fragment(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(|e| e.fragment.as_str())
    }

    /// Restore a saved session. A missing file is an empty history.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let mut history: MemoryHistory = serde_json::from_str(&text)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                history.cursor = history.cursor.min(history.entries.len().saturating_sub(1));
                Ok(history)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

impl History for MemoryHistory {
    fn push(&mut self, state: NavState) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(HistoryEntry::new(state));
        self.cursor = self.entries.len() - 1;
    }

    fn replace(&mut self, state: NavState) {
        match self.entries.get_mut(self.cursor) {
            Some(entry) => *entry = HistoryEntry::new(state),
            None => {
                self.entries.push(HistoryEntry::new(state));
                self.cursor = self.entries.len() - 1;
            }
        }
    }

    fn current(&self) -> Option<NavState> {
        self.entries.get(self.cursor).map(|e| e.state.clone())
    }

    fn back(&mut self) -> Option<NavState> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.current()
    }

    fn forward(&mut self) -> Option<NavState> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.current()
    }

    fn seek(&mut self, state: &NavState) {
        let holds = |e: &HistoryEntry| e.state == *state;
        if self.entries.get(self.cursor).is_some_and(holds) {
            return;
        }
        let behind = self.entries[..self.cursor.min(self.entries.len())].iter().rposition(holds);
        let ahead = || {
            self.entries
                .iter()
                .skip(self.cursor + 1)
                .position(holds)
                .map(|i| self.cursor + 1 + i)
        };
        match behind.or_else(ahead) {
            Some(idx) => self.cursor = idx,
            None => self.replace(state.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Page;
    use tempfile::TempDir;

    #[test]
    fn push_back_forward() {
        let mut h = MemoryHistory::new();
        assert!(h.current().is_none());
        h.replace(NavState::home());
        h.push(NavState::papers("Physics"));
        h.push(NavState::chapters("Physics", "Paper 1"));

        assert_eq!(h.back().unwrap().page, Page::Papers);
        assert_eq!(h.back().unwrap().page, Page::Home);
        assert!(h.back().is_none());
        assert_eq!(h.forward().unwrap().page, Page::Papers);
        assert_eq!(h.current_fragment(), Some("#Physics"));
    }

    #[test]
    fn push_discards_forward_entries() {
        let mut h = MemoryHistory::new();
        h.replace(NavState::home());
        h.push(NavState::papers("Physics"));
        h.back();
        h.push(NavState::papers("ICT"));
        assert_eq!(h.len(), 2);
        assert!(h.forward().is_none());
        assert_eq!(h.current().unwrap().subject.as_deref(), Some("ICT"));
    }

    #[test]
    fn replace_overwrites_current() {
        let mut h = MemoryHistory::new();
        h.replace(NavState::papers("Math"));
        h.replace(NavState::home());
        assert_eq!(h.len(), 1);
        assert_eq!(h.current_fragment(), Some("#home"));
    }

    #[test]
    fn seek_follows_host_pops() {
        let mut h = MemoryHistory::new();
        h.replace(NavState::home());
        h.push(NavState::papers("ICT"));
        h.push(NavState::player("ICT", "Paper 1", None));

        h.seek(&NavState::papers("ICT"));
        assert_eq!(h.current(), Some(NavState::papers("ICT")));
        h.seek(&NavState::player("ICT", "Paper 1", None));
        assert_eq!(h.len(), 3);
        assert_eq!(h.current().unwrap().page, Page::Player);

        h.seek(&NavState::home());
        assert_eq!(h.back(), None);
        h.seek(&NavState::papers("Math"));
        assert_eq!(h.len(), 3);
        assert_eq!(h.current_fragment(), Some("#Math"));
    }

    #[test]
    fn session_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session").join("history.json");
        assert!(MemoryHistory::load(&path).unwrap().is_empty());

        let mut h = MemoryHistory::new();
        h.replace(NavState::home());
        h.push(NavState::player("ICT", "Paper 1", None));
        h.save(&path).unwrap();

        let restored = MemoryHistory::load(&path).unwrap();
        assert_eq!(restored, h);
        assert_eq!(restored.current().unwrap().page, Page::Player);
    }

    #[test]
    fn corrupt_session_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(MemoryHistory::load(&path).is_err());
    }
}
