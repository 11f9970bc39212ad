//! Playlist model — master list, active view, now-playing.
//!
//! `master` is the full sequence for the open paper/chapter and never
//! changes until the next load. The active view is a list of positions
//! into `master`: search narrows it, shuffle permutes it, clear restores
//! master order.
//!
//! Now-playing is tracked by master position, so it survives reordering:
//! after a shuffle the current index follows the playing video to its new
//! row, and after a search it is `None` if that video was filtered out.

use crate::models::{Catalog, Video};

pub struct Playlist {
    master: Vec<Video>,
    active: Vec<usize>,
    playing: Option<usize>,
    query: String,
    rng: fastrand::Rng,
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new()
    }
}

impl Playlist {
    pub fn new() -> Self {
        Self::with_rng(fastrand::Rng::new())
    }

    /// Deterministic shuffles.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(fastrand::Rng::with_seed(seed))
    }

    fn with_rng(rng: fastrand::Rng) -> Self {
        Self {
            master: Vec::new(),
            active: Vec::new(),
            playing: None,
            query: String::new(),
            rng,
        }
    }

    /// Replace the contents with the videos for `paper`/`chapter`.
    /// Returns the number of videos loaded.
    pub fn load(&mut self, catalog: &Catalog, paper: &str, chapter: Option<&str>) -> usize {
        self.set_videos(catalog.videos_for(paper, chapter));
        self.master.len()
    }

    pub fn set_videos(&mut self, videos: Vec<Video>) {
        self.active = (0..videos.len()).collect();
        self.master = videos;
        self.playing = None;
        self.query.clear();
    }

    /// Empty everything: master, active view, now-playing and query.
    pub fn reset(&mut self) {
        self.set_videos(Vec::new());
    }

    // -----------------------------------------------------------------------
    // Active view
    // -----------------------------------------------------------------------

    /// Case-insensitive substring search over title and subtitle.
    /// An empty query restores master order.
    pub fn filter(&mut self, query: &str) {
        self.query = query.to_string();
        let needle = query.to_lowercase();
        self.active = if needle.is_empty() {
            (0..self.master.len()).collect()
        } else {
            (0..self.master.len()).filter(|&i| self.master[i].matches(&needle)).collect()
        };
    }

    /// Uniform in-place permutation of the active view (Fisher–Yates).
    pub fn shuffle(&mut self) {
        for i in (1..self.active.len()).rev() {
            let j = self.rng.usize(..=i);
            self.active.swap(i, j);
        }
    }

    /// Back to master order with no query.
    pub fn clear(&mut self) {
        self.query.clear();
        self.active = (0..self.master.len()).collect();
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Make row `i` of the active view the playing video. Out-of-range rows
    /// are ignored and return `None`.
    pub fn select(&mut self, i: usize) -> Option<&Video> {
        let pos = *self.active.get(i)?;
        self.playing = Some(pos);
        self.master.get(pos)
    }

    /// Step forward one row. No wraparound; at the last row this is a no-op.
    /// With nothing selected it starts at the first row.
    pub fn next(&mut self) -> Option<&Video> {
        match self.current_index() {
            Some(i) if i + 1 < self.active.len() => self.select(i + 1),
            Some(_) => None,
            None => self.select(0),
        }
    }

    /// Step back one row. No wraparound; at the first row this is a no-op.
    pub fn previous(&mut self) -> Option<&Video> {
        match self.current_index() {
            Some(i) if i > 0 => self.select(i - 1),
            _ => None,
        }
    }

    /// Row of the playing video in the active view.
    pub fn current_index(&self) -> Option<usize> {
        let playing = self.playing?;
        self.active.iter().position(|&pos| pos == playing)
    }

    pub fn now_playing(&self) -> Option<&Video> {
        self.playing.and_then(|pos| self.master.get(pos))
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn active(&self) -> impl Iterator<Item = &Video> + '_ {
        self.active.iter().filter_map(|&pos| self.master.get(pos))
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn master(&self) -> &[Video] {
        &self.master
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_empty(&self) -> bool {
        self.master.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lessons() -> Playlist {
        let mut p = Playlist::with_seed(7);
        p.set_videos(vec![
            Video::new("a").with_title("Vectors").with_subtitle("Lecture 1"),
            Video::new("b").with_title("Kinematics").with_subtitle("Lecture 2"),
            Video::new("c").with_title("Vector Calculus"),
            Video::new("d").with_subtitle("Problem Set"),
            Video::new("e").with_title("Gravitation").with_subtitle("Lecture 3"),
        ]);
        p
    }

    fn active_ids(p: &Playlist) -> Vec<&str> {
        p.active().map(|v| v.id.as_str()).collect()
    }

    #[test]
    fn load_from_catalog() {
        let catalog = Catalog::from_value(&json!({"Paper 1": {"Chapter 3": [{"id": "abc", "title": "T1"}]}})).unwrap();
        let mut p = Playlist::new();
        assert_eq!(p.load(&catalog, "Paper 1", Some("Chapter 3")), 1);
        assert_eq!(p.current_index(), None);
        assert_eq!(p.load(&catalog, "Paper 9", None), 0);
        assert!(p.is_empty());
    }

    #[test]
    fn filter_is_case_insensitive_and_clear_restores() {
        let mut p = lessons();
        p.filter("VECTOR");
        assert_eq!(active_ids(&p), vec!["a", "c"]);
        assert_eq!(p.master().len(), 5);

        p.filter("lecture");
        assert_eq!(active_ids(&p), vec!["a", "b", "e"]);

        p.clear();
        assert_eq!(active_ids(&p), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(p.query(), "");
    }

    #[test]
    fn empty_query_restores_master_order() {
        let mut p = lessons();
        p.shuffle();
        p.filter("");
        assert_eq!(active_ids(&p), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut p = lessons();
        p.shuffle();
        let mut ids = active_ids(&p);
        assert_eq!(ids.len(), 5);
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
        let master: Vec<&str> = p.master().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(master, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn shuffle_reaches_every_arrangement_of_three() {
        let mut p = Playlist::with_seed(42);
        p.set_videos(vec![Video::new("x"), Video::new("y"), Video::new("z")]);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            p.clear();
            p.shuffle();
            seen.insert(p.active().map(|v| v.id.clone()).collect::<Vec<_>>());
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn shuffle_keeps_now_playing_identity() {
        let mut p = lessons();
        p.select(2);
        p.shuffle();
        let row = p.current_index().unwrap();
        assert_eq!(p.active().nth(row).unwrap().id, "c");
        assert_eq!(p.now_playing().unwrap().id, "c");
    }

    #[test]
    fn select_ignores_out_of_range() {
        let mut p = lessons();
        assert!(p.select(5).is_none());
        assert_eq!(p.current_index(), None);
        assert_eq!(p.select(4).unwrap().id, "e");
        assert!(p.select(99).is_none());
        assert_eq!(p.current_index(), Some(4));
    }

    #[test]
    fn next_and_previous_clamp() {
        let mut p = lessons();
        assert!(p.previous().is_none());
        assert_eq!(p.next().unwrap().id, "a");
        assert!(p.previous().is_none());
        assert_eq!(p.current_index(), Some(0));

        p.select(4);
        assert!(p.next().is_none());
        assert_eq!(p.current_index(), Some(4));
        assert_eq!(p.previous().unwrap().id, "d");
    }

    #[test]
    fn filtered_out_video_has_no_row() {
        let mut p = lessons();
        p.select(1);
        p.filter("vector");
        assert_eq!(p.current_index(), None);
        assert_eq!(p.now_playing().unwrap().id, "b");
        p.clear();
        assert_eq!(p.current_index(), Some(1));
    }

    #[test]
    fn reset_empties_everything() {
        let mut p = lessons();
        p.filter("lecture");
        p.select(0);
        p.reset();
        assert!(p.is_empty());
        assert_eq!(p.active_len(), 0);
        assert_eq!(p.current_index(), None);
        assert!(p.now_playing().is_none());
        assert_eq!(p.query(), "");
    }
}
