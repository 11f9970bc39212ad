//! Subject catalogs.
//!
//! A catalog maps paper labels to either a flat video list or a chapter
//! mapping. Key order is the document's order and is kept as-is.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::video::Video;

/// Videos under one paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperEntry {
    Flat(Vec<Video>),
    Chapters(Vec<(String, Vec<Video>)>),
}

/// The full video mapping of one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    papers: Vec<(String, PaperEntry)>,
}

impl Catalog {
    pub fn new(papers: Vec<(String, PaperEntry)>) -> Self {
        Self { papers }
    }

    /// Decode a parsed mapping. Returns `None` unless `v` is an object.
    ///
    /// Entries that are neither lists nor objects are skipped, as are
    /// non-list chapter values and malformed video records.
    pub fn from_value(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        let mut papers = Vec::with_capacity(obj.len());
        for (paper, entry) in obj {
            match entry {
                Value::Array(items) => papers.push((paper.clone(), PaperEntry::Flat(decode_videos(items)))),
                Value::Object(chapters) => {
                    let chapters = chapters
                        .iter()
                        .filter_map(|(chapter, list)| {
                            let items = list.as_array()?;
                            Some((chapter.clone(), decode_videos(items)))
                        })
                        .collect();
                    papers.push((paper.clone(), PaperEntry::Chapters(chapters)));
                }
                _ => log::warn!("powerplay: skipping catalog entry {:?}: not a list or mapping", paper),
            }
        }
        Some(Self { papers })
    }

    pub fn paper(&self, label: &str) -> Option<&PaperEntry> {
        self.papers.iter().find(|(p, _)| p == label).map(|(_, e)| e)
    }

    pub fn paper_labels(&self) -> impl Iterator<Item = &str> {
        self.papers.iter().map(|(p, _)| p.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Video sequence for a paper, optionally narrowed to a chapter.
    ///
    /// Flat papers ignore `chapter`. An unknown or missing chapter yields
    /// every chapter's videos concatenated in key order. An unknown paper
    /// yields an empty list.
    pub fn videos_for(&self, paper: &str, chapter: Option<&str>) -> Vec<Video> {
        match self.paper(paper) {
            None => Vec::new(),
            Some(PaperEntry::Flat(videos)) => videos.clone(),
            Some(PaperEntry::Chapters(chapters)) => {
                if let Some(found) = chapter.and_then(|c| chapters.iter().find(|(label, _)| label == c)) {
                    return found.1.clone();
                }
                chapters.iter().flat_map(|(_, videos)| videos.iter().cloned()).collect()
            }
        }
    }

    pub fn video_count(&self) -> usize {
        self.papers
            .iter()
            .map(|(_, entry)| match entry {
                PaperEntry::Flat(v) => v.len(),
                PaperEntry::Chapters(c) => c.iter().map(|(_, v)| v.len()).sum(),
            })
            .sum()
    }
}

fn decode_videos(items: &[Value]) -> Vec<Video> {
    items
        .iter()
        .filter_map(|item| {
            let video = Video::from_value(item);
            if video.is_none() {
                log::warn!("powerplay: dropping malformed video record: {}", item);
            }
            video
        })
        .collect()
}

impl Serialize for PaperEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PaperEntry::Flat(videos) => videos.serialize(serializer),
            PaperEntry::Chapters(chapters) => {
                let mut map = serializer.serialize_map(Some(chapters.len()))?;
                for (label, videos) in chapters {
                    map.serialize_entry(label, videos)?;
                }
                map.end()
            }
        }
    }
}

impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.papers.len()))?;
        for (label, entry) in &self.papers {
            map.serialize_entry(label, entry)?;
        }
        map.end()
    }
}
