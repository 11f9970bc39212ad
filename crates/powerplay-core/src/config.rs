//! Application configuration.
//!
//! The subject structure, the gate passphrase and the exit timing window.
//! Stored as JSON; anything invalid falls back to the built-in defaults.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a subject subdivides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfig {
    pub name: String,
    pub papers: u32,
    /// 0 means papers open straight into the player.
    #[serde(default)]
    pub chapters: u32,
}

impl SubjectConfig {
    pub fn new(name: &str, papers: u32, chapters: u32) -> Self {
        Self { name: name.into(), papers, chapters }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub subjects: Vec<SubjectConfig>,
    pub passphrase: String,
    /// Two exit requests on home closer than this quit the app.
    pub exit_window_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            subjects: vec![
                SubjectConfig::new("Physics", 2, 10),
                SubjectConfig::new("Chemistry", 2, 5),
                SubjectConfig::new("Math", 2, 10),
                SubjectConfig::new("Biology", 2, 12),
                SubjectConfig::new("English", 2, 0),
                SubjectConfig::new("ICT", 1, 0),
                SubjectConfig::new("Bangla", 2, 0),
            ],
            passphrase: "###@@@website".into(),
            exit_window_ms: 1500,
        }
    }
}

impl AppConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(|reason| Error::ConfigRejected {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    /// Like [`AppConfig::load`], but any failure logs and yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("powerplay: {}; using default config", e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.subjects.is_empty() {
            return Err("no subjects".into());
        }
        let mut seen = HashSet::new();
        for subject in &self.subjects {
            if subject.papers == 0 {
                return Err(format!("subject {} has no papers", subject.name));
            }
            if !seen.insert(subject.name.as_str()) {
                return Err(format!("duplicate subject {}", subject.name));
            }
        }
        Ok(())
    }

    /// Structure of `name`. Unknown subjects get one paper and no chapters.
    pub fn structure(&self, name: &str) -> SubjectConfig {
        self.subjects
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .unwrap_or_else(|| SubjectConfig::new(name, 1, 0))
    }

    pub fn subject_names(&self) -> impl Iterator<Item = &str> {
        self.subjects.iter().map(|s| s.name.as_str())
    }
}
