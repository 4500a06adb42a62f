use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;

use crate::error::error_chain_fmt;

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Announcement {
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub body: String,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Announcements ordered from the newest to the oldest.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    announcements: Vec<Announcement>,
}

#[derive(thiserror::Error)]
pub enum TimelineError {
    #[error("Failed to read the timeline file {path}.")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("The timeline file is not valid JSON.")]
    Parse(#[from] serde_json::Error),
    #[error("Announcement slug {0:?} is not valid.")]
    InvalidSlug(String),
    #[error("Announcement slug {0:?} is used more than once.")]
    DuplicateSlug(String),
}

impl std::fmt::Debug for TimelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl Timeline {
    pub fn load(path: impl AsRef<Path>) -> Result<Timeline, TimelineError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| TimelineError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Timeline::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Timeline, TimelineError> {
        let announcements: Vec<Announcement> = serde_json::from_str(raw)?;

        Timeline::new(announcements)
    }

    pub fn new(mut announcements: Vec<Announcement>) -> Result<Timeline, TimelineError> {
        let mut slugs = HashSet::new();

        for announcement in &announcements {
            let is_valid_slug = !announcement.slug.is_empty()
                && announcement
                    .slug
                    .chars()
                    .all(|char| char.is_ascii_lowercase() || char.is_ascii_digit() || char == '-');

            if !is_valid_slug {
                return Err(TimelineError::InvalidSlug(announcement.slug.clone()));
            }

            if !slugs.insert(announcement.slug.as_str()) {
                return Err(TimelineError::DuplicateSlug(announcement.slug.clone()));
            }
        }

        announcements.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        Ok(Timeline { announcements })
    }

    pub fn announcements(&self) -> &[Announcement] {
        &self.announcements
    }

    pub fn latest_update(&self) -> Option<DateTime<Utc>> {
        self.announcements.first().map(|announcement| announcement.published_at)
    }
}
