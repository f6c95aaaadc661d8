//! Favorite (saved web page) model

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::FolderId;

/// Unique identifier for a favorite (server-assigned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoriteId(pub i64);

impl From<i64> for FavoriteId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for FavoriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tag attached to a favorite
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A saved web page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: FavoriteId,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Server-generated summary, absent until the background task finishes
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub folder_id: Option<FolderId>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl Favorite {
    pub fn new(id: impl Into<FavoriteId>, url: impl Into<String>, folder_id: Option<FolderId>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: None,
            summary: None,
            folder_id,
            tags: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    /// Title to show, falling back to the URL
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => &self.url,
        }
    }

    /// Drop repeated tags, keeping the first occurrence of each id
    pub fn dedup_tags(&mut self) {
        let mut seen = HashSet::new();
        self.tags.retain(|tag| seen.insert(tag.id));
    }
}

/// Request body for submitting a new favorite
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewFavorite {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<FolderId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Page metadata gathered by the capturing client, passed to the summarizer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl NewFavorite {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Acknowledgment returned when a favorite is queued for processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAck {
    pub task_id: String,
}

/// A semantic search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub id: Option<FavoriteId>,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Embedding distance; lower is closer
    #[serde(default)]
    pub distance: Option<f64>,
}
