//! Folder model for the favorites hierarchy

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name shown for the root folder regardless of what the server calls it
pub const ROOT_DISPLAY_NAME: &str = "Favorites";

/// Unique identifier for a folder (server-assigned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(pub i64);

impl FolderId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for FolderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A folder as the backend sends it, with its children nested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Parent folder, `None` for the root (and for orphans)
    #[serde(default)]
    pub parent_id: Option<FolderId>,
    /// Explicit root marker; older servers omit it
    #[serde(default)]
    pub is_root: bool,
    #[serde(default)]
    pub children: Vec<Folder>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl Folder {
    /// Create a folder with no children
    pub fn new(id: impl Into<FolderId>, name: impl Into<String>, parent_id: Option<FolderId>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            parent_id,
            is_root: false,
            children: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Builder method to attach children
    pub fn with_children(mut self, children: Vec<Folder>) -> Self {
        self.children = children;
        self
    }

    /// Builder method to set the explicit root flag
    pub fn marked_root(mut self) -> Self {
        self.is_root = true;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Request body for creating or updating a folder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFolder {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parent_id: Option<FolderId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_server_folder() {
        let json = r#"{
            "id": 1,
            "name": "Root",
            "description": "Root folder for all categories",
            "parent_id": null,
            "created_at": "2024-05-01T10:00:00.123456",
            "updated_at": "2024-05-01T10:00:00.123456",
            "children": [
                {"id": 2, "name": "Work", "parent_id": 1, "children": [], "favorites": []}
            ],
            "favorites": []
        }"#;

        let folder: Folder = serde_json::from_str(json).unwrap();
        assert_eq!(folder.id, FolderId(1));
        assert!(folder.parent_id.is_none());
        assert!(!folder.is_root);
        assert!(folder.created_at.is_some());
        assert_eq!(folder.children.len(), 1);
        assert_eq!(folder.children[0].parent_id, Some(FolderId(1)));
        assert!(folder.children[0].is_leaf());
    }

    #[test]
    fn test_new_folder_omits_missing_description() {
        let body = NewFolder {
            name: "Work".to_string(),
            description: None,
            parent_id: Some(FolderId(1)),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Work", "parent_id": 1}));
    }
}
