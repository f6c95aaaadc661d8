//! Backend collaborator
//!
//! This module provides:
//! - The [`Backend`] trait the stores and poller talk to
//! - [`HttpBackend`], the REST client for the favorites server
//! - [`InMemoryBackend`], an in-process stand-in for tests and demos

mod http;
mod memory;

pub use http::HttpBackend;
pub use memory::InMemoryBackend;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Favorite, Folder, FolderId, NewFavorite, NewFolder, SearchHit, Task, TaskAck};

/// Operations the favorites server exposes
///
/// Implementations map transport failures to `Error::Network`, non-2xx
/// responses to `Error::Fetch`, and bad bodies to `Error::Decode`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Full folder tree (every folder, children nested)
    async fn list_folders(&self) -> Result<Vec<Folder>>;

    /// Single folder with its children
    async fn get_folder(&self, id: FolderId) -> Result<Folder>;

    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder>;

    /// Replace a folder's name, description, and parent
    async fn update_folder(&self, id: FolderId, folder: &NewFolder) -> Result<Folder>;

    async fn move_folder(&self, id: FolderId, new_parent: FolderId) -> Result<Folder>;

    /// Delete a folder; with `move_to_parent` its children and favorites are
    /// re-homed under its parent instead of being detached
    async fn delete_folder(&self, id: FolderId, move_to_parent: bool) -> Result<()>;

    async fn list_favorites(&self) -> Result<Vec<Favorite>>;

    /// Favorites in a folder, optionally including every descendant folder
    async fn list_folder_favorites(&self, id: FolderId, include_children: bool) -> Result<Vec<Favorite>>;

    /// Queue a favorite for background processing
    async fn create_favorite(&self, favorite: &NewFavorite) -> Result<TaskAck>;

    async fn list_tasks(&self) -> Result<Vec<Task>>;

    async fn get_task(&self, id: &str) -> Result<Task>;

    /// Semantic search over favorite summaries
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// REST paths of the favorites server
pub mod endpoints {
    use crate::models::FolderId;

    pub const FOLDERS: &str = "/api/folders/";
    pub const FAVORITES: &str = "/api/favorites";
    pub const CREATE_FAVORITE: &str = "/api/favorites/";
    pub const TASKS: &str = "/api/favorites/tasks";

    pub fn folder(id: FolderId) -> String {
        format!("/api/folders/{}", id)
    }

    pub fn delete_folder(id: FolderId, move_to_parent: bool) -> String {
        format!("/api/folders/{}?move_to_parent={}", id, move_to_parent)
    }

    pub fn move_folder(id: FolderId, new_parent: FolderId) -> String {
        format!("/api/folders/{}/move?new_parent_id={}", id, new_parent)
    }

    pub fn folder_favorites(id: FolderId, include_children: bool) -> String {
        format!("/api/folders/{}/favorites?include_children={}", id, include_children)
    }

    pub fn task(id: &str) -> String {
        format!("/api/favorites/task/{}", urlencoding::encode(id))
    }

    pub fn search(query: &str) -> String {
        format!("/api/favorites/search/vector?query={}", urlencoding::encode(query))
    }

    /// Label used in errors and logs, e.g. `GET /api/folders/`
    pub fn label(method: &str, path: &str) -> String {
        format!("{} {}", method, path)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_paths() {
            assert_eq!(
                folder_favorites(FolderId(3), true),
                "/api/folders/3/favorites?include_children=true"
            );
            assert_eq!(delete_folder(FolderId(4), true), "/api/folders/4?move_to_parent=true");
            assert_eq!(move_folder(FolderId(4), FolderId(1)), "/api/folders/4/move?new_parent_id=1");
            assert_eq!(search("rust async"), "/api/favorites/search/vector?query=rust%20async");
            assert_eq!(task("a/b"), "/api/favorites/task/a%2Fb");
        }
    }
}
