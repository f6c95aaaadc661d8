//! Favorites crate - Client core for a bookmark organizer
//!
//! This crate provides the platform-independent half of the favorites client:
//! - Domain models (Folder, Favorite, Task)
//! - Backend trait with an HTTP client and an in-memory stand-in
//! - Folder tree and favorite list stores with stale-response protection
//! - Background task poller
//! - Sync controller that sequences mutations, reloads, and errors
//!
//! It has no UI dependencies; views render the snapshots the stores expose.

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod stores;
pub mod sync;
pub mod tasks;
pub mod text;

pub use backend::{Backend, HttpBackend, InMemoryBackend};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use models::{
    Favorite, FavoriteId, Folder, FolderId, NewFavorite, NewFolder, ROOT_DISPLAY_NAME, SearchHit,
    Tag, Task, TaskAck, TaskStatus,
};
pub use stores::{
    FavoriteListStore, FavoriteScope, FolderIcon, FolderRecord, FolderRow, FolderTree,
    FolderTreeStore, LoadOutcome, Mutation,
};
pub use sync::SyncController;
pub use tasks::{PollStats, TaskPoller};
pub use text::truncate_text;
