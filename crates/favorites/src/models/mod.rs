//! Domain models for folders, favorites, and background tasks

mod favorite;
mod folder;
mod task;

pub use favorite::{Favorite, FavoriteId, NewFavorite, SearchHit, Tag, TaskAck};
pub use folder::{Folder, FolderId, NewFolder, ROOT_DISPLAY_NAME};
pub use task::{Task, TaskStatus};
