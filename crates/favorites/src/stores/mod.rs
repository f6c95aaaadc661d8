//! Client-side stores
//!
//! Each store caches one server collection, reloads it wholesale after a
//! mutation, and drops responses that were overtaken by a newer request.

mod favorites;
mod folders;
mod tree;

use crate::error::Result;

pub use favorites::{FavoriteListStore, FavoriteScope};
pub use folders::FolderTreeStore;
pub use tree::{FolderIcon, FolderRecord, FolderRow, FolderTree, PATH_SEPARATOR};

/// Result of a load that completed without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The response replaced the store's state
    Applied,
    /// A newer load was issued while this one was in flight; the response was dropped
    Stale,
}

impl LoadOutcome {
    pub fn is_applied(self) -> bool {
        self == LoadOutcome::Applied
    }
}

/// A mutation the server accepted, plus the reload that followed it
///
/// The server's answer decides success. A failed reload leaves the old
/// snapshot in place but does not undo the mutation.
#[derive(Debug)]
pub struct Mutation<T> {
    pub value: T,
    /// `None` when the request was a no-op and nothing was sent
    pub reload: Option<Result<LoadOutcome>>,
}

impl<T> Mutation<T> {
    fn sent(value: T, reload: Result<LoadOutcome>) -> Self {
        Self {
            value,
            reload: Some(reload),
        }
    }

    fn unchanged(value: T) -> Self {
        Self {
            value,
            reload: None,
        }
    }

    /// Whether a request actually went to the server
    pub fn changed(&self) -> bool {
        self.reload.is_some()
    }
}
