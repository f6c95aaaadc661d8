//! Folder tree store
//!
//! Owns the folder snapshot and the client-only expansion state. Every
//! mutation goes to the server first and is followed by a full reload; the
//! snapshot is never edited locally. A mutation whose reload fails still
//! counts as done, the reload error travels alongside it in [`Mutation`].

use log::{debug, info};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{LoadOutcome, Mutation};
use super::tree::{FolderRecord, FolderRow, FolderTree};
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::models::{Folder, FolderId, NewFolder};

#[derive(Default)]
struct TreeState {
    tree: Arc<FolderTree>,
    expanded: HashSet<FolderId>,
    /// Incremented by every issued load; older responses are dropped
    generation: u64,
    loaded: bool,
}

/// Client-side cache of the folder hierarchy
pub struct FolderTreeStore {
    backend: Arc<dyn Backend>,
    state: Mutex<TreeState>,
    delete_moves_to_parent: bool,
}

impl FolderTreeStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: Mutex::new(TreeState::default()),
            delete_moves_to_parent: true,
        }
    }

    /// Builder method to choose what happens to a deleted folder's children
    pub fn with_delete_moves_to_parent(mut self, enabled: bool) -> Self {
        self.delete_moves_to_parent = enabled;
        self
    }

    fn lock(&self) -> MutexGuard<'_, TreeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current snapshot; cheap to clone and never mutated in place
    pub fn snapshot(&self) -> Arc<FolderTree> {
        self.lock().tree.clone()
    }

    /// Whether at least one load has been applied
    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    /// Fetch the full tree and replace the snapshot
    ///
    /// On failure the previous snapshot is kept. A response that arrives
    /// after a newer load was issued is discarded.
    pub async fn load(&self) -> Result<LoadOutcome> {
        let generation = {
            let mut state = self.lock();
            state.generation += 1;
            state.generation
        };

        let result = self.backend.list_folders().await;

        let mut state = self.lock();
        if state.generation != generation {
            debug!(
                "Discarding stale folder response (generation {}, current {})",
                generation, state.generation
            );
            return Ok(LoadOutcome::Stale);
        }
        let folders = result?;
        let tree = FolderTree::from_folders(&folders);
        debug!("Loaded {} folders", tree.len());
        state.expanded.retain(|id| tree.contains(*id));
        state.tree = Arc::new(tree);
        state.loaded = true;
        Ok(LoadOutcome::Applied)
    }

    /// Depth-first lookup in the current snapshot
    pub fn find_by_id(&self, id: FolderId) -> Option<FolderRecord> {
        self.snapshot().find_by_id(id).cloned()
    }

    /// Single folder detail straight from the server; the snapshot is untouched
    pub async fn fetch_detail(&self, id: FolderId) -> Result<Folder> {
        self.backend.get_folder(id).await
    }

    /// Create a folder, then reload the tree
    ///
    /// A missing parent defaults to the root.
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        parent_id: Option<FolderId>,
    ) -> Result<Mutation<Folder>> {
        let name = validate_name(name)?;
        let tree = self.snapshot();
        let parent_id = match parent_id {
            Some(parent) => {
                tree.find_by_id(parent).ok_or(Error::FolderNotFound(parent))?;
                Some(parent)
            }
            None => tree.root_id(),
        };

        let request = NewFolder {
            name,
            description: clean_description(description),
            parent_id,
        };
        let created = self.backend.create_folder(&request).await?;
        info!("Created folder {} ({})", created.name, created.id);

        Ok(Mutation::sent(created, self.load().await))
    }

    /// Delete a folder, then reload the tree
    ///
    /// The id must resolve in the current snapshot and must not be the root;
    /// otherwise nothing is sent.
    pub async fn delete(&self, id: FolderId) -> Result<Mutation<()>> {
        let tree = self.snapshot();
        tree.find_by_id(id).ok_or(Error::FolderNotFound(id))?;
        if tree.is_root(id) {
            return Err(Error::RootFolder);
        }

        self.backend
            .delete_folder(id, self.delete_moves_to_parent)
            .await?;
        info!("Deleted folder {}", id);

        self.lock().expanded.remove(&id);
        Ok(Mutation::sent((), self.load().await))
    }

    /// Rename a folder (and optionally replace its description)
    pub async fn rename(
        &self,
        id: FolderId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Mutation<Folder>> {
        let name = validate_name(name)?;
        let tree = self.snapshot();
        let record = tree.find_by_id(id).ok_or(Error::FolderNotFound(id))?;
        if tree.is_root(id) {
            return Err(Error::RootFolder);
        }

        // PUT replaces every field, so the parent must be sent back unchanged
        let request = NewFolder {
            name,
            description: clean_description(description).or_else(|| record.description.clone()),
            parent_id: record.parent_id,
        };
        let updated = self.backend.update_folder(id, &request).await?;
        info!("Renamed folder {} to {}", id, updated.name);

        Ok(Mutation::sent(updated, self.load().await))
    }

    /// Re-parent a folder, then reload the tree
    ///
    /// Moving a folder under its current parent sends nothing.
    pub async fn move_to(&self, id: FolderId, new_parent: FolderId) -> Result<Mutation<()>> {
        let tree = self.snapshot();
        let record = tree.find_by_id(id).ok_or(Error::FolderNotFound(id))?;
        tree.find_by_id(new_parent)
            .ok_or(Error::FolderNotFound(new_parent))?;
        if tree.is_root(id) {
            return Err(Error::RootFolder);
        }
        if tree.is_in_subtree(id, new_parent) {
            return Err(Error::validation(
                "Cannot move a folder into itself or one of its descendants",
            ));
        }
        if record.parent_id == Some(new_parent) {
            debug!("Folder {} already under {}", id, new_parent);
            return Ok(Mutation::unchanged(()));
        }

        self.backend.move_folder(id, new_parent).await?;
        info!("Moved folder {} under {}", id, new_parent);

        Ok(Mutation::sent((), self.load().await))
    }

    /// Expand a folder; `None`, unknown ids, and leaves are ignored
    pub fn expand(&self, id: Option<FolderId>) {
        let Some(id) = id else { return };
        let tree = self.snapshot();
        if tree.contains(id) && !tree.is_leaf(id) {
            self.lock().expanded.insert(id);
        }
    }

    pub fn collapse(&self, id: Option<FolderId>) {
        let Some(id) = id else { return };
        self.lock().expanded.remove(&id);
    }

    /// Flip a folder's expansion, returning the new state
    pub fn toggle(&self, id: Option<FolderId>) -> bool {
        let Some(id) = id else { return false };
        if self.is_expanded(id) {
            self.collapse(Some(id));
            false
        } else {
            self.expand(Some(id));
            self.is_expanded(id)
        }
    }

    pub fn is_expanded(&self, id: FolderId) -> bool {
        self.lock().expanded.contains(&id)
    }

    /// Visible rows of the sidebar for the current expansion state
    pub fn visible_rows(&self) -> Vec<FolderRow> {
        let (tree, expanded) = {
            let state = self.lock();
            (state.tree.clone(), state.expanded.clone())
        };
        tree.rows(&expanded)
    }

    /// Path string such as `Favorites / Work / Clients`
    pub fn path_of(&self, id: FolderId) -> Option<String> {
        self.snapshot().path_of(id)
    }

    pub fn is_in_subtree(&self, ancestor: FolderId, id: FolderId) -> bool {
        self.snapshot().is_in_subtree(ancestor, id)
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Folder name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}
