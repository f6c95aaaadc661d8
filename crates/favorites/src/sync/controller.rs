//! Sync controller
//!
//! Sequences server mutations with the reloads that follow them, keeps the
//! folder selection consistent with the tree, and funnels every failure into
//! a single error slot for the UI to show.

use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::Backend;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{Favorite, FavoriteId, Folder, FolderId, NewFavorite, SearchHit, TaskAck};
use crate::stores::{FavoriteListStore, FavoriteScope, FolderTree, FolderTreeStore, Mutation};
use crate::tasks::TaskPoller;

/// Coordinates the folder tree, the favorite list and the task poller
pub struct SyncController {
    backend: Arc<dyn Backend>,
    folders: FolderTreeStore,
    favorites: FavoriteListStore,
    poller: Option<Arc<TaskPoller>>,
    selection: Mutex<Option<FolderId>>,
    last_error: Mutex<Option<String>>,
}

impl SyncController {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::from_config(backend, &ClientConfig::default())
    }

    /// Build the stores with the preview budget and delete policy from `config`
    pub fn from_config(backend: Arc<dyn Backend>, config: &ClientConfig) -> Self {
        Self {
            folders: FolderTreeStore::new(backend.clone())
                .with_delete_moves_to_parent(config.delete_moves_to_parent),
            favorites: FavoriteListStore::new(backend.clone())
                .with_preview_chars(config.summary_preview_chars),
            backend,
            poller: None,
            selection: Mutex::new(None),
            last_error: Mutex::new(None),
        }
    }

    /// Builder method to attach the poller nudged after submissions
    pub fn with_poller(mut self, poller: Arc<TaskPoller>) -> Self {
        self.poller = Some(poller);
        self
    }

    pub fn folders(&self) -> &FolderTreeStore {
        &self.folders
    }

    pub fn favorites(&self) -> &FavoriteListStore {
        &self.favorites
    }

    pub fn poller(&self) -> Option<&Arc<TaskPoller>> {
        self.poller.as_ref()
    }

    fn selection(&self) -> MutexGuard<'_, Option<FolderId>> {
        self.selection.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn error_slot(&self) -> MutexGuard<'_, Option<String>> {
        self.last_error.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn selected_folder(&self) -> Option<FolderId> {
        *self.selection()
    }

    /// Most recent failure, if any
    pub fn last_error(&self) -> Option<String> {
        self.error_slot().clone()
    }

    pub fn clear_error(&self) {
        *self.error_slot() = None;
    }

    fn record_error(&self, context: &str, err: &Error) {
        error!("{}: {}", context, err);
        *self.error_slot() = Some(format!("{}: {}", context, err));
    }

    /// Reload the tree, then the list for the current selection
    pub async fn refresh(&self) -> bool {
        if let Err(e) = self.folders.load().await {
            self.record_error("Failed to load folders", &e);
            return false;
        }
        self.reconcile_selection();
        self.reload_favorites().await
    }

    /// Select a folder (`None` or the root shows everything)
    ///
    /// Issues exactly one list load. An id missing from the tree is rejected
    /// without a request.
    pub async fn select_folder(&self, id: Option<FolderId>) -> bool {
        if let Some(id) = id {
            if self.folders.find_by_id(id).is_none() {
                self.record_error("Cannot select folder", &Error::FolderNotFound(id));
                return false;
            }
        }
        *self.selection() = id;
        self.reload_favorites().await
    }

    /// Fetch a single folder with its children straight from the server
    pub async fn folder_detail(&self, id: FolderId) -> Option<Folder> {
        match self.folders.fetch_detail(id).await {
            Ok(folder) => Some(folder),
            Err(e) => {
                self.record_error("Failed to load folder", &e);
                None
            }
        }
    }

    pub async fn create_folder(
        &self,
        name: &str,
        description: Option<&str>,
        parent_id: Option<FolderId>,
    ) -> Option<Folder> {
        let before = self.folders.snapshot();
        match self.folders.create(name, description, parent_id).await {
            Ok(mutation) => {
                let id = mutation.value.id;
                Some(self.finish_mutation(&before, id, mutation).await)
            }
            Err(e) => {
                self.record_error("Failed to create folder", &e);
                None
            }
        }
    }

    /// Delete a folder; a selection on it falls back to all favorites
    pub async fn delete_folder(&self, id: FolderId) -> bool {
        let before = self.folders.snapshot();
        match self.folders.delete(id).await {
            Ok(mutation) => {
                {
                    let mut selection = self.selection();
                    if *selection == Some(id) {
                        info!("Selected folder {} was deleted, showing all favorites", id);
                        *selection = None;
                    }
                }
                self.finish_mutation(&before, id, mutation).await;
                true
            }
            Err(e) => {
                self.record_error("Failed to delete folder", &e);
                false
            }
        }
    }

    pub async fn rename_folder(&self, id: FolderId, name: &str, description: Option<&str>) -> Option<Folder> {
        let before = self.folders.snapshot();
        match self.folders.rename(id, name, description).await {
            Ok(mutation) => Some(self.finish_mutation(&before, id, mutation).await),
            Err(e) => {
                self.record_error("Failed to rename folder", &e);
                None
            }
        }
    }

    pub async fn move_folder(&self, id: FolderId, new_parent: FolderId) -> bool {
        let before = self.folders.snapshot();
        match self.folders.move_to(id, new_parent).await {
            Ok(mutation) => {
                self.finish_mutation(&before, id, mutation).await;
                true
            }
            Err(e) => {
                self.record_error("Failed to move folder", &e);
                false
            }
        }
    }

    /// Flip a folder's expansion in the sidebar
    pub fn toggle_folder(&self, id: Option<FolderId>) -> bool {
        self.folders.toggle(id)
    }

    /// Flip a favorite's summary between preview and full text
    pub fn toggle_description(&self, id: FavoriteId) -> bool {
        self.favorites.toggle_description(id)
    }

    /// Queue a favorite for processing
    ///
    /// The favorite only shows up once the server's task finishes, so the
    /// list is left alone and the poller is asked to check tasks right away.
    pub async fn submit_favorite(
        &self,
        url: &str,
        title: Option<&str>,
        folder_id: Option<FolderId>,
        tags: &[String],
        metadata: Option<&str>,
    ) -> Option<TaskAck> {
        let request = match self.build_favorite(url, title, folder_id, tags, metadata) {
            Ok(request) => request,
            Err(e) => {
                self.record_error("Cannot save favorite", &e);
                return None;
            }
        };

        let ack = match self.backend.create_favorite(&request).await {
            Ok(ack) => ack,
            Err(e) => {
                self.record_error("Failed to save favorite", &e);
                return None;
            }
        };
        info!("Queued favorite {} as task {}", request.url, ack.task_id);

        if let Some(poller) = &self.poller {
            if let Err(e) = poller.poll_now().await {
                warn!("Task poll after submission failed: {}", e);
            }
        }
        Some(ack)
    }

    /// Semantic search; results are returned, the favorite list is untouched
    pub async fn search(&self, query: &str) -> Option<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            self.record_error("Cannot search", &Error::validation("Search query cannot be empty"));
            return None;
        }
        match self.backend.search(query).await {
            Ok(hits) => Some(hits),
            Err(e) => {
                self.record_error("Search failed", &e);
                None
            }
        }
    }

    /// Favorites currently listed
    pub fn visible_favorites(&self) -> Vec<Favorite> {
        self.favorites.favorites()
    }

    fn build_favorite(
        &self,
        url: &str,
        title: Option<&str>,
        folder_id: Option<FolderId>,
        tags: &[String],
        metadata: Option<&str>,
    ) -> Result<NewFavorite> {
        let url = validate_url(url)?;
        if let Some(folder) = folder_id {
            if self.folders.find_by_id(folder).is_none() {
                return Err(Error::FolderNotFound(folder));
            }
        }
        Ok(NewFavorite {
            url,
            title: non_blank(title),
            folder_id,
            tags: clean_tags(tags),
            metadata: non_blank(metadata),
            ..Default::default()
        })
    }

    /// Report the reload that followed an accepted mutation, then refresh the
    /// list if the change can affect it
    async fn finish_mutation<T>(
        &self,
        before: &FolderTree,
        mutated: FolderId,
        mutation: Mutation<T>,
    ) -> T {
        let Mutation { value, reload } = mutation;
        match reload {
            None => debug!("Folder {} unchanged, skipping reload", mutated),
            Some(reload) => {
                if let Err(e) = reload {
                    self.record_error("Failed to load folders", &e);
                }
                self.after_folder_mutation(before, mutated).await;
            }
        }
        value
    }

    async fn after_folder_mutation(&self, before: &FolderTree, mutated: FolderId) {
        let after = self.folders.snapshot();
        let selection = self.selected_folder();
        let depends = view_depends_on(before, selection, mutated)
            || view_depends_on(&after, selection, mutated);
        let cleared = self.reconcile_selection();
        if depends || cleared {
            self.reload_favorites().await;
        }
    }

    /// Clear a selection that no longer exists in the tree; returns whether it did
    fn reconcile_selection(&self) -> bool {
        let tree = self.folders.snapshot();
        let mut selection = self.selection();
        match *selection {
            Some(id) if !tree.contains(id) => {
                info!("Selected folder {} is gone, showing all favorites", id);
                *selection = None;
                true
            }
            _ => false,
        }
    }

    async fn reload_favorites(&self) -> bool {
        let scope = FavoriteScope::for_selection(self.selected_folder(), &self.folders.snapshot());
        match self.favorites.load(scope).await {
            Ok(_) => true,
            Err(e) => {
                self.record_error("Failed to load favorites", &e);
                false
            }
        }
    }
}

/// Whether the favorite list for `selection` can change when `mutated` changes
fn view_depends_on(tree: &FolderTree, selection: Option<FolderId>, mutated: FolderId) -> bool {
    match selection {
        None => true,
        Some(selected) => tree.is_root(selected) || tree.is_in_subtree(selected, mutated),
    }
}

/// Accept absolute http(s) URLs only
fn validate_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("URL cannot be empty"));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| Error::validation(format!("Invalid URL {:?}: {}", trimmed, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::validation(format!(
            "URL must use http or https, got {}",
            parsed.scheme()
        )));
    }
    Ok(trimmed.to_string())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.to_lowercase()))
        .map(str::to_string)
        .collect()
}
