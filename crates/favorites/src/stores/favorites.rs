//! Favorite list store

use log::debug;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::LoadOutcome;
use super::tree::FolderTree;
use crate::backend::Backend;
use crate::error::Result;
use crate::models::{Favorite, FavoriteId, FolderId};
use crate::text::truncate_text;

/// Which favorites the list shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FavoriteScope {
    /// Every favorite
    #[default]
    All,
    /// A folder and all of its descendants
    Subtree(FolderId),
}

impl FavoriteScope {
    /// Scope for a selected folder; no selection and the root both mean `All`
    pub fn for_selection(selected: Option<FolderId>, tree: &FolderTree) -> Self {
        match selected {
            Some(id) if !tree.is_root(id) => FavoriteScope::Subtree(id),
            _ => FavoriteScope::All,
        }
    }
}

#[derive(Default)]
struct ListState {
    favorites: Vec<Favorite>,
    scope: FavoriteScope,
    expanded: HashSet<FavoriteId>,
    generation: u64,
}

/// The favorites shown for the current folder selection
pub struct FavoriteListStore {
    backend: Arc<dyn Backend>,
    state: Mutex<ListState>,
    preview_chars: usize,
}

impl FavoriteListStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: Mutex::new(ListState::default()),
            preview_chars: 100,
        }
    }

    /// Builder method to set how many characters of a collapsed summary are shown
    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the list with the favorites in `scope`
    ///
    /// Only the most recently issued load may apply its response; earlier
    /// ones report `Stale`, even when they failed.
    pub async fn load(&self, scope: FavoriteScope) -> Result<LoadOutcome> {
        let generation = {
            let mut state = self.lock();
            state.generation += 1;
            state.generation
        };

        let result = match scope {
            FavoriteScope::All => self.backend.list_favorites().await,
            FavoriteScope::Subtree(id) => self.backend.list_folder_favorites(id, true).await,
        };

        let mut state = self.lock();
        if state.generation != generation {
            debug!("Discarding stale favorites response for {:?}", scope);
            return Ok(LoadOutcome::Stale);
        }
        let mut favorites = result?;
        for favorite in &mut favorites {
            favorite.dedup_tags();
        }
        debug!("Loaded {} favorites for {:?}", favorites.len(), scope);

        let present: HashSet<FavoriteId> = favorites.iter().map(|f| f.id).collect();
        state.expanded.retain(|id| present.contains(id));
        state.favorites = favorites;
        state.scope = scope;
        Ok(LoadOutcome::Applied)
    }

    pub async fn load_all(&self) -> Result<LoadOutcome> {
        self.load(FavoriteScope::All).await
    }

    /// Load the subtree of `folder`, or everything when it is the root
    pub async fn load_for_folder(&self, folder: FolderId, tree: &FolderTree) -> Result<LoadOutcome> {
        self.load(FavoriteScope::for_selection(Some(folder), tree))
            .await
    }

    pub fn favorites(&self) -> Vec<Favorite> {
        self.lock().favorites.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().favorites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().favorites.is_empty()
    }

    /// Scope of the favorites currently held
    pub fn scope(&self) -> FavoriteScope {
        self.lock().scope
    }

    /// Flip a favorite's summary between preview and full text, returning the new state
    pub fn toggle_description(&self, id: FavoriteId) -> bool {
        let mut state = self.lock();
        if state.expanded.remove(&id) {
            false
        } else {
            state.expanded.insert(id)
        }
    }

    pub fn is_description_expanded(&self, id: FavoriteId) -> bool {
        self.lock().expanded.contains(&id)
    }

    /// Summary text as it should be displayed for the favorite's expansion state
    pub fn summary_text(&self, favorite: &Favorite) -> Option<String> {
        let summary = favorite.summary.as_deref()?;
        if self.is_description_expanded(favorite.id) {
            Some(summary.to_string())
        } else {
            Some(truncate_text(summary, self.preview_chars))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::models::{Folder, Tag};

    #[test]
    fn test_scope_for_selection() {
        let tree = FolderTree::from_folders(&[
            Folder::new(1, "Root", None).with_children(vec![Folder::new(2, "Work", Some(FolderId(1)))]),
        ]);
        assert_eq!(FavoriteScope::for_selection(None, &tree), FavoriteScope::All);
        assert_eq!(FavoriteScope::for_selection(Some(FolderId(1)), &tree), FavoriteScope::All);
        assert_eq!(
            FavoriteScope::for_selection(Some(FolderId(2)), &tree),
            FavoriteScope::Subtree(FolderId(2))
        );
    }

    #[tokio::test]
    async fn test_load_dedups_tags() {
        let backend = Arc::new(InMemoryBackend::new());
        let docs = Tag {
            id: 1,
            name: "docs".to_string(),
        };
        backend.add_favorite(
            Favorite::new(0, "https://example.com", None).with_tags(vec![docs.clone(), docs]),
        );
        let store = FavoriteListStore::new(backend);

        assert_eq!(store.load_all().await.unwrap(), LoadOutcome::Applied);
        assert_eq!(store.favorites()[0].tags.len(), 1);
        assert_eq!(store.scope(), FavoriteScope::All);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_list() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.add_favorite(Favorite::new(0, "https://example.com", None));
        let store = FavoriteListStore::new(backend.clone());
        store.load_all().await.unwrap();

        backend.fail_with_status(Some(503));
        let err = store.load(FavoriteScope::Subtree(backend.root_id())).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(store.len(), 1);
        assert_eq!(store.scope(), FavoriteScope::All);
    }

    #[tokio::test]
    async fn test_summary_preview_and_expansion() {
        let backend = Arc::new(InMemoryBackend::new());
        let id = backend.add_favorite(
            Favorite::new(0, "https://example.com", None).with_summary("x".repeat(150)),
        );
        let store = FavoriteListStore::new(backend.clone());
        store.load_all().await.unwrap();
        let favorite = store.favorites().remove(0);

        let preview = store.summary_text(&favorite).unwrap();
        assert_eq!(preview, format!("{}...", "x".repeat(100)));

        assert!(store.toggle_description(id));
        assert_eq!(store.summary_text(&favorite).unwrap().len(), 150);
        assert!(!store.toggle_description(id));
        assert!(!store.is_description_expanded(id));
    }

    #[tokio::test]
    async fn test_expansion_pruned_on_reload() {
        let backend = Arc::new(InMemoryBackend::new());
        let root = backend.root_id();
        let work = backend.add_folder("Work", Some(root));
        let outside = backend.add_favorite(Favorite::new(0, "https://a.example", Some(root)));
        let inside = backend.add_favorite(Favorite::new(0, "https://b.example", Some(work)));
        let store = FavoriteListStore::new(backend);
        store.load_all().await.unwrap();
        store.toggle_description(outside);
        store.toggle_description(inside);

        store.load(FavoriteScope::Subtree(work)).await.unwrap();
        assert!(!store.is_description_expanded(outside));
        assert!(store.is_description_expanded(inside));
    }
}
