//! In-memory backend
//!
//! Behaves like the favorites server closely enough for tests and the
//! offline demo: folder trees are returned in the server's shape (every
//! folder at the top level with children nested), subtree queries expand
//! descendants, and created favorites only appear once their task completes.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{Backend, endpoints};
use crate::error::{Error, Result};
use crate::models::{
    Favorite, FavoriteId, Folder, FolderId, NewFavorite, NewFolder, SearchHit, Tag, Task, TaskAck,
    TaskStatus,
};

#[derive(Debug, Clone)]
struct FolderRow {
    name: String,
    description: Option<String>,
    parent_id: Option<FolderId>,
}

#[derive(Default)]
struct MemoryState {
    folders: BTreeMap<FolderId, FolderRow>,
    favorites: BTreeMap<FavoriteId, Favorite>,
    tags: BTreeMap<String, i64>,
    tasks: Vec<Task>,
    /// Submitted favorites waiting for their task to complete
    pending: Vec<(String, NewFavorite)>,
    next_folder_id: i64,
    next_favorite_id: i64,
    next_task_id: u64,
    requests: Vec<String>,
    offline: bool,
    fail_status: Option<u16>,
    /// Exact request label that fails as if the server were unreachable
    failing_endpoint: Option<String>,
}

/// In-memory implementation of [`Backend`]
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Create a backend holding only the root folder (id 1, named "Root")
    pub fn new() -> Self {
        let mut state = MemoryState {
            next_folder_id: 1,
            next_favorite_id: 1,
            next_task_id: 1,
            ..Default::default()
        };
        let root = FolderId(state.next_folder_id);
        state.next_folder_id += 1;
        state.folders.insert(
            root,
            FolderRow {
                name: "Root".to_string(),
                description: Some("Root folder for all categories".to_string()),
                parent_id: None,
            },
        );
        Self {
            state: Mutex::new(state),
        }
    }

    /// A small seeded collection used by the CLI's demo mode
    pub fn demo() -> Self {
        let backend = Self::new();
        let root = backend.root_id();
        let work = backend.add_folder("Work", Some(root));
        let personal = backend.add_folder("Personal", Some(root));
        let learning = backend.add_folder("Learning", Some(root));
        let rust = backend.add_folder("Rust", Some(learning));
        backend.add_folder("Entertainment", Some(root));

        backend.add_favorite(
            Favorite::new(0, "https://doc.rust-lang.org/book/", Some(rust))
                .with_title("The Rust Programming Language")
                .with_summary("The official book on Rust, covering ownership, borrowing, lifetimes, traits, error handling, concurrency, and asynchronous programming with futures."),
        );
        backend.add_favorite(
            Favorite::new(0, "https://tokio.rs/tokio/tutorial", Some(learning))
                .with_title("Tokio tutorial")
                .with_summary("A hands-on guide to building asynchronous network applications with the Tokio runtime."),
        );
        backend.add_favorite(
            Favorite::new(0, "https://example.com/quarterly-plan", Some(work))
                .with_title("Quarterly plan")
                .with_summary("Team goals and milestones for the quarter."),
        );
        backend.add_favorite(
            Favorite::new(0, "https://example.com/recipes/bread", Some(personal))
                .with_title("Sourdough bread")
                .with_summary("Step by step sourdough recipe with timings for a cold overnight proof."),
        );
        backend
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Id of the root folder
    pub fn root_id(&self) -> FolderId {
        FolderId(1)
    }

    /// Seed a folder without recording a request
    pub fn add_folder(&self, name: &str, parent_id: Option<FolderId>) -> FolderId {
        let mut state = self.lock();
        let id = FolderId(state.next_folder_id);
        state.next_folder_id += 1;
        state.folders.insert(
            id,
            FolderRow {
                name: name.to_string(),
                description: None,
                parent_id,
            },
        );
        id
    }

    /// Seed a favorite without recording a request; the id is reassigned
    pub fn add_favorite(&self, mut favorite: Favorite) -> FavoriteId {
        let mut state = self.lock();
        let id = FavoriteId(state.next_favorite_id);
        state.next_favorite_id += 1;
        favorite.id = id;
        state.favorites.insert(id, favorite);
        id
    }

    /// Replace the task list the server reports
    pub fn set_tasks(&self, tasks: Vec<Task>) {
        self.lock().tasks = tasks;
    }

    /// Mark a queued favorite's task done and make the favorite visible
    pub fn complete_task(&self, task_id: &str) -> Option<FavoriteId> {
        let mut state = self.lock();
        let position = state.pending.iter().position(|(id, _)| id == task_id)?;
        let (_, new_favorite) = state.pending.remove(position);

        let id = FavoriteId(state.next_favorite_id);
        state.next_favorite_id += 1;
        let tags = new_favorite
            .tags
            .iter()
            .map(|name| {
                let next = state.tags.len() as i64 + 1;
                let tag_id = *state.tags.entry(name.clone()).or_insert(next);
                Tag {
                    id: tag_id,
                    name: name.clone(),
                }
            })
            .collect();
        let now = Utc::now().naive_utc();
        let summary = new_favorite
            .summary
            .clone()
            .unwrap_or_else(|| format!("Summary of {}", new_favorite.url));
        let favorite = Favorite {
            id,
            url: new_favorite.url,
            title: new_favorite.title,
            summary: Some(summary),
            folder_id: new_favorite.folder_id,
            tags,
            created_at: Some(now),
            updated_at: Some(now),
        };
        state.favorites.insert(id, favorite);

        if let Some(task) = state.tasks.iter_mut().find(|t| t.id == task_id) {
            task.status = TaskStatus::Done;
            task.progress = 100;
        }
        Some(id)
    }

    /// Make every call fail as if the server were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Make every call answer with the given HTTP status (None to recover)
    pub fn fail_with_status(&self, status: Option<u16>) {
        self.lock().fail_status = status;
    }

    /// Make one endpoint unreachable, matched by its exact `METHOD path` label
    pub fn fail_endpoint(&self, endpoint: Option<&str>) {
        self.lock().failing_endpoint = endpoint.map(str::to_string);
    }

    /// The submission behind a task that has not completed yet
    pub fn pending_favorite(&self, task_id: &str) -> Option<NewFavorite> {
        self.lock()
            .pending
            .iter()
            .find(|(id, _)| id == task_id)
            .map(|(_, favorite)| favorite.clone())
    }

    /// Requests received so far, as `METHOD path` labels
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    /// Number of requests whose label starts with `prefix`
    pub fn request_count(&self, prefix: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }

    pub fn folder_parent(&self, id: FolderId) -> Option<Option<FolderId>> {
        self.lock().folders.get(&id).map(|row| row.parent_id)
    }

    pub fn has_folder(&self, id: FolderId) -> bool {
        self.lock().folders.contains_key(&id)
    }

    /// Record the request and apply injected failures
    fn begin(&self, method: &str, path: &str) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        let endpoint = endpoints::label(method, path);
        let mut state = self.lock();
        state.requests.push(endpoint.clone());
        if state.offline || state.failing_endpoint.as_ref() == Some(&endpoint) {
            return Err(Error::Network {
                endpoint,
                message: "Connection refused".to_string(),
            });
        }
        if let Some(status) = state.fail_status {
            return Err(Error::Fetch { status, endpoint });
        }
        Ok(state)
    }
}

impl MemoryState {
    fn build_folder(&self, id: FolderId) -> Option<Folder> {
        let row = self.folders.get(&id)?;
        let children = self
            .folders
            .iter()
            .filter(|(_, child)| child.parent_id == Some(id))
            .filter_map(|(child_id, _)| self.build_folder(*child_id))
            .collect();
        Some(Folder {
            id,
            name: row.name.clone(),
            description: row.description.clone(),
            parent_id: row.parent_id,
            is_root: false,
            children,
            created_at: None,
            updated_at: None,
        })
    }

    fn subtree_ids(&self, id: FolderId) -> Vec<FolderId> {
        let mut ids = vec![id];
        let mut cursor = 0;
        while cursor < ids.len() {
            let current = ids[cursor];
            ids.extend(
                self.folders
                    .iter()
                    .filter(|(_, row)| row.parent_id == Some(current))
                    .map(|(child_id, _)| *child_id),
            );
            cursor += 1;
        }
        ids
    }

    fn not_found(method: &str, path: &str) -> Error {
        Error::Fetch {
            status: 404,
            endpoint: endpoints::label(method, path),
        }
    }

    fn write_folder(&mut self, id: FolderId, folder: &NewFolder) {
        self.folders.insert(
            id,
            FolderRow {
                name: folder.name.clone(),
                description: folder.description.clone(),
                parent_id: folder.parent_id,
            },
        );
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn list_folders(&self) -> Result<Vec<Folder>> {
        let state = self.begin("GET", endpoints::FOLDERS)?;
        Ok(state
            .folders
            .keys()
            .filter_map(|id| state.build_folder(*id))
            .collect())
    }

    async fn get_folder(&self, id: FolderId) -> Result<Folder> {
        let path = endpoints::folder(id);
        let state = self.begin("GET", &path)?;
        state
            .build_folder(id)
            .ok_or_else(|| MemoryState::not_found("GET", &path))
    }

    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder> {
        let mut state = self.begin("POST", endpoints::FOLDERS)?;
        if let Some(parent) = folder.parent_id {
            if !state.folders.contains_key(&parent) {
                return Err(MemoryState::not_found("POST", endpoints::FOLDERS));
            }
        }
        let id = FolderId(state.next_folder_id);
        state.next_folder_id += 1;
        state.write_folder(id, folder);
        state
            .build_folder(id)
            .ok_or_else(|| MemoryState::not_found("POST", endpoints::FOLDERS))
    }

    async fn update_folder(&self, id: FolderId, folder: &NewFolder) -> Result<Folder> {
        let path = endpoints::folder(id);
        let mut state = self.begin("PUT", &path)?;
        if !state.folders.contains_key(&id) {
            return Err(MemoryState::not_found("PUT", &path));
        }
        state.write_folder(id, folder);
        state
            .build_folder(id)
            .ok_or_else(|| MemoryState::not_found("PUT", &path))
    }

    async fn move_folder(&self, id: FolderId, new_parent: FolderId) -> Result<Folder> {
        let path = endpoints::move_folder(id, new_parent);
        let mut state = self.begin("POST", &path)?;
        if !state.folders.contains_key(&new_parent) {
            return Err(MemoryState::not_found("POST", &path));
        }
        let row = state
            .folders
            .get_mut(&id)
            .ok_or_else(|| MemoryState::not_found("POST", &path))?;
        row.parent_id = Some(new_parent);
        state
            .build_folder(id)
            .ok_or_else(|| MemoryState::not_found("POST", &path))
    }

    async fn delete_folder(&self, id: FolderId, move_to_parent: bool) -> Result<()> {
        let path = endpoints::delete_folder(id, move_to_parent);
        let mut state = self.begin("DELETE", &path)?;
        let row = state
            .folders
            .remove(&id)
            .ok_or_else(|| MemoryState::not_found("DELETE", &path))?;

        let new_parent = if move_to_parent { row.parent_id } else { None };
        for child in state.folders.values_mut() {
            if child.parent_id == Some(id) {
                child.parent_id = new_parent;
            }
        }
        for favorite in state.favorites.values_mut() {
            if favorite.folder_id == Some(id) {
                favorite.folder_id = new_parent;
            }
        }
        Ok(())
    }

    async fn list_favorites(&self) -> Result<Vec<Favorite>> {
        let state = self.begin("GET", endpoints::FAVORITES)?;
        Ok(state.favorites.values().cloned().collect())
    }

    async fn list_folder_favorites(&self, id: FolderId, include_children: bool) -> Result<Vec<Favorite>> {
        let path = endpoints::folder_favorites(id, include_children);
        let state = self.begin("GET", &path)?;
        if !state.folders.contains_key(&id) {
            return Err(MemoryState::not_found("GET", &path));
        }
        let scope = if include_children {
            state.subtree_ids(id)
        } else {
            vec![id]
        };
        Ok(state
            .favorites
            .values()
            .filter(|f| f.folder_id.is_some_and(|folder| scope.contains(&folder)))
            .cloned()
            .collect())
    }

    async fn create_favorite(&self, favorite: &NewFavorite) -> Result<TaskAck> {
        let mut state = self.begin("POST", endpoints::CREATE_FAVORITE)?;
        let task_id = format!("task-{}", state.next_task_id);
        state.next_task_id += 1;
        state.tasks.push(Task::new(
            task_id.clone(),
            format!("Process favorite: {}", favorite.url),
            TaskStatus::Pending,
            0,
        ));
        state.pending.push((task_id.clone(), favorite.clone()));
        Ok(TaskAck { task_id })
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let state = self.begin("GET", endpoints::TASKS)?;
        Ok(state.tasks.clone())
    }

    async fn get_task(&self, id: &str) -> Result<Task> {
        let path = endpoints::task(id);
        let state = self.begin("GET", &path)?;
        state
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| MemoryState::not_found("GET", &path))
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let state = self.begin("GET", &endpoints::search(query))?;
        let needle = query.to_lowercase();
        Ok(state
            .favorites
            .values()
            .filter(|f| {
                [f.title.as_deref(), f.summary.as_deref(), Some(f.url.as_str())]
                    .into_iter()
                    .flatten()
                    .any(|text| text.to_lowercase().contains(&needle))
            })
            .map(|f| SearchHit {
                id: Some(f.id),
                url: f.url.clone(),
                title: f.title.clone(),
                summary: f.summary.clone(),
                distance: Some(0.0),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_folder_list_matches_server_shape() {
        let backend = InMemoryBackend::new();
        let root = backend.root_id();
        let work = backend.add_folder("Work", Some(root));
        backend.add_folder("Clients", Some(work));

        let folders = backend.list_folders().await.unwrap();
        // Every folder is listed at the top level
        assert_eq!(folders.len(), 3);
        assert_eq!(folders[0].id, root);
        assert_eq!(folders[0].children.len(), 1);
        assert_eq!(folders[0].children[0].children.len(), 1);
    }

    #[tokio::test]
    async fn test_subtree_favorites() {
        let backend = InMemoryBackend::new();
        let root = backend.root_id();
        let work = backend.add_folder("Work", Some(root));
        let clients = backend.add_folder("Clients", Some(work));
        let personal = backend.add_folder("Personal", Some(root));
        backend.add_favorite(Favorite::new(0, "https://a.example", Some(work)));
        backend.add_favorite(Favorite::new(0, "https://b.example", Some(clients)));
        backend.add_favorite(Favorite::new(0, "https://c.example", Some(personal)));

        let direct = backend.list_folder_favorites(work, false).await.unwrap();
        assert_eq!(direct.len(), 1);
        let subtree = backend.list_folder_favorites(work, true).await.unwrap();
        assert_eq!(subtree.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_moves_children_to_parent() {
        let backend = InMemoryBackend::new();
        let root = backend.root_id();
        let work = backend.add_folder("Work", Some(root));
        let clients = backend.add_folder("Clients", Some(work));

        backend.delete_folder(work, true).await.unwrap();
        assert!(!backend.has_folder(work));
        assert_eq!(backend.folder_parent(clients), Some(Some(root)));
    }

    #[tokio::test]
    async fn test_created_favorite_waits_for_task() {
        let backend = InMemoryBackend::new();
        let mut new_favorite = NewFavorite::new("https://example.com");
        new_favorite.tags = vec!["docs".to_string()];
        let ack = backend.create_favorite(&new_favorite).await.unwrap();

        assert!(backend.list_favorites().await.unwrap().is_empty());
        let tasks = backend.list_tasks().await.unwrap();
        assert_eq!(tasks[0].status, TaskStatus::Pending);

        backend.complete_task(&ack.task_id).unwrap();
        let favorites = backend.list_favorites().await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].tags[0].name, "docs");
        let task = backend.get_task(&ack.task_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let backend = InMemoryBackend::new();
        backend.set_offline(true);
        assert!(matches!(backend.list_tasks().await, Err(Error::Network { .. })));

        backend.set_offline(false);
        backend.fail_with_status(Some(500));
        assert_eq!(backend.list_tasks().await.unwrap_err().status(), Some(500));
        assert_eq!(backend.request_count("GET /api/favorites/tasks"), 2);
    }
}
