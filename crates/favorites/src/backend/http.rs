//! Favorites server HTTP client
//!
//! Uses synchronous HTTP (ureq) on tokio's blocking pool so the async stores
//! never stall the runtime.

use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{Backend, endpoints};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{Favorite, Folder, FolderId, NewFavorite, NewFolder, SearchHit, Task, TaskAck};

/// REST client for the favorites server
#[derive(Clone)]
pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpBackend {
    /// Create a client for `base_url` (e.g. `http://localhost:8000`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { agent, base_url }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.api_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T>(&self, path: String) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = self.url(&path);
        let endpoint = endpoints::label("GET", &path);
        run_blocking(endpoint.clone(), move || {
            debug!("{}", endpoint);
            let mut response = agent.get(&url).call().map_err(|e| map_error(&endpoint, e))?;
            response
                .body_mut()
                .read_json::<T>()
                .map_err(|e| map_error(&endpoint, e))
        })
        .await
    }

    async fn send_json<B, T>(&self, method: &'static str, path: String, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = self.url(&path);
        let endpoint = endpoints::label(method, &path);
        let body = serde_json::to_value(body).map_err(|e| Error::Decode {
            endpoint: endpoint.clone(),
            message: format!("Failed to encode request body: {}", e),
        })?;
        run_blocking(endpoint.clone(), move || {
            debug!("{}", endpoint);
            let result = match method {
                "PUT" => agent.put(&url).send_json(&body),
                _ => agent.post(&url).send_json(&body),
            };
            let mut response = result.map_err(|e| map_error(&endpoint, e))?;
            response
                .body_mut()
                .read_json::<T>()
                .map_err(|e| map_error(&endpoint, e))
        })
        .await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_folders(&self) -> Result<Vec<Folder>> {
        self.get_json(endpoints::FOLDERS.to_string()).await
    }

    async fn get_folder(&self, id: FolderId) -> Result<Folder> {
        self.get_json(endpoints::folder(id)).await
    }

    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder> {
        self.send_json("POST", endpoints::FOLDERS.to_string(), folder).await
    }

    async fn update_folder(&self, id: FolderId, folder: &NewFolder) -> Result<Folder> {
        self.send_json("PUT", endpoints::folder(id), folder).await
    }

    async fn move_folder(&self, id: FolderId, new_parent: FolderId) -> Result<Folder> {
        let agent = self.agent.clone();
        let path = endpoints::move_folder(id, new_parent);
        let url = self.url(&path);
        let endpoint = endpoints::label("POST", &path);
        run_blocking(endpoint.clone(), move || {
            debug!("{}", endpoint);
            let mut response = agent
                .post(&url)
                .send_empty()
                .map_err(|e| map_error(&endpoint, e))?;
            response
                .body_mut()
                .read_json::<Folder>()
                .map_err(|e| map_error(&endpoint, e))
        })
        .await
    }

    async fn delete_folder(&self, id: FolderId, move_to_parent: bool) -> Result<()> {
        let agent = self.agent.clone();
        let path = endpoints::delete_folder(id, move_to_parent);
        let url = self.url(&path);
        let endpoint = endpoints::label("DELETE", &path);
        run_blocking(endpoint.clone(), move || {
            debug!("{}", endpoint);
            // The server echoes the deleted folder; nothing in it is needed
            agent
                .delete(&url)
                .call()
                .map_err(|e| map_error(&endpoint, e))?;
            Ok(())
        })
        .await
    }

    async fn list_favorites(&self) -> Result<Vec<Favorite>> {
        self.get_json(endpoints::FAVORITES.to_string()).await
    }

    async fn list_folder_favorites(&self, id: FolderId, include_children: bool) -> Result<Vec<Favorite>> {
        self.get_json(endpoints::folder_favorites(id, include_children)).await
    }

    async fn create_favorite(&self, favorite: &NewFavorite) -> Result<TaskAck> {
        self.send_json("POST", endpoints::CREATE_FAVORITE.to_string(), favorite).await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.get_json(endpoints::TASKS.to_string()).await
    }

    async fn get_task(&self, id: &str) -> Result<Task> {
        self.get_json(endpoints::task(id)).await
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.get_json(endpoints::search(query)).await
    }
}

/// Run a blocking request on tokio's blocking pool
async fn run_blocking<T, F>(endpoint: String, request: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(request)
        .await
        .map_err(|e| Error::Network {
            endpoint,
            message: format!("Request task failed: {}", e),
        })?
}

/// Map a ureq error onto the client taxonomy
fn map_error(endpoint: &str, err: ureq::Error) -> Error {
    match err {
        ureq::Error::StatusCode(status) => Error::Fetch {
            status,
            endpoint: endpoint.to_string(),
        },
        ureq::Error::Json(e) => Error::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        },
        other => Error::Network {
            endpoint: endpoint.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:8000/", Duration::from_secs(1));
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(backend.url(endpoints::FOLDERS), "http://localhost:8000/api/folders/");
    }

    #[test]
    fn test_status_maps_to_fetch_error() {
        let err = map_error("GET /api/favorites", ureq::Error::StatusCode(503));
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("GET /api/favorites"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Port 9 (discard) is closed on test machines
        let backend = HttpBackend::new("http://127.0.0.1:9", Duration::from_secs(2));
        let err = backend.list_tasks().await.unwrap_err();
        assert!(matches!(err, Error::Network { .. }), "unexpected error: {:?}", err);
    }
}
