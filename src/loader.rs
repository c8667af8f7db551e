//! Project discovery and lazy bulk loading over the file HTTP service.
//!
//! The first time any file in a project is opened, every member body is
//! pulled into the content cache in one pass; afterwards the project's
//! `loaded` flag short-circuits the whole operation. A failed fetch aborts
//! the pass and leaves the flag unset so a later attempt can retry, without
//! discarding bodies that already made it into the cache.

use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, warn};

use crate::api::{FileBody, FileId, FileRef, Project, SaveRequest};
use crate::cache::ContentCache;
use crate::config::Config;
use crate::error::SyncError;

/// Per-request read timeout for the HTTP service.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport seam for the file/project service.
///
/// Production traffic goes through [`HttpFileService`]; tests substitute an
/// in-memory implementation to observe round-trip counts.
#[allow(async_fn_in_trait)]
pub trait FileService {
    async fn fetch_tree(&self, room_id: &str) -> Result<Vec<Project>, SyncError>;
    async fn fetch_body(&self, file_id: FileId) -> Result<FileBody, SyncError>;
    async fn save(&self, request: &SaveRequest) -> Result<(), SyncError>;
}

// -- HTTP implementation ----------------------------------------------------

/// [`FileService`] backed by the configured HTTP origin.
pub struct HttpFileService {
    client: reqwest::Client,
    config: Config,
}

impl HttpFileService {
    pub fn new(config: Config) -> Self {
        HttpFileService {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, SyncError> {
        let resp = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| SyncError::Connect {
                url: url.clone(),
                detail: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(SyncError::Http {
                status: resp.status().as_u16(),
                url,
            });
        }

        resp.json::<T>().await.map_err(|e| SyncError::Json {
            url,
            detail: e.to_string(),
        })
    }
}

impl FileService for HttpFileService {
    async fn fetch_tree(&self, room_id: &str) -> Result<Vec<Project>, SyncError> {
        let url = format!("{}/api/file-tree/{}", self.config.base_url, room_id);
        self.get_json(url).await
    }

    async fn fetch_body(&self, file_id: FileId) -> Result<FileBody, SyncError> {
        self.get_json(self.config.file_url(file_id)).await
    }

    async fn save(&self, request: &SaveRequest) -> Result<(), SyncError> {
        let url = self.config.save_url();
        let resp = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| SyncError::Connect {
                url: url.clone(),
                detail: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(SyncError::Http {
                status: resp.status().as_u16(),
                url,
            });
        }
        Ok(())
    }
}

// -- Loader -----------------------------------------------------------------

/// Fetches the room's file tree and lazily bulk-loads project bodies into
/// the shared content cache.
pub struct ProjectLoader<S> {
    service: S,
    cache: ContentCache,
    room_id: String,
    projects: Mutex<Vec<Project>>,
    /// Serializes bulk loads so concurrent calls cannot double-fetch.
    load_lock: tokio::sync::Mutex<()>,
}

impl<S: FileService> ProjectLoader<S> {
    pub fn new(service: S, cache: ContentCache, room_id: impl Into<String>) -> Self {
        ProjectLoader {
            service,
            cache,
            room_id: room_id.into(),
            projects: Mutex::new(Vec::new()),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Fetch the room's file tree in one round trip. Bodies are not fetched;
    /// each project's `loaded` flag is recomputed from what the cache holds.
    pub async fn refresh(&self) -> Result<Vec<Project>, SyncError> {
        let mut tree = self.service.fetch_tree(&self.room_id).await?;
        for project in &mut tree {
            project.loaded = project.files.iter().all(|f| self.cache.contains(f.id));
        }
        if let Ok(mut guard) = self.projects.lock() {
            *guard = tree.clone();
        }
        debug!(room = %self.room_id, projects = tree.len(), "file tree refreshed");
        Ok(tree)
    }

    /// The underlying file service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Snapshot of the last refreshed tree.
    pub fn projects(&self) -> Vec<Project> {
        self.projects.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// The project owning a file, if any.
    pub fn project_of(&self, file_id: FileId) -> Option<Project> {
        let guard = self.projects.lock().ok()?;
        guard.iter().find(|p| p.contains(file_id)).cloned()
    }

    /// Look a file up by name across all projects.
    pub fn find_file(&self, name: &str) -> Option<FileRef> {
        let guard = self.projects.lock().ok()?;
        guard
            .iter()
            .flat_map(|p| p.files.iter())
            .find(|f| f.name == name)
            .cloned()
    }

    pub fn is_loaded(&self, project_id: i64) -> bool {
        self.projects
            .lock()
            .map(|g| g.iter().any(|p| p.id == project_id && p.loaded))
            .unwrap_or(false)
    }

    /// Make every member body of a project present in the cache.
    ///
    /// No-op once the project's `loaded` flag is set. Safe to call
    /// concurrently: calls serialize on an internal lock, and files whose
    /// bodies already reached the cache are never fetched again. The first
    /// failed fetch aborts the pass with the flag still unset.
    pub async fn ensure_loaded(&self, project_id: i64) -> Result<(), SyncError> {
        let _load = self.load_lock.lock().await;

        let members = {
            let guard = self
                .projects
                .lock()
                .map_err(|_| SyncError::Unknown { kind: "project", id: project_id })?;
            let project = guard
                .iter()
                .find(|p| p.id == project_id)
                .ok_or(SyncError::Unknown { kind: "project", id: project_id })?;
            if project.loaded {
                return Ok(());
            }
            project.files.clone()
        };

        let op = self.cache.begin_op();
        for file in &members {
            if self.cache.contains(file.id) {
                continue;
            }
            let body = self.service.fetch_body(file.id).await.map_err(|e| {
                warn!(file = file.id, error = %e, "project load aborted");
                e
            })?;
            if !self.cache.complete_fetch(file.id, &body.content, op) {
                debug!(file = file.id, "fetch result outranked by a newer write, dropped");
            }
        }

        if let Ok(mut guard) = self.projects.lock() {
            if let Some(project) = guard.iter_mut().find(|p| p.id == project_id) {
                project.loaded = true;
            }
        }
        debug!(project = project_id, files = members.len(), "project bodies cached");
        Ok(())
    }

    /// Persist a file's cached content through the HTTP service.
    ///
    /// Independent of the live channel; a failure is reported to the caller
    /// and does not roll the cache back.
    pub async fn save_file(&self, file_id: FileId) -> Result<(), SyncError> {
        let content = self.cache.get(file_id).ok_or(SyncError::NotCached(file_id))?;
        self.service.save(&SaveRequest { id: file_id, content }).await
    }
}

// -- Test support -----------------------------------------------------------

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory [`FileService`] that records every round trip.
    pub struct StubService {
        pub tree: Vec<Project>,
        pub bodies: Mutex<HashMap<FileId, String>>,
        pub tree_fetches: AtomicUsize,
        pub body_fetches: Mutex<HashMap<FileId, usize>>,
        pub saves: Mutex<Vec<SaveRequest>>,
        /// File id whose body fetch fails with HTTP 500.
        pub fail_body: Option<FileId>,
    }

    impl StubService {
        pub fn new(tree: Vec<Project>, bodies: &[(FileId, &str)]) -> Self {
            StubService {
                tree,
                bodies: Mutex::new(
                    bodies.iter().map(|(id, c)| (*id, c.to_string())).collect(),
                ),
                tree_fetches: AtomicUsize::new(0),
                body_fetches: Mutex::new(HashMap::new()),
                saves: Mutex::new(Vec::new()),
                fail_body: None,
            }
        }

        pub fn fetches_for(&self, file_id: FileId) -> usize {
            self.body_fetches
                .lock()
                .map(|g| g.get(&file_id).copied().unwrap_or(0))
                .unwrap_or(0)
        }
    }

    impl FileService for StubService {
        async fn fetch_tree(&self, _room_id: &str) -> Result<Vec<Project>, SyncError> {
            self.tree_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.tree.clone())
        }

        async fn fetch_body(&self, file_id: FileId) -> Result<FileBody, SyncError> {
            if let Ok(mut counts) = self.body_fetches.lock() {
                *counts.entry(file_id).or_insert(0) += 1;
            }
            // Yield so interleaved callers genuinely race.
            tokio::task::yield_now().await;
            if self.fail_body == Some(file_id) {
                return Err(SyncError::Http {
                    status: 500,
                    url: format!("stub:/api/file/{}", file_id),
                });
            }
            let content = self
                .bodies
                .lock()
                .ok()
                .and_then(|g| g.get(&file_id).cloned())
                .ok_or(SyncError::Http {
                    status: 404,
                    url: format!("stub:/api/file/{}", file_id),
                })?;
            Ok(FileBody {
                name: format!("file-{}", file_id),
                content,
            })
        }

        async fn save(&self, request: &SaveRequest) -> Result<(), SyncError> {
            if let Ok(mut saves) = self.saves.lock() {
                saves.push(request.clone());
            }
            Ok(())
        }
    }

    pub fn demo_tree() -> Vec<Project> {
        vec![Project {
            id: 1,
            name: "Demo Project".to_string(),
            files: vec![
                FileRef { id: 1, name: "index.html".to_string() },
                FileRef { id: 2, name: "style.css".to_string() },
            ],
            loaded: false,
        }]
    }
}
