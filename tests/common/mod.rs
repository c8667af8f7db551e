//! Shared test fixtures: an in-memory file service and a demo file tree.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use syncpad::api::{FileBody, FileId, FileRef, Project, SaveRequest};
use syncpad::config::Config;
use syncpad::error::SyncError;
use syncpad::loader::FileService;
use syncpad::SyncSession;

/// In-memory [`FileService`] that records every round trip.
pub struct StubService {
    pub tree: Vec<Project>,
    pub bodies: Mutex<HashMap<FileId, String>>,
    pub tree_fetches: AtomicUsize,
    pub body_fetches: Mutex<HashMap<FileId, usize>>,
    pub saves: Mutex<Vec<SaveRequest>>,
    /// File id whose body fetch fails with HTTP 500.
    pub fail_body: Option<FileId>,
    /// When set, every save attempt fails with HTTP 500.
    pub fail_save: bool,
}

impl StubService {
    pub fn new(tree: Vec<Project>, bodies: &[(FileId, &str)]) -> Self {
        StubService {
            tree,
            bodies: Mutex::new(bodies.iter().map(|(id, c)| (*id, c.to_string())).collect()),
            tree_fetches: AtomicUsize::new(0),
            body_fetches: Mutex::new(HashMap::new()),
            saves: Mutex::new(Vec::new()),
            fail_body: None,
            fail_save: false,
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
        if self.fail_save {
            return Err(SyncError::Http {
                status: 500,
                url: "stub:/api/file/save".to_string(),
            });
        }
        if let Ok(mut saves) = self.saves.lock() {
            saves.push(request.clone());
        }
        Ok(())
    }
}

/// One project with an HTML file (42) and a stylesheet (43), plus a second
/// project holding only a markdown file (50).
pub fn demo_tree() -> Vec<Project> {
    vec![
        Project {
            id: 1,
            name: "Demo Project".to_string(),
            files: vec![
                FileRef { id: 42, name: "index.html".to_string() },
                FileRef { id: 43, name: "style.css".to_string() },
            ],
            loaded: false,
        },
        Project {
            id: 2,
            name: "Notes".to_string(),
            files: vec![FileRef { id: 50, name: "todo.md".to_string() }],
            loaded: false,
        },
    ]
}

pub fn demo_service() -> StubService {
    StubService::new(
        demo_tree(),
        &[
            (42, "<h1>Hello, World!</h1>"),
            (43, "h1 {\n  color: steelblue;\n}"),
            (50, "# todo"),
        ],
    )
}

/// A session over the demo service with the tree already fetched.
pub async fn demo_session() -> SyncSession<StubService> {
    let session = SyncSession::with_service(Config::default(), demo_service());
    session.refresh_projects().await.expect("refresh");
    session
}
