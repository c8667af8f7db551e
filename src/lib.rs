//! Realtime synchronization engine for collaborative code editing.
//!
//! ## Design
//! - [`SyncSession`] is the single owned context tying the pieces together:
//!   the editing widget, the shared content cache, the project loader, the
//!   live channel, and preview composition.
//! - Every content mutation carries an explicit origin. Genuine user input
//!   is written to the cache and broadcast; mutations applied by the sync
//!   layer itself fire the same widget notification but are recognized as
//!   echoes and go nowhere.
//! - Conflict policy is last-writer-wins: the most recently applied full
//!   body replaces any prior state, with no merge.

pub mod api;
pub mod cache;
pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod preview;

use tokio::sync::mpsc;
use tracing::debug;

use api::{EditorMode, FileId, Project};
use cache::ContentCache;
use channel::{ChannelManager, RemoteUpdate};
use config::Config;
use error::SyncError;
use loader::{FileService, HttpFileService, ProjectLoader};

// ---------------------------------------------------------------------------
// Edit origin
// ---------------------------------------------------------------------------

/// Where a content mutation originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOrigin {
    /// A genuine keystroke in the editing widget.
    Local,
    /// Written by the sync layer: a remote body, or a programmatic load.
    Remote,
}

// ---------------------------------------------------------------------------
// Editing widget seam
// ---------------------------------------------------------------------------

/// The embeddable text-editing widget, reduced to the operations the sync
/// layer needs: read/replace the document and save/restore the caret.
pub trait EditorWidget: Send {
    fn content(&self) -> String;
    fn set_content(&mut self, content: &str);
    fn cursor(&self) -> usize;
    fn set_cursor(&mut self, offset: usize);
}

/// In-memory widget used by the headless client and tests.
#[derive(Debug, Clone, Default)]
pub struct BufferWidget {
    content: String,
    cursor: usize,
}

impl BufferWidget {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EditorWidget for BufferWidget {
    fn content(&self) -> String {
        self.content.clone()
    }

    fn set_content(&mut self, content: &str) {
        self.content = content.to_string();
        self.cursor = self.cursor.min(self.content.len());
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.min(self.content.len());
    }
}

// ---------------------------------------------------------------------------
// SyncSession — the engine
// ---------------------------------------------------------------------------

/// One client's editing session.
///
/// Exactly one file is active at a time; its channel binding, the widget's
/// visible document and the cache entry move together. All entry points run
/// on the host's single event loop, so local edits and remote applications
/// are strictly serialized and the origin tag is never observed mid-flip.
pub struct SyncSession<S: FileService = HttpFileService> {
    loader: ProjectLoader<S>,
    cache: ContentCache,
    channel: ChannelManager,
    widget: Box<dyn EditorWidget>,
    config: Config,
    active_file: Option<FileId>,
    /// Set while the sync layer itself is mutating the widget.
    applying: Option<EditOrigin>,
    inbound_rx: mpsc::UnboundedReceiver<RemoteUpdate>,
    /// When set, every recomposed preview document is pushed here.
    pub preview_tx: Option<mpsc::UnboundedSender<String>>,
    pub edits_sent: usize,
    pub edits_applied: usize,
}

impl SyncSession<HttpFileService> {
    /// Session over the configured HTTP/WebSocket origins.
    pub fn new(config: Config) -> Self {
        let service = HttpFileService::new(config.clone());
        SyncSession::with_service(config, service)
    }
}

impl<S: FileService> SyncSession<S> {
    /// Session over an arbitrary file service implementation.
    pub fn with_service(config: Config, service: S) -> Self {
        let cache = ContentCache::new();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let mut channel = ChannelManager::new(inbound_tx);
        if let Some(name) = &config.display_name {
            channel = channel.with_identity(name.clone());
        }
        let loader = ProjectLoader::new(service, cache.clone(), config.room_id.clone());
        SyncSession {
            loader,
            cache,
            channel,
            widget: Box::new(BufferWidget::new()),
            config,
            active_file: None,
            applying: None,
            inbound_rx,
            preview_tx: None,
            edits_sent: 0,
            edits_applied: 0,
        }
    }

    pub fn with_widget(mut self, widget: Box<dyn EditorWidget>) -> Self {
        self.widget = widget;
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn loader(&self) -> &ProjectLoader<S> {
        &self.loader
    }

    pub fn channel(&self) -> &ChannelManager {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut ChannelManager {
        &mut self.channel
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn active_file(&self) -> Option<FileId> {
        self.active_file
    }

    pub fn widget_content(&self) -> String {
        self.widget.content()
    }

    /// Editor mode for the active file, from its name's extension.
    pub fn editor_mode(&self) -> EditorMode {
        self.active_file
            .and_then(|id| {
                self.loader
                    .project_of(id)
                    .and_then(|p| p.files.into_iter().find(|f| f.id == id))
            })
            .map(|f| f.mode())
            .unwrap_or(EditorMode::Plaintext)
    }

    // -----------------------------------------------------------------------
    // File lifecycle
    // -----------------------------------------------------------------------

    /// Fetch the room's file tree. One round trip, no bodies.
    pub async fn refresh_projects(&self) -> Result<Vec<Project>, SyncError> {
        self.loader.refresh().await
    }

    /// Open a file for editing: pull its project's bodies into the cache,
    /// show it in the widget, and bind the live channel to it.
    pub async fn open_file(&mut self, file_id: FileId) -> Result<(), SyncError> {
        self.prepare_file(file_id).await?;
        self.channel.bind(&self.config, file_id).await;
        self.emit_preview();
        Ok(())
    }

    /// Open a file with a transport-less channel binding.
    ///
    /// The returned receiver is the binding's outbound queue — what a real
    /// socket's writer task would drain. `None` means the file was already
    /// bound and no new channel was opened.
    pub async fn open_file_offline(
        &mut self,
        file_id: FileId,
    ) -> Result<Option<mpsc::UnboundedReceiver<String>>, SyncError> {
        self.prepare_file(file_id).await?;
        let outbound = self.channel.bind_offline(file_id);
        self.emit_preview();
        Ok(outbound)
    }

    async fn prepare_file(&mut self, file_id: FileId) -> Result<(), SyncError> {
        let project = self
            .loader
            .project_of(file_id)
            .ok_or(SyncError::Unknown { kind: "file", id: file_id })?;
        self.loader.ensure_loaded(project.id).await?;
        let content = self.cache.get(file_id).ok_or(SyncError::NotCached(file_id))?;
        self.active_file = Some(file_id);
        self.apply_programmatic(&content);
        Ok(())
    }

    /// Persist the active file's cached content through the HTTP service.
    pub async fn save_active(&self) -> Result<(), SyncError> {
        let file_id = self.active_file.ok_or(SyncError::NoActiveFile)?;
        self.loader.save_file(file_id).await
    }

    // -----------------------------------------------------------------------
    // Edit flow
    // -----------------------------------------------------------------------

    /// Widget change notification. The host calls this on every
    /// content-changed event, whether it came from a keystroke or from a
    /// programmatic write — the origin tag sorts out which is which.
    pub fn on_widget_change(&mut self) {
        if self.applying.is_some() {
            // Echo of our own write into the widget.
            return;
        }
        self.commit(EditOrigin::Local);
    }

    /// Replace the document as if the user had typed it.
    pub fn apply_local_edit(&mut self, content: &str) {
        self.widget.set_content(content);
        self.on_widget_change();
    }

    /// Apply a full body received from the channel.
    ///
    /// Bodies from a binding that is no longer current are discarded
    /// outright. A body identical to the widget's current content is
    /// skipped to avoid pointless cursor churn. Otherwise last writer wins:
    /// the body replaces widget and cache with the caret restored, and no
    /// reciprocal send is produced.
    pub fn handle_remote(&mut self, update: RemoteUpdate) {
        if !self.channel.is_current(update.generation) {
            debug!(generation = update.generation, "discarding body from a closed channel");
            return;
        }
        if self.active_file.is_none() {
            return;
        }
        if update.content == self.widget.content() {
            return;
        }
        self.apply_programmatic(&update.content);
        self.commit(EditOrigin::Remote);
    }

    /// Next inbound channel update, for the host's event loop.
    pub async fn next_remote(&mut self) -> Option<RemoteUpdate> {
        self.inbound_rx.recv().await
    }

    fn apply_programmatic(&mut self, content: &str) {
        self.applying = Some(EditOrigin::Remote);
        let cursor = self.widget.cursor();
        self.widget.set_content(content);
        self.widget.set_cursor(cursor);
        // The widget's synchronous change event for the write above.
        self.on_widget_change();
        self.applying = None;
    }

    /// Record the widget's current document under the given origin: into the
    /// cache always, out over the channel only for genuine local input.
    fn commit(&mut self, origin: EditOrigin) {
        let Some(file_id) = self.active_file else {
            return;
        };
        let content = self.widget.content();
        self.cache.write(file_id, &content);
        self.emit_preview();
        match origin {
            EditOrigin::Local => {
                self.channel.send(&content);
                self.edits_sent += 1;
            }
            EditOrigin::Remote => {
                self.edits_applied += 1;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Preview
    // -----------------------------------------------------------------------

    /// Compose the preview document for the current state.
    pub fn render_preview(&self) -> String {
        match self.active_file {
            Some(file_id) => preview::render(
                &self.cache,
                &self.loader.projects(),
                file_id,
                self.config.preview_mode,
            ),
            None => preview::PLACEHOLDER_PREVIEW.to_string(),
        }
    }

    fn emit_preview(&self) {
        if let Some(tx) = &self.preview_tx {
            let _ = tx.send(self.render_preview());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
