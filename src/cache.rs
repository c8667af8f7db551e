//! In-memory content cache: the authoritative per-file text store.
//!
//! ## Design
//! - One entry per file id; entries are created on first fetch or first
//!   remote update and never deleted for the lifetime of the session.
//! - Every write is stamped with a monotonic version counter. Fetches that
//!   were started before a newer write completed lose the race and are
//!   dropped, so a stale HTTP completion can never clobber a live edit.
//! - The handle is clonable and shared between the loader (fetch results)
//!   and the session (local and remote edits); nothing else writes it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::api::FileId;

#[derive(Debug, Clone)]
struct Entry {
    content: String,
    version: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<FileId, Entry>,
    next_version: u64,
}

impl Inner {
    fn stamp(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }
}

/// Clonable handle to the session's shared content cache.
#[derive(Debug, Clone, Default)]
pub struct ContentCache {
    inner: Arc<Mutex<Inner>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-known content for a file, if any body has reached the cache.
    pub fn get(&self, file_id: FileId) -> Option<String> {
        let guard = self.inner.lock().ok()?;
        guard.entries.get(&file_id).map(|e| e.content.clone())
    }

    /// Whether a body is present for the file.
    pub fn contains(&self, file_id: FileId) -> bool {
        self.inner
            .lock()
            .map(|g| g.entries.contains_key(&file_id))
            .unwrap_or(false)
    }

    /// Version stamp of the file's current entry.
    pub fn version(&self, file_id: FileId) -> Option<u64> {
        let guard = self.inner.lock().ok()?;
        guard.entries.get(&file_id).map(|e| e.version)
    }

    /// Store an edit (local or remote) under a fresh version stamp.
    pub fn write(&self, file_id: FileId, content: &str) {
        if let Ok(mut guard) = self.inner.lock() {
            let version = guard.stamp();
            guard.entries.insert(
                file_id,
                Entry { content: content.to_string(), version },
            );
        }
    }

    /// Reserve a version stamp for an operation about to start.
    ///
    /// Pass the stamp to [`complete_fetch`](Self::complete_fetch) when the
    /// operation's result arrives; anything written in between outranks it.
    pub fn begin_op(&self) -> u64 {
        match self.inner.lock() {
            Ok(mut guard) => guard.stamp(),
            Err(_) => 0,
        }
    }

    /// Store a fetched body, unless the entry was overwritten by a newer
    /// operation while the fetch was in flight. Returns whether the body
    /// was stored.
    pub fn complete_fetch(&self, file_id: FileId, content: &str, op_stamp: u64) -> bool {
        let Ok(mut guard) = self.inner.lock() else {
            return false;
        };
        if let Some(existing) = guard.entries.get(&file_id) {
            if existing.version > op_stamp {
                return false;
            }
        }
        guard.entries.insert(
            file_id,
            Entry { content: content.to_string(), version: op_stamp },
        );
        true
    }

    /// Number of files with a cached body.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|g| g.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
