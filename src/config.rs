//! Client configuration: service origins, room, preview policy.

use serde::{Deserialize, Serialize};

use crate::api::FileId;
use crate::error::SyncError;
use crate::preview::PreviewMode;

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_room_id() -> String {
    "public_room".to_string()
}

/// Session configuration, loadable from a TOML file. Every field has a
/// default so a missing or partial file still yields a working client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP origin of the file/project service. The channel origin is
    /// derived from it: `wss` iff the base scheme is `https`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Partition key for the file tree.
    #[serde(default = "default_room_id")]
    pub room_id: String,

    #[serde(default)]
    pub preview_mode: PreviewMode,

    /// Display identity announced on the channel. Generated per session
    /// when absent; collisions are a display concern only.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: default_base_url(),
            room_id: default_room_id(),
            preview_mode: PreviewMode::default(),
            display_name: None,
        }
    }
}

impl Config {
    /// Parse a TOML configuration file.
    pub fn load(path: &std::path::Path) -> Result<Config, SyncError> {
        let text = std::fs::read_to_string(path).map_err(|e| SyncError::Config {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| SyncError::Config {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }

    pub fn file_tree_url(&self) -> String {
        format!("{}/api/file-tree/{}", self.base_url, self.room_id)
    }

    pub fn file_url(&self, file_id: FileId) -> String {
        format!("{}/api/file/{}", self.base_url, file_id)
    }

    pub fn save_url(&self) -> String {
        format!("{}/api/file/save", self.base_url)
    }

    /// Channel address for a file: `{ws|wss}://{host}/ws/{fileId}/{name}`.
    /// The scheme mirrors the HTTP scheme of `base_url`.
    pub fn channel_url(&self, file_id: FileId, display_name: &str) -> String {
        let origin = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            format!("ws://{}", self.base_url)
        };
        format!("{}/ws/{}/{}", origin, file_id, display_name)
    }
}
