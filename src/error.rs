use crate::api::FileId;
use thiserror::Error;

/// Errors produced at the engine's service boundaries.
///
/// Each variant carries enough context to diagnose the failure without
/// needing to inspect the originating error directly. Failures are contained
/// where they are detected: a load failure leaves the project reloadable, a
/// save failure leaves the cache untouched.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A TCP-level connection to the file service could not be established.
    #[error("connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },

    /// The file service replied with a non-2xx HTTP status code.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// A response body could not be parsed as the expected JSON structure.
    #[error("JSON parse error from {url}: {detail}")]
    Json { url: String, detail: String },

    /// A configuration file could not be read or parsed.
    #[error("config error in {path}: {detail}")]
    Config { path: String, detail: String },

    /// A project or file id was not present in the loaded file tree.
    #[error("unknown {kind} {id}")]
    Unknown { kind: &'static str, id: i64 },

    /// A file's body has not been pulled into the cache yet.
    #[error("no cached content for file {0}")]
    NotCached(FileId),

    /// The session has no active file for the requested operation.
    #[error("no active file")]
    NoActiveFile,
}
