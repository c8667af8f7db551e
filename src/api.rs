use serde::{Deserialize, Serialize};

/// Unique, stable identifier of a file within the backing service.
pub type FileId = i64;

// -- File-tree types --------------------------------------------------------

/// One file entry in a project tree.
///
/// The name carries the extension that decides both the editor mode and the
/// file's role during preview composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: FileId,
    pub name: String,
}

impl FileRef {
    /// Editor mode implied by the file name's extension.
    pub fn mode(&self) -> EditorMode {
        EditorMode::from_file_name(&self.name)
    }
}

/// A project as returned by `GET /api/file-tree/{room}`.
///
/// Immutable once fetched; `loaded` tracks whether every member body has been
/// pulled into the content cache, and is never part of the wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub files: Vec<FileRef>,
    #[serde(skip)]
    pub loaded: bool,
}

impl Project {
    /// Whether this project contains the given file.
    pub fn contains(&self, file_id: FileId) -> bool {
        self.files.iter().any(|f| f.id == file_id)
    }
}

// -- File-body types --------------------------------------------------------

/// Response of `GET /api/file/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBody {
    pub name: String,
    pub content: String,
}

/// Request body of `POST /api/file/save`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRequest {
    pub id: FileId,
    pub content: String,
}

// -- Editor modes -----------------------------------------------------------

/// Editing mode the embedding widget should be switched to for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Html,
    Css,
    Code,
    Json,
    Markdown,
    Plaintext,
}

impl EditorMode {
    /// Map a file name's extension to its editor mode. Names without an
    /// extension fall back to plaintext.
    pub fn from_file_name(name: &str) -> Self {
        let ext = match name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return EditorMode::Plaintext,
        };
        match ext.as_str() {
            "html" => EditorMode::Html,
            "css" => EditorMode::Css,
            "js" => EditorMode::Code,
            "json" => EditorMode::Json,
            "md" => EditorMode::Markdown,
            _ => EditorMode::Plaintext,
        }
    }
}

impl std::fmt::Display for EditorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EditorMode::Html => "html",
            EditorMode::Css => "css",
            EditorMode::Code => "code",
            EditorMode::Json => "json",
            EditorMode::Markdown => "markdown",
            EditorMode::Plaintext => "plaintext",
        };
        write!(f, "{}", name)
    }
}
