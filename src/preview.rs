//! Preview composition: derive a renderable HTML document from the cache.
//!
//! `render` is a pure function of the cache contents and the active file's
//! project membership — calling it twice with unchanged state returns
//! identical output, so callers may recompose on every cache mutation.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::api::{EditorMode, FileId, Project};
use crate::cache::ContentCache;

/// How the canonical HTML document for the preview is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PreviewMode {
    /// The active file itself is the document, if its extension maps to HTML.
    ActiveFileOnly,
    /// The first HTML-typed file in the active file's project is the document.
    #[default]
    ProjectHtmlPlusCss,
}

/// Fixed document returned when no HTML body is resolvable.
pub const PLACEHOLDER_PREVIEW: &str = "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>syncpad</title>\n</head>\n<body>\n<p>No preview available: the current project has no renderable HTML document.</p>\n</body>\n</html>\n";

/// Compose the preview document for the active file.
///
/// The active file's project supplies both the canonical HTML body (per
/// `mode`) and the stylesheet set: every CSS-typed member's cached content,
/// inlined in project file order. Members whose bodies have not reached the
/// cache yet simply contribute nothing.
pub fn render(
    cache: &ContentCache,
    projects: &[Project],
    active: FileId,
    mode: PreviewMode,
) -> String {
    let Some(project) = projects.iter().find(|p| p.contains(active)) else {
        return PLACEHOLDER_PREVIEW.to_string();
    };

    let html_body = match mode {
        PreviewMode::ActiveFileOnly => project
            .files
            .iter()
            .find(|f| f.id == active)
            .filter(|f| f.mode() == EditorMode::Html)
            .and_then(|f| cache.get(f.id)),
        PreviewMode::ProjectHtmlPlusCss => project
            .files
            .iter()
            .find(|f| f.mode() == EditorMode::Html)
            .and_then(|f| cache.get(f.id)),
    };

    let Some(html_body) = html_body else {
        return PLACEHOLDER_PREVIEW.to_string();
    };

    let css: Vec<String> = project
        .files
        .iter()
        .filter(|f| f.mode() == EditorMode::Css)
        .filter_map(|f| cache.get(f.id))
        .collect();

    let mut doc = String::new();
    doc.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    if !css.is_empty() {
        doc.push_str("<style>\n");
        doc.push_str(&css.join("\n"));
        doc.push_str("\n</style>\n");
    }
    doc.push_str("</head>\n<body>\n");
    doc.push_str(&html_body);
    doc.push_str("\n</body>\n</html>\n");
    doc
}
