//! Markdown page model and rendering.
//!
//! A page moves through three shapes:
//!
//! ```text
//! SourceDocument ──► (PageMetadata, toc) ──► RenderedPage
//!   path + text        meta::extract          output path + html
//! ```
//!
//! Everything in this module is pure apart from [`RenderedPage::write`].

mod error;
mod links;
mod meta;
mod path;
mod render;
mod template;

pub use error::PageError;
pub use path::is_markdown;
pub use render::render;
pub use template::Templates;

use pulldown_cmark::Options;
use std::{io, path::PathBuf};
use tokio::fs;

/// A markdown file as read from the content root.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path relative to the content root, e.g. `guides/intro.md`
    pub path: PathBuf,
    /// Raw markdown text
    pub content: String,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Final HTML for one source document.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Absolute output path, e.g. `<output>/guides/intro.html`
    pub path: PathBuf,
    pub html: String,
}

impl RenderedPage {
    /// Write the page, creating intermediate directories.
    pub async fn write(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, self.html.as_bytes()).await
    }
}

/// Markdown extensions shared by the metadata lexer and the HTML converter,
/// so both agree on block boundaries.
pub(crate) fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}
