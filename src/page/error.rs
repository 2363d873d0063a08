//! Page rendering error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a single page from being emitted.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("template `{0}` not found")]
    TemplateNotFound(String),

    #[error("failed to render template `{name}`")]
    Render {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error("failed to load templates from `{}`", .0.display())]
    Load(PathBuf, #[source] tera::Error),

    #[error("`{}` is not a markdown file", .0.display())]
    NotMarkdown(PathBuf),
}
