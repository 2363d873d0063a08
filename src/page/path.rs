//! Content path to output path mapping.

use super::PageError;
use std::path::{Path, PathBuf};

/// Extension of markdown sources.
pub const SOURCE_EXTENSION: &str = "md";
/// Extension of rendered pages.
pub const OUTPUT_EXTENSION: &str = "html";

/// Check if a path is a markdown source.
pub fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION)
}

/// Map a source path, relative to the content root, to its page under `output_root`.
///
/// `guides/intro.md` → `build/guides/intro.html`
pub fn output_path(relative: &Path, output_root: &Path) -> Result<PathBuf, PageError> {
    if !is_markdown(relative) {
        return Err(PageError::NotMarkdown(relative.to_path_buf()));
    }
    Ok(output_root.join(relative.with_extension(OUTPUT_EXTENSION)))
}
