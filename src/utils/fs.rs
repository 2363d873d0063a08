//! Filesystem helpers shared by the crawl and the asset copy.

use anyhow::{Context, Result};
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// File names never copied or rendered.
const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

pub fn is_ignored(name: &OsStr) -> bool {
    name.to_str().is_some_and(|name| IGNORED_FILES.contains(&name))
}

/// Collect all files from a directory recursively.
pub fn collect_all_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| !is_ignored(e.file_name()))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Copy `path` from under `src_root` to the same relative place under `dst_root`.
///
/// Returns the destination path.
pub fn copy_mirrored(path: &Path, src_root: &Path, dst_root: &Path) -> Result<PathBuf> {
    let relative = path
        .strip_prefix(src_root)
        .with_context(|| format!("`{}` is outside `{}`", path.display(), src_root.display()))?;
    let dest = dst_root.join(relative);

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create `{}`", parent.display()))?;
    }
    fs::copy(path, &dest).with_context(|| format!("Failed to copy to `{}`", dest.display()))?;

    Ok(dest)
}
