//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     └── root task
//!             ├── clean output (optional)
//!             ├── load templates
//!             ├── crawl(content) ──┬── crawl(subdir) ── ...
//!             │                    ├── render(page.md) ──► write
//!             │                    └── copy(image.png)
//!             ├── compile_styles()   (blocking pool)
//!             ├── bundle_scripts()   (blocking pool)
//!             └── copy_assets()      (blocking pool)
//! ```
//!
//! Every task is spawned on one `TaskTracker`. Tasks run unordered and
//! nothing waits for them unless the caller uses [`BuildHandle::join`].

use crate::{
    assets,
    config::SiteConfig,
    log,
    page::{self, SourceDocument, Templates},
    utils::fs::is_ignored,
};
use std::{
    io,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
};
use tokio::fs;
use tokio_util::task::TaskTracker;

/// Join point for one build.
#[derive(Debug, Clone)]
pub struct BuildHandle {
    tracker: TaskTracker,
}

impl BuildHandle {
    /// Resolve once every task of this build, nested crawls included, has finished.
    pub async fn join(self) {
        self.tracker.wait().await;
    }
}

/// State shared read-only by every task of one crawl.
struct Crawl {
    config: &'static SiteConfig,
    templates: Templates,
    tracker: TaskTracker,
}

/// Start a full build and return immediately.
///
/// Must be called from within a tokio runtime.
pub fn build_site(config: &'static SiteConfig) -> BuildHandle {
    let tracker = TaskTracker::new();

    let spawner = tracker.clone();
    tracker.spawn(async move {
        if config.build.clean {
            clean_output(config).await;
        }

        spawner.spawn_blocking(move || assets::compile_styles(config));
        spawner.spawn_blocking(move || assets::bundle_scripts(config));
        spawner.spawn_blocking(move || {
            assets::copy_assets(config);
        });

        match Templates::load(&config.build.templates) {
            Ok(templates) => {
                let crawl = Arc::new(Crawl {
                    config,
                    templates,
                    tracker: spawner.clone(),
                });
                spawner.spawn(crawl_directory(config.build.content.clone(), crawl));
            }
            Err(e) => log!("error"; "{:#}", anyhow::Error::new(e)),
        }
    });

    // Closing only stops `wait` from resolving early; tasks can still be spawned.
    tracker.close();
    BuildHandle { tracker }
}

async fn clean_output(config: &SiteConfig) {
    let output = &config.build.output;
    match fs::remove_dir_all(output).await {
        Ok(()) => log!("clean"; "{}", config.rel_path(output)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log!("error"; "failed to clean {}: {}", output.display(), e),
    }
}

/// List one directory, spawning a task per entry.
///
/// Boxed because a subdirectory's task is this same future type.
fn crawl_directory(dir: PathBuf, crawl: Arc<Crawl>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        log!("crawl"; "{}", crawl.config.rel_path(&dir));

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                log!("error"; "{}: {}", dir.display(), e);
                return;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    log!("error"; "{}: {}", dir.display(), e);
                    break;
                }
            };
            if is_ignored(&entry.file_name()) {
                continue;
            }

            let path = entry.path();
            match entry.file_type().await {
                Ok(kind) if kind.is_dir() => {
                    crawl
                        .tracker
                        .spawn(crawl_directory(path, Arc::clone(&crawl)));
                }
                Ok(kind) if kind.is_file() => {
                    crawl.tracker.spawn(process_file(path, Arc::clone(&crawl)));
                }
                // Symlinks and special files are skipped
                Ok(_) => {}
                Err(e) => log!("error"; "{}: {}", path.display(), e),
            }
        }
    })
}

async fn process_file(path: PathBuf, crawl: Arc<Crawl>) {
    let content_root = &crawl.config.build.content;
    let Ok(relative) = path.strip_prefix(content_root) else {
        log!("error"; "{} is outside the content root", path.display());
        return;
    };

    if page::is_markdown(&path) {
        render_file(&path, relative, &crawl).await;
    } else {
        copy_file(&path, relative, crawl.config).await;
    }
}

/// Read, render and write one markdown page.
async fn render_file(path: &Path, relative: &Path, crawl: &Crawl) {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            log!("error"; "{}: {}", relative.display(), e);
            return;
        }
    };

    log!("render"; "{}", relative.display());
    let doc = SourceDocument::new(relative, content);
    let page = match page::render(&doc, &crawl.templates, crawl.config) {
        Ok(page) => page,
        Err(e) => {
            log!("error"; "{}: {:#}", relative.display(), anyhow::Error::new(e));
            return;
        }
    };

    if let Err(e) = page.write().await {
        log!("error"; "{}: {}", page.path.display(), e);
    }
}

/// Copy a non-markdown file from the content tree verbatim.
async fn copy_file(path: &Path, relative: &Path, config: &SiteConfig) {
    let dest = config.build.output.join(relative);

    let result = async {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(path, &dest).await
    }
    .await;

    match result {
        Ok(_) => log!("copy"; "{}", relative.display()),
        Err(e) => log!("error"; "{}: {}", relative.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;

    const DEFAULT_TEMPLATE: &str =
        "<title>{{ pageTitle | default(value=path) }}</title>{{ content | safe }}";

    /// Lay out a site under a temp dir and leak its config.
    fn site(files: &[(&str, &str)]) -> (tempfile::TempDir, &'static SiteConfig) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for (path, content) in files {
            let path = root.join(path);
            stdfs::create_dir_all(path.parent().unwrap()).unwrap();
            stdfs::write(path, content).unwrap();
        }

        let mut config = SiteConfig::default();
        config.set_root(root);
        config.build.content = root.join("content");
        config.build.templates = root.join("templates");
        config.build.assets = root.join("assets");
        config.build.output = root.join("build");
        config.build.styles.enable = false;
        config.build.scripts.enable = false;

        (dir, Box::leak(Box::new(config)))
    }

    fn read(config: &SiteConfig, path: &str) -> String {
        stdfs::read_to_string(config.build.output.join(path)).unwrap()
    }

    #[tokio::test]
    async fn test_build_renders_nested_tree() {
        let (_dir, config) = site(&[
            ("templates/default.html", DEFAULT_TEMPLATE),
            ("content/index.md", "[_title]: # \"Home\"\n\nSee [intro](guides/intro.md).\n"),
            ("content/guides/intro.md", "## Install\n"),
            ("content/guides/deep/more.md", "More\n"),
        ]);

        build_site(config).join().await;

        assert_eq!(
            read(config, "index.html"),
            "<title>Home</title><p>See <a href=\"guides/intro.html\">intro</a>.</p>\n"
        );
        assert!(read(config, "guides/intro.html").contains("<h2>Install</h2>"));
        assert!(read(config, "guides/deep/more.html").contains("<p>More</p>"));
    }

    #[tokio::test]
    async fn test_missing_template_skips_only_that_page() {
        let (_dir, config) = site(&[
            ("templates/default.html", DEFAULT_TEMPLATE),
            ("content/good.md", "fine\n"),
            ("content/bad.md", "[_template]: # \"missing\"\n\nbroken\n"),
        ]);

        build_site(config).join().await;

        assert!(config.build.output.join("good.html").is_file());
        assert!(!config.build.output.join("bad.html").exists());
    }

    #[tokio::test]
    async fn test_broken_sibling_template_does_not_block_pages() {
        let (_dir, config) = site(&[
            ("templates/default.html", DEFAULT_TEMPLATE),
            ("templates/landing.html", "{% if %}"),
            ("content/a.md", "fine\n"),
            ("content/home.md", "[_template]: # \"landing\"\n\nhome\n"),
        ]);

        build_site(config).join().await;

        assert!(read(config, "a.html").contains("<p>fine</p>"));
        assert!(!config.build.output.join("home.html").exists());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_siblings_written() {
        let (_dir, config) = site(&[
            ("templates/default.html", DEFAULT_TEMPLATE),
            ("content/bad.md", "bad\n"),
            ("content/good.md", "good\n"),
            // A directory where the page should go makes its write fail
            ("build/bad.html/keep", ""),
        ]);

        build_site(config).join().await;

        assert!(config.build.output.join("bad.html").is_dir());
        assert!(read(config, "good.html").contains("<p>good</p>"));
    }

    #[tokio::test]
    async fn test_unreadable_source_skipped() {
        let (dir, config) = site(&[
            ("templates/default.html", DEFAULT_TEMPLATE),
            ("content/good.md", "good\n"),
        ]);
        // Not UTF-8, so reading it as text fails
        stdfs::write(dir.path().join("content/binary.md"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        build_site(config).join().await;

        assert!(!config.build.output.join("binary.html").exists());
        assert!(read(config, "good.html").contains("<p>good</p>"));
    }

    #[tokio::test]
    async fn test_non_markdown_content_copied() {
        let (_dir, config) = site(&[
            ("templates/default.html", DEFAULT_TEMPLATE),
            ("content/img/diagram.svg", "<svg/>"),
            ("content/.DS_Store", "junk"),
        ]);

        build_site(config).join().await;

        assert_eq!(read(config, "img/diagram.svg"), "<svg/>");
        assert!(!config.build.output.join(".DS_Store").exists());
    }

    #[tokio::test]
    async fn test_assets_copied() {
        let (_dir, config) = site(&[
            ("templates/default.html", DEFAULT_TEMPLATE),
            ("assets/fonts/a.woff2", "font"),
        ]);

        build_site(config).join().await;

        assert_eq!(read(config, "fonts/a.woff2"), "font");
    }

    #[tokio::test]
    async fn test_clean_removes_stale_output() {
        let (dir, config) = site(&[
            ("templates/default.html", DEFAULT_TEMPLATE),
            ("content/a.md", "a\n"),
            ("build/stale.html", "old"),
        ]);
        let mut cleaned = config.clone();
        cleaned.build.clean = true;
        let cleaned: &'static SiteConfig = Box::leak(Box::new(cleaned));

        build_site(cleaned).join().await;

        assert!(!dir.path().join("build/stale.html").exists());
        assert!(dir.path().join("build/a.html").is_file());
    }

    #[tokio::test]
    async fn test_missing_content_dir_is_not_fatal() {
        let (_dir, config) = site(&[("templates/default.html", DEFAULT_TEMPLATE)]);
        build_site(config).join().await;
        assert!(!config.build.output.join("index.html").exists());
    }

    #[tokio::test]
    async fn test_rebuild_overwrites_pages() {
        let (dir, config) = site(&[
            ("templates/default.html", DEFAULT_TEMPLATE),
            ("content/a.md", "first\n"),
        ]);
        build_site(config).join().await;
        assert!(read(config, "a.html").contains("first"));

        stdfs::write(dir.path().join("content/a.md"), "second\n").unwrap();
        build_site(config).join().await;
        assert!(read(config, "a.html").contains("second"));
    }

    #[tokio::test]
    async fn test_template_edit_picked_up_by_next_build() {
        let (dir, config) = site(&[
            ("templates/default.html", "v1"),
            ("content/a.md", "x\n"),
        ]);
        build_site(config).join().await;
        assert_eq!(read(config, "a.html"), "v1");

        stdfs::write(dir.path().join("templates/default.html"), "v2").unwrap();
        build_site(config).join().await;
        assert_eq!(read(config, "a.html"), "v2");
    }
}
