//! File system watcher for development mode.
//!
//! Monitors the content, template and asset directories plus the stylesheet
//! and script sources, and hands each debounced batch of changes to a
//! callback. There is no incremental rebuild: every batch triggers a full
//! re-crawl.
//!
//! ```text
//! notify events ──► Debouncer (300ms) ──► on_change(paths)
//! ```

use crate::{config::SiteConfig, log};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::mpsc::{self, RecvTimeoutError},
    time::{Duration, Instant},
};

const DEBOUNCE_MS: u64 = 300;

/// What a watched path feeds into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchTarget {
    Content,
    Templates,
    Assets,
    Styles,
    Scripts,
    Config,
}

impl WatchTarget {
    const ALL: [Self; 6] = [
        Self::Content,
        Self::Templates,
        Self::Assets,
        Self::Styles,
        Self::Scripts,
        Self::Config,
    ];

    /// Watched path and recursion mode.
    ///
    /// Style and script entries are watched through their directory, so
    /// partials and imported modules are covered too.
    fn path(self, config: &SiteConfig) -> Option<(PathBuf, RecursiveMode)> {
        let build = &config.build;
        let recursive = |p: &Path| Some((p.to_path_buf(), RecursiveMode::Recursive));
        match self {
            Self::Content => recursive(&build.content),
            Self::Templates => recursive(&build.templates),
            Self::Assets => recursive(&build.assets),
            Self::Styles if build.styles.enable => recursive(build.styles.input.parent()?),
            Self::Scripts if build.scripts.enable => recursive(build.scripts.input.parent()?),
            Self::Styles | Self::Scripts => None,
            Self::Config => Some((config.config_path.clone(), RecursiveMode::NonRecursive)),
        }
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
        || name.starts_with('#')
}

/// Batches rapid file events.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    /// Paths under here are build products, never triggers
    ignored_root: PathBuf,
}

impl Debouncer {
    fn new(ignored_root: PathBuf) -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
            ignored_root,
        }
    }

    fn add(&mut self, event: Event) {
        let mut added = false;
        for path in event.paths {
            if !is_temp_file(&path) && !path.starts_with(&self.ignored_root) {
                added |= self.pending.insert(path);
            }
        }
        if added {
            self.last_event = Some(Instant::now());
        }
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    /// Drain the batch, sorted for stable log output.
    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        let mut paths: Vec<_> = self.pending.drain().collect();
        paths.sort();
        paths
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

fn setup_watchers(watcher: &mut impl Watcher, config: &SiteConfig) -> Result<()> {
    let mut watched = Vec::new();

    for target in WatchTarget::ALL {
        let Some((path, mode)) = target.path(config) else {
            continue;
        };
        if !path.exists() {
            continue;
        }

        watcher
            .watch(&path, mode)
            .with_context(|| format!("Failed to watch {target:?}: {}", path.display()))?;
        watched.push(config.rel_path(&path));
    }

    if !watched.is_empty() {
        log!("watch"; "{}", watched.join(", "));
    }
    Ok(())
}

/// Describe a batch for the log line.
fn summarize(paths: &[PathBuf], config: &SiteConfig) -> String {
    match paths {
        [single] => config.rel_path(single),
        [first, rest @ ..] => format!("{} and {} more", config.rel_path(first), rest.len()),
        [] => String::new(),
    }
}

/// Block the current thread watching sources, calling `on_change` per batch.
///
/// A change to the config file only logs a notice: the config is fixed for
/// the lifetime of the process.
pub fn watch_for_changes_blocking(
    config: &'static SiteConfig,
    mut on_change: impl FnMut(&[PathBuf]),
) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    setup_watchers(&mut watcher, config)?;

    let mut debouncer = Debouncer::new(config.build.output.clone());

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => debouncer.add(event),
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                let mut paths = debouncer.take();

                if paths.iter().any(|p| p == &config.config_path) {
                    log!("watch"; "config changed, restart to apply it");
                    paths.retain(|p| p != &config.config_path);
                }
                if paths.is_empty() {
                    continue;
                }

                log!("watch"; "{} changed, rebuilding...", summarize(&paths, config));
                on_change(&paths);
            }
            Err(RecvTimeoutError::Disconnected) => break,
            _ => {}
        }
    }

    Ok(())
}
