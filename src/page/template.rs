//! Template lookup over a directory of tera templates.
//!
//! A page asks for a template by bare name (`default`, `landing`); the file
//! on disk is `<templates>/<name>.html`. Templates may `{% extends %}` or
//! `{% include %}` each other by file name.
//!
//! A broken file only takes itself (and whatever extends it) out of the set,
//! so pages using the other templates still render.

use super::PageError;
use crate::{log, utils::fs::collect_all_files};
use std::{borrow::Cow, fs, path::Path};
use tera::{Context, Tera, Template};

/// Extension of template files.
pub const TEMPLATE_EXTENSION: &str = "html";

/// The loaded template set, shared read-only by every render of one crawl.
#[derive(Debug)]
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// An empty set; every lookup fails with `TemplateNotFound`.
    pub fn empty() -> Self {
        Self {
            tera: Tera::default(),
        }
    }

    /// Load every `*.html` file below `dir`.
    ///
    /// A missing directory yields an empty set. Files that fail to read or
    /// parse are logged and left out, as are templates whose parent or
    /// imported macros are missing.
    pub fn load(dir: &Path) -> Result<Self, PageError> {
        if !dir.is_dir() {
            return Ok(Self::empty());
        }

        let mut sources = Vec::new();
        for path in collect_all_files(dir) {
            if path.extension().is_none_or(|ext| ext != TEMPLATE_EXTENSION) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            let name = relative.to_string_lossy().replace('\\', "/");

            let source = match fs::read_to_string(&path) {
                Ok(source) => source,
                Err(e) => {
                    log!("error"; "template {}: {}", name, e);
                    continue;
                }
            };
            if let Err(e) = Template::new(&name, None, &source) {
                log!("error"; "template {}: {:#}", name, anyhow::Error::new(e));
                continue;
            }
            sources.push((name, source));
        }

        let sources = resolve_dependencies(sources);
        let mut tera = Tera::default();
        tera.add_raw_templates(sources)
            .map_err(|err| PageError::Load(dir.to_path_buf(), err))?;
        Ok(Self { tera })
    }

    /// Build a set from in-memory `(name, source)` pairs.
    pub fn from_raw<'a>(
        templates: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, PageError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(
            templates
                .into_iter()
                .map(|(name, source)| (file_name(name).into_owned(), source)),
        )
        .map_err(|err| PageError::Load("<inline>".into(), err))?;
        Ok(Self { tera })
    }

    pub fn contains(&self, name: &str) -> bool {
        let file = file_name(name);
        self.tera.get_template_names().any(|n| n == file)
    }

    /// Number of loaded templates.
    pub fn len(&self) -> usize {
        self.tera.get_template_names().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the named template.
    pub fn render(&self, name: &str, context: &Context) -> Result<String, PageError> {
        if !self.contains(name) {
            return Err(PageError::TemplateNotFound(name.to_owned()));
        }
        self.tera
            .render(&file_name(name), context)
            .map_err(|source| PageError::Render {
                name: name.to_owned(),
                source,
            })
    }
}

/// Keep the templates whose `extends`/`import` targets are all present.
///
/// The common case of a consistent set is accepted in one pass. Otherwise
/// templates are admitted one at a time until no more can be added, and the
/// rest are logged.
fn resolve_dependencies(sources: Vec<(String, String)>) -> Vec<(String, String)> {
    let links = |set: &[(String, String)]| {
        Tera::default()
            .add_raw_templates(set.iter().map(|(n, s)| (n.as_str(), s.as_str())))
            .is_ok()
    };
    if links(&sources) {
        return sources;
    }

    let mut accepted: Vec<(String, String)> = Vec::with_capacity(sources.len());
    let mut pending = sources;
    loop {
        let before = pending.len();
        pending.retain(|candidate| {
            accepted.push(candidate.clone());
            if links(&accepted) {
                false
            } else {
                accepted.pop();
                true
            }
        });
        if pending.len() == before {
            break;
        }
    }

    for (name, _) in &pending {
        log!("error"; "template {}: missing parent or imported template", name);
    }
    accepted
}

/// `landing` → `landing.html`; names that already carry the extension pass through.
fn file_name(name: &str) -> Cow<'_, str> {
    if name.ends_with(".html") {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.{TEMPLATE_EXTENSION}"))
    }
}
