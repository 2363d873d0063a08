//! Markdown to final HTML.
//!
//! # Template context
//!
//! | Name          | Value                                            |
//! |---------------|--------------------------------------------------|
//! | `content`     | rendered markdown body (use `{{ content \| safe }}`) |
//! | `toc`         | list of `{ title, slug }` for each `##` heading  |
//! | `pageTitle`   | `[_title]`, when present                         |
//! | `description` | `[_description]`, when present                   |
//! | `meta`        | all other fields as a map                        |
//! | `<field>`     | each other field, also at top level              |
//! | `path`        | source path relative to the content root         |
//! | `baseDir`     | configured base URL                              |
//! | `site`        | the `[extra]` table of the config file           |

use super::{
    PageError, RenderedPage, SourceDocument, Templates, links::rewrite_links, markdown_options,
    meta::{self, HeadingEntry, PageMetadata},
    path,
};
use crate::config::SiteConfig;
use pulldown_cmark::{Parser, html::push_html};
use tera::Context;

/// Convert markdown to an HTML fragment.
pub fn markdown_to_html(source: &str) -> String {
    let parser = Parser::new_ext(source, markdown_options());
    let mut html = String::with_capacity(source.len() * 3 / 2);
    push_html(&mut html, parser);
    html
}

/// Render one document through its template.
pub fn render(
    doc: &SourceDocument,
    templates: &Templates,
    config: &SiteConfig,
) -> Result<RenderedPage, PageError> {
    let (metadata, toc) = meta::extract(&doc.content);
    let template = metadata.template_name(&config.build.default_template);

    let body = markdown_to_html(&doc.content);
    let context = build_context(doc, &metadata, &toc, &body, config);

    let html = templates.render(template, &context)?;
    let html = rewrite_links(&html).into_owned();
    let path = path::output_path(&doc.path, &config.build.output)?;

    Ok(RenderedPage { path, html })
}

fn build_context(
    doc: &SourceDocument,
    metadata: &PageMetadata,
    toc: &[HeadingEntry],
    body: &str,
    config: &SiteConfig,
) -> Context {
    let mut context = Context::new();

    // Generic fields first so the fixed names below always win.
    for (field, value) in &metadata.fields {
        context.insert(field.as_str(), value);
    }
    context.insert("meta", &metadata.fields);

    if let Some(title) = &metadata.page_title {
        context.insert("pageTitle", title);
    }
    if let Some(description) = &metadata.description {
        context.insert("description", description);
    }

    context.insert("content", body);
    context.insert("toc", toc);
    context.insert("path", &doc.path.to_string_lossy().replace('\\', "/"));
    context.insert("baseDir", &config.build.base_url);
    context.insert("site", &config.extra);

    context
}
