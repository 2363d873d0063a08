//! Page metadata and table-of-contents extraction.
//!
//! Metadata lives in the markdown itself as "hidden" link-reference
//! definitions, whose label starts with `_`:
//!
//! ```markdown
//! [_title]: # "Getting Started"
//! [_template]: # "guide"
//! [_author]: # "Ada"
//! ```
//!
//! Definitions never render, so the fields are invisible in the page body.
//! The value is the definition's title; the destination is ignored.

use super::markdown_options;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use regex::Regex;
use serde::Serialize;
use std::{collections::BTreeMap, ops::Range, sync::LazyLock};

/// Reserved field selecting the page template.
pub const TEMPLATE_FIELD: &str = "template";
/// Promoted to [`PageMetadata::page_title`].
pub const TITLE_FIELD: &str = "title";
/// Promoted to [`PageMetadata::description`].
pub const DESCRIPTION_FIELD: &str = "description";

/// Start of a line that may open a `[_label]: ...` definition.
///
/// Groups: 1 = the definition from its `[`, 2 = label without the `_`.
/// Only locates candidates; pulldown decides what the definition holds.
static HIDDEN_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^ {0,3}(\[_([^\]\n]+)\]:)").unwrap());

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w]+").unwrap());

/// Fields collected from hidden definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    /// `[_title]`, exposed to templates as `pageTitle`
    pub page_title: Option<String>,
    /// `[_description]`
    pub description: Option<String>,
    /// `[_template]`, the template name without extension
    pub template: Option<String>,
    /// Every other field
    pub fields: BTreeMap<String, String>,
}

impl PageMetadata {
    /// Split the reserved and promoted fields out of a raw field map.
    pub fn from_fields(mut fields: BTreeMap<String, String>) -> Self {
        let template = fields.remove(TEMPLATE_FIELD);
        let page_title = fields.remove(TITLE_FIELD);
        let description = fields.remove(DESCRIPTION_FIELD);

        Self {
            page_title,
            description,
            template,
            fields,
        }
    }

    /// Template to render with, falling back to `default`.
    pub fn template_name<'a>(&'a self, default: &'a str) -> &'a str {
        self.template.as_deref().unwrap_or(default)
    }
}

/// A level-2 heading, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingEntry {
    pub title: String,
    /// `#` followed by the slugified title
    pub slug: String,
}

impl HeadingEntry {
    pub fn new(title: String) -> Self {
        let slug = format!("#{}", slugify(&title));
        Self { title, slug }
    }
}

/// Extract metadata and the table of contents in one call.
pub fn extract(source: &str) -> (PageMetadata, Vec<HeadingEntry>) {
    (
        PageMetadata::from_fields(extract_fields(source)),
        extract_toc(source),
    )
}

/// Collect every level-2 heading.
///
/// Inline code contributes its text; other heading levels are skipped.
/// Duplicate titles produce duplicate slugs.
pub fn extract_toc(source: &str) -> Vec<HeadingEntry> {
    let mut toc = Vec::new();
    let mut current: Option<String> = None;

    for event in Parser::new_ext(source, markdown_options()) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H2,
                ..
            }) => current = Some(String::new()),
            Event::End(TagEnd::Heading(HeadingLevel::H2)) => {
                if let Some(title) = current.take() {
                    toc.push(HeadingEntry::new(title));
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(title) = current.as_mut() {
                    title.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(title) = current.as_mut() {
                    title.push(' ');
                }
            }
            _ => {}
        }
    }

    toc
}

/// Collect hidden definitions as `field -> value`.
///
/// A line inside another block (paragraph continuation, code, quote, list)
/// is not a definition and is skipped. Later definitions overwrite earlier
/// ones with the same field.
pub fn extract_fields(source: &str) -> BTreeMap<String, String> {
    let blocks = block_ranges(source);
    let mut fields = BTreeMap::new();

    for caps in HIDDEN_LABEL.captures_iter(source) {
        let (Some(definition), Some(label)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if blocks.iter().any(|block| block.contains(&definition.start())) {
            continue;
        }

        let span = definition_span(source, definition.start());
        if let Some(value) = definition_title(span) {
            fields.insert(label.as_str().trim().to_owned(), value);
        }
    }

    fields
}

/// Text from `start` up to the next blank line, which no definition crosses.
fn definition_span(source: &str, start: usize) -> &str {
    let rest = &source[start..];
    let mut end = 0;
    for line in rest.split_inclusive('\n') {
        if end > 0 && line.trim().is_empty() {
            break;
        }
        end += line.len();
    }
    &rest[..end]
}

/// Title of the definition opening `span`, as the converter reads it.
///
/// Escapes and entities are decoded and the title may span lines. `None` when
/// `span` does not open with a valid definition; a missing title is `""`.
fn definition_title(span: &str) -> Option<String> {
    let parser = Parser::new_ext(span, markdown_options());
    parser
        .reference_definitions()
        .iter()
        .find(|(_, def)| def.span.start == 0)
        .map(|(_, def)| def.title.as_deref().unwrap_or_default().to_owned())
}

/// Byte ranges of top-level blocks.
///
/// Link-reference definitions emit no events, so any definition-shaped line
/// falling inside one of these ranges belongs to some other block.
fn block_ranges(source: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut depth = 0usize;

    for (event, range) in Parser::new_ext(source, markdown_options()).into_offset_iter() {
        match event {
            Event::Start(_) => {
                if depth == 0 {
                    ranges.push(range);
                }
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            _ if depth == 0 => ranges.push(range),
            _ => {}
        }
    }

    ranges
}

/// Lowercase, trim, and fold each run of non-word characters into `-`.
///
/// ```ignore
/// assert_eq!(slugify("Getting Started"), "getting-started");
/// ```
pub fn slugify(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    NON_WORD.replace_all(&lower, "-").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document() {
        let (meta, toc) = extract("");
        assert_eq!(meta, PageMetadata::default());
        assert!(toc.is_empty());
    }

    #[test]
    fn test_no_level_two_headings() {
        let toc = extract_toc("# Title\n\n### Deep\n\ntext\n");
        assert!(toc.is_empty());
    }

    #[test]
    fn test_toc_in_document_order() {
        let source = "# Top\n\n## Getting Started\n\ntext\n\n### Sub\n\n## API `Reference`\n";
        let toc = extract_toc(source);

        assert_eq!(
            toc,
            vec![
                HeadingEntry {
                    title: "Getting Started".into(),
                    slug: "#getting-started".into(),
                },
                HeadingEntry {
                    title: "API Reference".into(),
                    slug: "#api-reference".into(),
                },
            ]
        );
    }

    #[test]
    fn test_toc_setext_and_emphasis() {
        let toc = extract_toc("*Bold* move\n-----------\n");
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].title, "Bold move");
        assert_eq!(toc[0].slug, "#bold-move");
    }

    #[test]
    fn test_toc_duplicate_headings_keep_duplicate_slugs() {
        let toc = extract_toc("## Setup\n\n## Setup\n");
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].slug, "#setup");
        assert_eq!(toc[1].slug, "#setup");
    }

    #[test]
    fn test_toc_ignores_headings_in_code() {
        let toc = extract_toc("```\n## not a heading\n```\n");
        assert!(toc.is_empty());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("  Step 1: Install  "), "step-1-install");
        assert_eq!(slugify("API & SDK"), "api-sdk");
        assert_eq!(slugify("Hello, World!"), "hello-world-");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
        assert_eq!(slugify("Café Menü"), "café-menü");
    }

    #[test]
    fn test_title_field() {
        let (meta, _) = extract("[_title]: # \"My Page\"\n\nBody text.\n");
        assert_eq!(meta.page_title.as_deref(), Some("My Page"));
        assert!(meta.fields.is_empty());
    }

    #[test]
    fn test_promoted_and_generic_fields() {
        let source = "\
[_title]: # \"Guide\"
[_description]: # \"How to start\"
[_template]: # \"landing\"
[_author]: # \"Ada\"
[_date]: # '2024-01-01'
[_tags]: # (rust, web)

Body
";
        let (meta, _) = extract(source);

        assert_eq!(meta.page_title.as_deref(), Some("Guide"));
        assert_eq!(meta.description.as_deref(), Some("How to start"));
        assert_eq!(meta.template.as_deref(), Some("landing"));
        assert_eq!(meta.fields.len(), 3);
        assert_eq!(meta.fields["author"], "Ada");
        assert_eq!(meta.fields["date"], "2024-01-01");
        assert_eq!(meta.fields["tags"], "rust, web");
    }

    #[test]
    fn test_template_name_resolution() {
        let (meta, _) = extract("Just text.\n");
        assert_eq!(meta.template_name("default"), "default");

        let (meta, _) = extract("[_template]: # \"landing\"\n");
        assert_eq!(meta.template_name("default"), "landing");
    }

    #[test]
    fn test_duplicate_field_last_wins() {
        let fields = extract_fields("[_author]: # \"First\"\n[_author]: # \"Second\"\n");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["author"], "Second");
    }

    #[test]
    fn test_definition_without_prefix_ignored() {
        let fields = extract_fields("[site]: https://example.com \"Example\"\n");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_definition_without_title_is_empty() {
        let fields = extract_fields("[_draft]: #\n");
        assert_eq!(fields["draft"], "");
    }

    #[test]
    fn test_angle_bracket_destination() {
        let fields = extract_fields("[_cover]: <img/cover photo.png> \"Cover\"\n");
        assert_eq!(fields["cover"], "Cover");
    }

    #[test]
    fn test_definition_in_fenced_code_ignored() {
        let fields = extract_fields("```md\n[_title]: # \"Nope\"\n```\n");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_definition_in_indented_code_ignored() {
        let fields = extract_fields("    [_title]: # \"Nope\"\n");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_paragraph_continuation_ignored() {
        let fields = extract_fields("Some text\n[_title]: # \"Nope\"\n");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_definition_after_paragraph() {
        let fields = extract_fields("Some text\n\n[_title]: # \"Yes\"\n\nMore text\n");
        assert_eq!(fields["title"], "Yes");
    }

    #[test]
    fn test_definition_in_block_quote_ignored() {
        let fields = extract_fields("> [_title]: # \"Nope\"\n");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_malformed_definition_is_absent() {
        let fields = extract_fields("[_title]: # \"unterminated\n\nBody\n");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_title_on_next_line() {
        let fields = extract_fields("[_title]: #\n  \"My Page\"\n\nBody\n");
        assert_eq!(fields["title"], "My Page");
    }

    #[test]
    fn test_title_with_escaped_quote() {
        let fields = extract_fields("[_title]: # \"Say \\\"hi\\\"\"\n\nBody\n");
        assert_eq!(fields["title"], "Say \"hi\"");
    }

    #[test]
    fn test_title_spanning_lines() {
        let fields = extract_fields("[_description]: # \"line one\nline two\"\n\nBody\n");
        assert_eq!(fields["description"], "line one\nline two");
    }

    #[test]
    fn test_title_entities_decoded() {
        let fields = extract_fields("[_title]: # \"Fish &amp; Chips\"\n");
        assert_eq!(fields["title"], "Fish & Chips");
    }

    #[test]
    fn test_hidden_definitions_match_converter() {
        let source = "[_title]: #\n  \"My Page\"\n[_note]: # \"a\nb\"\n\nBody\n";
        assert_eq!(super::super::render::markdown_to_html(source), "<p>Body</p>\n");

        let fields = extract_fields(source);
        assert_eq!(fields["title"], "My Page");
        assert_eq!(fields["note"], "a\nb");
    }

    #[test]
    fn test_crlf_line_endings() {
        let fields = extract_fields("[_title]: # \"Windows\"\r\n\r\nBody\r\n");
        assert_eq!(fields["title"], "Windows");
    }
}
