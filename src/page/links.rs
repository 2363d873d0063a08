//! Rewrite links between markdown sources into links between output pages.
//!
//! This is a textual substitution over the final HTML, not a DOM walk: any
//! attribute ending in `href="…"` is affected, `data-href` included.

use regex::{Captures, Regex};
use std::{borrow::Cow, sync::LazyLock};

/// `href="<target>.md<#fragment|?query>"`
static MD_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]*?)\.md([#?][^"]*)?""#).unwrap());

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap());

/// Replace `.md` with `.html` in every relative `href`.
///
/// Targets with a scheme (`https:`, `mailto:`) or a protocol-relative `//`
/// prefix are left alone. Returns the input unchanged when nothing matches.
pub fn rewrite_links(html: &str) -> Cow<'_, str> {
    MD_HREF.replace_all(html, |caps: &Captures| {
        let target = &caps[1];
        if is_external(target) {
            return caps[0].to_owned();
        }
        let suffix = caps.get(2).map_or("", |m| m.as_str());
        format!("href=\"{target}.html{suffix}\"")
    })
}

fn is_external(target: &str) -> bool {
    target.starts_with("//") || SCHEME.is_match(target)
}
