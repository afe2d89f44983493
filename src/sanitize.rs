//! HTML scrubbing for user supplied text.
//!
//! Free-text fields lose every tag and come back as plain text, not HTML. The
//! `code` body keeps a narrow formatting subset so highlighted snippets
//! survive: `div`, `span` and `br`, with `class` and `style` attributes limited
//! to a handful of CSS properties.

use std::collections::HashSet;

use ammonia::Builder;

const DROPPED_CONTENT: [&str; 2] = ["script", "style"];
const CODE_TAGS: [&str; 3] = ["div", "span", "br"];
const CODE_ATTRIBUTES: [&str; 2] = ["class", "style"];
const CODE_STYLE_PROPERTIES: [&str; 5] = [
    "color",
    "background-color",
    "font-weight",
    "font-style",
    "text-decoration",
];

/// Entities the HTML serializer writes into text nodes.
const TEXT_ENTITIES: [(&str, &str); 4] = [
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&nbsp;", "\u{a0}"),
];

/// Strips all markup and surrounding whitespace, returning plain text.
pub fn text(input: &str) -> String {
    let html = Builder::empty()
        .clean_content_tags(HashSet::from(DROPPED_CONTENT))
        .clean(input.trim())
        .to_string();

    unescape(&html).trim().to_owned()
}

/// Undoes the serializer's text escaping in a single left-to-right pass.
fn unescape(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        match TEXT_ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, plain)) => {
                out.push_str(plain);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Purifies a code body, keeping only the allowed formatting markup.
pub fn code(input: &str) -> String {
    let mut builder = Builder::empty();
    builder
        .tags(HashSet::from(CODE_TAGS))
        .clean_content_tags(HashSet::from(DROPPED_CONTENT))
        .generic_attributes(HashSet::from(CODE_ATTRIBUTES))
        .filter_style_properties(HashSet::from(CODE_STYLE_PROPERTIES));

    builder.clean(input).to_string().trim().to_owned()
}
