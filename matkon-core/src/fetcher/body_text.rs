//! Readable body text for pages without structured data.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

/// Longest body text handed to the model.
pub const MAX_BODY_CHARS: usize = 8000;

/// Elements whose text is never recipe content.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "svg",
];

static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("Invalid body selector"));

/// Strip boilerplate elements and markup, collapse whitespace, and truncate.
/// Returns `None` when nothing readable is left.
pub fn extract_body_text(document: &Html) -> Option<String> {
    let root = document
        .select(&BODY_SELECTOR)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    collect_text(root, &mut raw);

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(truncate_chars(&collapsed, MAX_BODY_CHARS))
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) => {
                if SKIPPED_ELEMENTS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
