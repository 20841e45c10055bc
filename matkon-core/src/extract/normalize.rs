//! Ingredient name normalization for matching and search.
//!
//! Extraction usually separates quantity and unit from the name, but models
//! sometimes leave them in ("2 כוסות קמח"). The canonical name is what
//! ingredient search and ranking compare against.

use std::sync::LazyLock;

use regex::Regex;

/// A leading standalone quantity: integer, decimal, simple fraction, or a
/// vulgar fraction character.
static LEADING_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+(?:[.,/]\d+)?|[½¼¾⅓⅔⅛])(?:\s+|$)").expect("Invalid quantity regex")
});

/// A leading unit word followed by whitespace. Longer forms come first so
/// that alternation does not stop at a prefix.
static LEADING_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^(?:כוסות|כוס|כפות|כפיות|כפית|כף|גרם|ק"ג|קילו|מ"ל|ליטר|יחידות|יחידה|יח'|יח׳|cups?|tablespoons?|tbsp|teaspoons?|tsp|grams?|kg|g|ml|litres?|liters?|l|units?)\s+"#,
    )
    .expect("Invalid unit regex")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Canonical form of an ingredient name.
///
/// Strips leading quantity and unit tokens until nothing more matches, then
/// collapses whitespace. A name that is nothing but quantity and unit is
/// returned trimmed rather than emptied.
pub fn normalize(name: &str) -> String {
    let trimmed = name.trim();
    let mut rest = trimmed;

    loop {
        let before = rest.len();
        if let Some(m) = LEADING_QUANTITY.find(rest) {
            rest = &rest[m.end()..];
        }
        if let Some(m) = LEADING_UNIT.find(rest) {
            rest = &rest[m.end()..];
        }
        rest = rest.trim_start();
        if rest.len() == before {
            break;
        }
    }

    let collapsed = WHITESPACE.replace_all(rest.trim(), " ").into_owned();
    if collapsed.is_empty() {
        WHITESPACE.replace_all(trimmed, " ").into_owned()
    } else {
        collapsed
    }
}
