//! Open Graph / Twitter card / plain meta tag lookup.

use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::{Html, Selector};

static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("Invalid meta selector"));

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("Invalid title selector"));

/// Meta tags of a page, keyed by lowercased `property` or `name`.
///
/// When a key appears more than once the first non-empty value wins, which is
/// what platforms expect for repeated `og:image` tags.
#[derive(Debug, Default)]
pub struct PageMeta {
    tags: HashMap<String, String>,
    title_element: Option<String>,
}

impl PageMeta {
    pub fn from_document(document: &Html) -> Self {
        let mut tags = HashMap::new();

        for element in document.select(&META_SELECTOR) {
            let attrs = element.value();
            let key = match attrs.attr("property").or_else(|| attrs.attr("name")) {
                Some(k) => k.trim().to_lowercase(),
                None => continue,
            };
            let content = match attrs.attr("content").map(str::trim) {
                Some(c) if !c.is_empty() => c.to_string(),
                _ => continue,
            };
            tags.entry(key).or_insert(content);
        }

        let title_element = document
            .select(&TITLE_SELECTOR)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        Self {
            tags,
            title_element,
        }
    }

    pub fn parse(html: &str) -> Self {
        Self::from_document(&Html::parse_document(html))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// First present key, in order.
    pub fn first(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    pub fn title(&self) -> Option<String> {
        self.first(&["og:title", "title"])
            .map(str::to_string)
            .or_else(|| self.title_element.clone())
    }

    pub fn description(&self) -> Option<String> {
        self.first(&["og:description", "description"])
            .map(str::to_string)
    }

    /// Open Graph image, secure variants first.
    pub fn og_image(&self) -> Option<String> {
        self.first(&["og:image:secure_url", "og:image:url", "og:image"])
            .map(str::to_string)
    }

    /// Open Graph image falling back to the Twitter card image.
    pub fn any_image(&self) -> Option<String> {
        self.og_image().or_else(|| {
            self.first(&["twitter:image", "twitter:image:src"])
                .map(str::to_string)
        })
    }

    pub fn video(&self) -> Option<String> {
        self.first(&["og:video:url", "og:video:secure_url", "og:video"])
            .map(str::to_string)
    }
}

/// Resolve a possibly relative URL found in a page against the page URL.
pub fn absolutize(page_url: &str, candidate: &str) -> String {
    url::Url::parse(page_url)
        .and_then(|base| base.join(candidate))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| candidate.to_string())
}
