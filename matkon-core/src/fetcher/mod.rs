//! Content fetching: turn a classified URL into descriptive text, an image,
//! and (for video platforms) a canonical media URL.
//!
//! Strategy precedence depends on the platform:
//! - websites: structured data, else meta tags plus body text
//! - YouTube: direct thumbnail probe plus oEmbed, independently
//! - other social platforms: oEmbed
//! - any social platform whose oEmbed fails: page meta tags
//!
//! Nothing here retries; the orchestrator wraps calls in `with_retry`.

mod body_text;
mod jsonld;
mod meta;
mod oembed;

pub use body_text::{extract_body_text, MAX_BODY_CHARS};
pub use jsonld::{extract_jsonld_recipe, JsonLdRecipe};
pub use meta::PageMeta;
pub use oembed::{oembed_endpoint, youtube_thumbnail_urls, youtube_video_id};

use std::sync::Arc;

use scraper::Html;

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::types::{FetchedContent, Platform};

use meta::absolutize;
use oembed::{oembed_request_url, OEmbedResponse};

pub struct ContentFetcher {
    client: Arc<dyn HttpClient>,
}

impl ContentFetcher {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    /// Fetch content for a URL, trying strategies in platform order.
    pub async fn fetch(&self, url: &str, platform: Platform) -> Result<FetchedContent, FetchError> {
        match platform {
            Platform::Website => self.fetch_website(url).await,
            Platform::Upload => Err(FetchError::InvalidUrl(
                "uploaded content has no source URL".to_string(),
            )),
            _ => self.fetch_social(url, platform).await,
        }
    }

    async fn fetch_website(&self, url: &str) -> Result<FetchedContent, FetchError> {
        let html = self.client.fetch_text(url).await?;
        Ok(parse_website(url, &html))
    }

    async fn fetch_social(
        &self,
        url: &str,
        platform: Platform,
    ) -> Result<FetchedContent, FetchError> {
        if platform == Platform::Youtube {
            if let Some(video_id) = youtube_video_id(url) {
                return Ok(self.fetch_youtube(url, &video_id).await);
            }
        }

        match self.fetch_oembed(url, platform).await {
            Ok(content) => return Ok(content),
            Err(e) => {
                tracing::debug!(url, %platform, error = %e, "oEmbed failed, falling back to page metadata");
            }
        }

        self.fetch_page_metadata(url, platform).await
    }

    /// Thumbnail and oEmbed metadata are resolved independently; neither
    /// failing fails the fetch.
    async fn fetch_youtube(&self, url: &str, video_id: &str) -> FetchedContent {
        let (maxres, hq) = youtube_thumbnail_urls(video_id);
        let thumbnail = if self.client.exists(&maxres).await {
            maxres
        } else {
            hq
        };

        let mut content = match self.fetch_oembed(url, Platform::Youtube).await {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(url, error = %e, "YouTube oEmbed failed, keeping thumbnail only");
                FetchedContent {
                    video_url: Some(url.to_string()),
                    platform: Platform::Youtube,
                    ..Default::default()
                }
            }
        };
        content.image_url = Some(thumbnail);
        content
    }

    async fn fetch_oembed(
        &self,
        url: &str,
        platform: Platform,
    ) -> Result<FetchedContent, FetchError> {
        let endpoint = oembed_endpoint(platform).ok_or_else(|| {
            FetchError::Parse(format!("no oEmbed endpoint for {}", platform))
        })?;
        let request_url = oembed_request_url(endpoint, url)?;

        let body = self.client.fetch_text(&request_url).await?;
        let response = OEmbedResponse::parse(&body)?;

        tracing::debug!(url, %platform, "oEmbed metadata fetched");
        Ok(FetchedContent {
            description: response.description(),
            title: response.title(),
            video_url: Some(url.to_string()),
            image_url: response.thumbnail(),
            platform,
            full_text: None,
        })
    }

    /// Last resort for social platforms: read the post page's meta tags.
    async fn fetch_page_metadata(
        &self,
        url: &str,
        platform: Platform,
    ) -> Result<FetchedContent, FetchError> {
        let html = self.client.fetch_text(url).await?;
        let meta = PageMeta::parse(&html);

        let title = meta.title();
        Ok(FetchedContent {
            description: join_non_empty(&[title.as_deref(), meta.description().as_deref()]),
            title,
            video_url: Some(
                meta.video()
                    .map(|v| absolutize(url, &v))
                    .unwrap_or_else(|| url.to_string()),
            ),
            image_url: meta.any_image().map(|i| absolutize(url, &i)),
            platform,
            full_text: None,
        })
    }
}

/// Build website content from an already-fetched page.
pub fn parse_website(url: &str, html: &str) -> FetchedContent {
    let document = Html::parse_document(html);
    let meta = PageMeta::from_document(&document);
    let title = meta.title();
    let meta_image = meta.og_image().map(|i| absolutize(url, &i));

    if let Some(recipe) = extract_jsonld_recipe(html) {
        tracing::debug!(url, "found JSON-LD recipe");
        return FetchedContent {
            description: title.clone().unwrap_or_default(),
            title,
            video_url: None,
            image_url: recipe.image.map(|i| absolutize(url, &i)).or(meta_image),
            platform: Platform::Website,
            full_text: Some(recipe.text),
        };
    }

    FetchedContent {
        description: join_non_empty(&[title.as_deref(), meta.description().as_deref()]),
        title,
        video_url: None,
        image_url: meta_image,
        platform: Platform::Website,
        full_text: extract_body_text(&document),
    }
}

fn join_non_empty(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockClient;

    const TIKTOK_URL: &str = "https://www.tiktok.com/@chef/video/123";

    fn oembed_url(endpoint: &str, url: &str) -> String {
        oembed_request_url(endpoint, url).unwrap()
    }

    fn fetcher(client: MockClient) -> (ContentFetcher, Arc<MockClient>) {
        let client = Arc::new(client);
        (ContentFetcher::new(client.clone()), client)
    }

    #[tokio::test]
    async fn test_tiktok_oembed() {
        let (fetcher, _) = fetcher(MockClient::new().with_text(
            &oembed_url("https://www.tiktok.com/oembed", TIKTOK_URL),
            r#"{"title":"פסטה ברוטב עגבניות","author_name":"chef","thumbnail_url":"https://p16.tiktokcdn.com/t.jpg"}"#,
        ));

        let content = fetcher.fetch(TIKTOK_URL, Platform::Tiktok).await.unwrap();
        assert_eq!(content.description, "פסטה ברוטב עגבניות");
        assert_eq!(content.video_url.as_deref(), Some(TIKTOK_URL));
        assert_eq!(
            content.image_url.as_deref(),
            Some("https://p16.tiktokcdn.com/t.jpg")
        );
        assert_eq!(content.platform, Platform::Tiktok);
    }

    #[tokio::test]
    async fn test_oembed_failure_falls_back_to_page_meta() {
        let url = "https://www.instagram.com/reel/Cxyz/";
        let (fetcher, _) = fetcher(
            MockClient::new()
                .with_text(
                    &oembed_url("https://noembed.com/embed", url),
                    r#"{"error":"no matching providers found"}"#,
                )
                .with_text(
                    url,
                    r#"<html><head>
                        <meta property="og:title" content="Chef on Instagram">
                        <meta property="og:description" content="Best hummus ever">
                        <meta name="twitter:image" content="https://cdn.example.com/tw.jpg">
                    </head></html>"#,
                ),
        );

        let content = fetcher.fetch(url, Platform::Instagram).await.unwrap();
        assert_eq!(content.description, "Chef on Instagram\n\nBest hummus ever");
        assert_eq!(content.video_url.as_deref(), Some(url));
        assert_eq!(
            content.image_url.as_deref(),
            Some("https://cdn.example.com/tw.jpg")
        );
    }

    #[tokio::test]
    async fn test_all_strategies_fail() {
        let (fetcher, _) = fetcher(MockClient::new().with_status(TIKTOK_URL, 403));
        assert!(fetcher.fetch(TIKTOK_URL, Platform::Tiktok).await.is_err());
    }

    #[tokio::test]
    async fn test_youtube_thumbnail_without_oembed() {
        let url = "https://www.youtube.com/watch?v=abc123";
        let (fetcher, client) = fetcher(
            MockClient::new().with_existing("https://i.ytimg.com/vi/abc123/maxresdefault.jpg"),
        );

        let content = fetcher.fetch(url, Platform::Youtube).await.unwrap();
        assert_eq!(
            content.image_url.as_deref(),
            Some("https://i.ytimg.com/vi/abc123/maxresdefault.jpg")
        );
        assert_eq!(content.description, "");
        assert_eq!(content.video_url.as_deref(), Some(url));
        // Never falls through to scraping the watch page
        assert_eq!(client.request_count(url), 0);
    }

    #[tokio::test]
    async fn test_youtube_falls_back_to_hq_thumbnail() {
        let url = "https://youtu.be/abc123";
        let (fetcher, _) = fetcher(MockClient::new().with_text(
            &oembed_url("https://www.youtube.com/oembed", url),
            r#"{"title":"Sourdough","author_name":"baker"}"#,
        ));

        let content = fetcher.fetch(url, Platform::Youtube).await.unwrap();
        assert_eq!(
            content.image_url.as_deref(),
            Some("https://i.ytimg.com/vi/abc123/hqdefault.jpg")
        );
        assert_eq!(content.title.as_deref(), Some("Sourdough"));
    }

    #[tokio::test]
    async fn test_website_error_status() {
        let url = "https://example.com/recipe";
        let (fetcher, _) = fetcher(MockClient::new().with_status(url, 500));
        assert!(matches!(
            fetcher.fetch(url, Platform::Website).await,
            Err(FetchError::HttpStatus(500))
        ));
    }

    #[test]
    fn test_website_with_jsonld() {
        let html = r#"<html><head>
            <meta property="og:title" content="Grandma's Cake">
            <meta property="og:image" content="/img/og.jpg">
            <script type="application/ld+json">{"@type":"Recipe","name":"Cake","recipeIngredient":["2 eggs"]}</script>
        </head><body><p>Story about grandma</p></body></html>"#;

        let content = parse_website("https://example.com/cake", html);
        assert_eq!(content.description, "Grandma's Cake");
        assert!(content.full_text.as_deref().unwrap().contains("2 eggs"));
        assert_eq!(
            content.image_url.as_deref(),
            Some("https://example.com/img/og.jpg")
        );
        assert_eq!(content.video_url, None);
    }

    #[test]
    fn test_website_without_jsonld() {
        let html = r#"<html><head>
            <title>Cake</title>
            <meta name="description" content="Easy cake">
        </head><body><nav>Menu</nav><p>Beat 2 eggs with sugar.</p></body></html>"#;

        let content = parse_website("https://example.com/cake", html);
        assert_eq!(content.description, "Cake\n\nEasy cake");
        assert_eq!(content.full_text.as_deref(), Some("Beat 2 eggs with sugar."));
        assert_eq!(content.image_url, None);
    }
}
