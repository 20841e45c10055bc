//! The video fallback chain: frames, then the post page as a website, then
//! the post's own title and description.

use std::sync::Arc;

use async_trait::async_trait;

use crate::extract::RecipeExtractor;
use crate::fetcher::ContentFetcher;
use crate::frames::FrameExtractor;
use crate::retry::{with_retry, RetryPolicy};
use crate::types::{ExtractedRecipe, Platform};

use super::strategy::{ExtractionStrategy, StrategyContext, StrategyError, StrategyMetadata};
use super::{FETCH_ATTEMPTS, MEDIA_EXTRACT_ATTEMPTS, TEXT_EXTRACT_ATTEMPTS};

pub struct FrameStrategy {
    frames: Arc<dyn FrameExtractor>,
    extractor: Arc<RecipeExtractor>,
    retry: RetryPolicy,
}

impl FrameStrategy {
    pub fn new(
        frames: Arc<dyn FrameExtractor>,
        extractor: Arc<RecipeExtractor>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            frames,
            extractor,
            retry,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for FrameStrategy {
    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "frames",
            description: "Extract still frames from the video and read them multimodally",
        }
    }

    async fn attempt(
        &self,
        ctx: &mut StrategyContext,
    ) -> Result<Option<ExtractedRecipe>, StrategyError> {
        let extracted = self.frames.extract_frames(&ctx.url).await?;
        if let Some(thumbnail) = extracted.thumbnail {
            ctx.inline_thumbnail = Some(thumbnail);
        }

        let hint = ctx.hint.as_deref();
        let recipe = with_retry(self.retry, MEDIA_EXTRACT_ATTEMPTS, || {
            self.extractor.extract_from_media(&extracted.frames, hint)
        })
        .await?;
        Ok(recipe)
    }
}

pub struct WebsiteScrapeStrategy {
    fetcher: Arc<ContentFetcher>,
    extractor: Arc<RecipeExtractor>,
    retry: RetryPolicy,
}

impl WebsiteScrapeStrategy {
    pub fn new(
        fetcher: Arc<ContentFetcher>,
        extractor: Arc<RecipeExtractor>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            retry,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for WebsiteScrapeStrategy {
    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "website_scrape",
            description: "Scrape the post page as a website; descriptions often hold the full recipe",
        }
    }

    async fn attempt(
        &self,
        ctx: &mut StrategyContext,
    ) -> Result<Option<ExtractedRecipe>, StrategyError> {
        let url = ctx.url.clone();
        let content = with_retry(self.retry, FETCH_ATTEMPTS, || {
            self.fetcher.fetch(&url, Platform::Website)
        })
        .await?;
        ctx.adopt_image(content.image_url.clone());

        let text = content.best_text().trim();
        if text.is_empty() {
            tracing::debug!(url = %ctx.url, "scraped page has no text");
            return Ok(None);
        }

        let recipe = with_retry(self.retry, TEXT_EXTRACT_ATTEMPTS, || {
            self.extractor.extract_from_text(text)
        })
        .await?;
        Ok(recipe)
    }
}

pub struct HintTextStrategy {
    extractor: Arc<RecipeExtractor>,
    retry: RetryPolicy,
}

impl HintTextStrategy {
    pub fn new(extractor: Arc<RecipeExtractor>, retry: RetryPolicy) -> Self {
        Self { extractor, retry }
    }
}

#[async_trait]
impl ExtractionStrategy for HintTextStrategy {
    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "hint_text",
            description: "Extract from the post title and description",
        }
    }

    async fn attempt(
        &self,
        ctx: &mut StrategyContext,
    ) -> Result<Option<ExtractedRecipe>, StrategyError> {
        let Some(hint) = ctx.hint.as_deref().map(str::trim).filter(|h| !h.is_empty()) else {
            return Ok(None);
        };

        let recipe = with_retry(self.retry, TEXT_EXTRACT_ATTEMPTS, || {
            self.extractor.extract_from_text(hint)
        })
        .await?;
        Ok(recipe)
    }
}
