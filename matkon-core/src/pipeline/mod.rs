//! Ingestion orchestrator.
//!
//! Turns a submitted URL or uploaded photos into a saved recipe:
//!
//! - upload: multimodal extraction from the photos
//! - website: fetch, then extract from the page text
//! - video post: fetch metadata, then run the strategy chain
//!   (frames, website scrape, hint text) until one yields a recipe
//!
//! Duplicate detection happens before any inference. Images are re-hosted
//! only after the recipe row exists, and image or ingredient failures after
//! that point never fail the ingestion.

mod migrate;
mod strategies;
mod strategy;

pub use migrate::{MigrationDetail, MigrationOutcome, MigrationReport};
pub use strategies::{FrameStrategy, HintTextStrategy, WebsiteScrapeStrategy};
pub use strategy::{
    run_strategies, ChainOutcome, ExtractionStrategy, StrategyContext, StrategyError,
    StrategyMetadata,
};

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::classify::classify;
use crate::error::StoreError;
use crate::extract::{normalize, RecipeExtractor};
use crate::fetcher::ContentFetcher;
use crate::frames::FrameExtractor;
use crate::http::HttpClient;
use crate::llm::{LlmError, LlmProvider};
use crate::media::{strip_data_url, MediaPersister};
use crate::retry::{with_retry, RetryPolicy};
use crate::storage::ObjectStorage;
use crate::store::RecipeStore;
use crate::types::{
    ExtractedRecipe, ExtractionMethod, ExtractionStatus, NewIngredient, NewRecipe, Platform,
    Recipe, FALLBACK_CATEGORY,
};

pub const MAX_UPLOAD_IMAGES: usize = 5;
/// Per-image limit, measured on the base64 text.
pub const MAX_IMAGE_BASE64_LEN: usize = 4 * 1024 * 1024;

pub(crate) const FETCH_ATTEMPTS: u32 = 3;
pub(crate) const TEXT_EXTRACT_ATTEMPTS: u32 = 3;
pub(crate) const MEDIA_EXTRACT_ATTEMPTS: u32 = 2;

const MIGRATION_PAUSE: Duration = Duration::from_millis(500);

/// A submission: a URL, or a list of base64 photos.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    Validation(String),

    #[error("Recipe already saved: {title}")]
    Duplicate { id: Uuid, title: String },

    #[error("No recipe found in this content")]
    NoRecipeFound,

    #[error("Content unreachable: {0}")]
    ContentUnreachable(String),

    #[error("Inference failed: {0}")]
    Inference(#[from] LlmError),

    #[error("Failed to save recipe: {0}")]
    Persistence(#[from] StoreError),
}

impl From<StrategyError> for IngestError {
    fn from(e: StrategyError) -> Self {
        match e {
            StrategyError::Inference(e) => IngestError::Inference(e),
            other => IngestError::ContentUnreachable(other.to_string()),
        }
    }
}

enum Submission {
    Url(String),
    Images(Vec<String>),
}

fn validate(request: IngestRequest) -> Result<Submission, IngestError> {
    let url = request.url.filter(|u| !u.trim().is_empty());
    let images = request.images.filter(|i| !i.is_empty());

    match (url, images) {
        (Some(_), Some(_)) => Err(IngestError::Validation(
            "Provide either a URL or images, not both".to_string(),
        )),
        (None, None) => Err(IngestError::Validation(
            "A URL or at least one image is required".to_string(),
        )),
        (Some(url), None) => Ok(Submission::Url(url)),
        (None, Some(images)) => {
            if images.len() > MAX_UPLOAD_IMAGES {
                return Err(IngestError::Validation(format!(
                    "At most {} images can be uploaded",
                    MAX_UPLOAD_IMAGES
                )));
            }
            for (i, image) in images.iter().enumerate() {
                let data = strip_data_url(image);
                if data.len() > MAX_IMAGE_BASE64_LEN {
                    return Err(IngestError::Validation(format!(
                        "Image {} is too large (max 4MB)",
                        i + 1
                    )));
                }
                if base64::engine::general_purpose::STANDARD.decode(data).is_err() {
                    return Err(IngestError::Validation(format!(
                        "Image {} is not valid base64",
                        i + 1
                    )));
                }
            }
            Ok(Submission::Images(images))
        }
    }
}

/// What an extraction produced, before anything is saved.
struct Extraction {
    recipe: ExtractedRecipe,
    platform: Platform,
    source_url: Option<String>,
    video_url: Option<String>,
    image_url: Option<String>,
    inline_thumbnail: Option<String>,
}

pub struct Ingestor {
    fetcher: Arc<ContentFetcher>,
    frames: Arc<dyn FrameExtractor>,
    extractor: Arc<RecipeExtractor>,
    media: MediaPersister,
    store: Arc<dyn RecipeStore>,
    retry: RetryPolicy,
    migration_pause: Duration,
}

impl Ingestor {
    pub fn new(
        client: Arc<dyn HttpClient>,
        provider: Arc<dyn LlmProvider>,
        frames: Arc<dyn FrameExtractor>,
        storage: Arc<dyn ObjectStorage>,
        store: Arc<dyn RecipeStore>,
    ) -> Self {
        Self {
            fetcher: Arc::new(ContentFetcher::new(client.clone())),
            frames,
            extractor: Arc::new(RecipeExtractor::new(provider)),
            media: MediaPersister::new(client, storage),
            store,
            retry: RetryPolicy::default(),
            migration_pause: MIGRATION_PAUSE,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_migration_pause(mut self, pause: Duration) -> Self {
        self.migration_pause = pause;
        self
    }

    pub fn fetcher(&self) -> &ContentFetcher {
        &self.fetcher
    }

    /// The ordered fallback chain for video posts.
    pub fn video_strategies(&self) -> Vec<Box<dyn ExtractionStrategy>> {
        vec![
            Box::new(FrameStrategy::new(
                self.frames.clone(),
                self.extractor.clone(),
                self.retry,
            )),
            Box::new(WebsiteScrapeStrategy::new(
                self.fetcher.clone(),
                self.extractor.clone(),
                self.retry,
            )),
            Box::new(HintTextStrategy::new(self.extractor.clone(), self.retry)),
        ]
    }

    pub async fn ingest(&self, user_id: Uuid, request: IngestRequest) -> Result<Recipe, IngestError> {
        let submission = validate(request)?;
        let kind = match &submission {
            Submission::Url(_) => "url",
            Submission::Images(_) => "upload",
        };

        async {
            let extraction = match submission {
                Submission::Images(images) => self.extract_upload(images).await?,
                Submission::Url(url) => self.extract_url(user_id, &url).await?,
            };
            self.save(user_id, extraction).await
        }
        .instrument(info_span!("ingest", %user_id, kind))
        .await
    }

    async fn extract_upload(&self, images: Vec<String>) -> Result<Extraction, IngestError> {
        let recipe = with_retry(self.retry, MEDIA_EXTRACT_ATTEMPTS, || {
            self.extractor.extract_from_media(&images, None)
        })
        .await?
        .ok_or(IngestError::NoRecipeFound)?;

        Ok(Extraction {
            recipe,
            platform: Platform::Upload,
            source_url: None,
            video_url: None,
            image_url: None,
            inline_thumbnail: images.into_iter().next(),
        })
    }

    async fn extract_url(&self, user_id: Uuid, raw_url: &str) -> Result<Extraction, IngestError> {
        let classification =
            classify(raw_url).map_err(|e| IngestError::Validation(e.to_string()))?;
        let url = classification.url;
        let platform = classification.platform;

        if let Some(existing) = self.store.find_by_source_url(user_id, &url).await? {
            tracing::info!(%url, existing_id = %existing.id, "recipe already saved");
            return Err(IngestError::Duplicate {
                id: existing.id,
                title: existing.title,
            });
        }

        let content = with_retry(self.retry, FETCH_ATTEMPTS, || self.fetcher.fetch(&url, platform))
            .await
            .map_err(|e| {
                tracing::warn!(%url, %platform, error = %e, "content unreachable");
                IngestError::ContentUnreachable(e.to_string())
            })?;
        tracing::info!(%url, %platform, method = ?classification.method, "content fetched");

        match classification.method {
            ExtractionMethod::Text => {
                let text = content.best_text();
                let recipe = with_retry(self.retry, TEXT_EXTRACT_ATTEMPTS, || {
                    self.extractor.extract_from_text(text)
                })
                .await?
                .ok_or(IngestError::NoRecipeFound)?;

                Ok(Extraction {
                    recipe,
                    platform,
                    source_url: Some(url),
                    video_url: content.video_url,
                    image_url: content.image_url,
                    inline_thumbnail: None,
                })
            }
            ExtractionMethod::Video => {
                let mut ctx = StrategyContext {
                    url: url.clone(),
                    hint: content.text_hint(),
                    image_url: content.image_url.clone(),
                    inline_thumbnail: None,
                };

                let recipe = match run_strategies(&self.video_strategies(), &mut ctx).await {
                    ChainOutcome::Found { recipe, strategy } => {
                        tracing::info!(%url, strategy, "video recipe extracted");
                        recipe
                    }
                    ChainOutcome::NoRecipe => return Err(IngestError::NoRecipeFound),
                    ChainOutcome::Failed(e) => return Err(e.into()),
                };

                Ok(Extraction {
                    recipe,
                    platform,
                    source_url: Some(url),
                    video_url: content.video_url,
                    image_url: ctx.image_url,
                    inline_thumbnail: ctx.inline_thumbnail,
                })
            }
        }
    }

    async fn save(&self, user_id: Uuid, extraction: Extraction) -> Result<Recipe, IngestError> {
        let Extraction {
            recipe: extracted,
            platform,
            source_url,
            video_url,
            image_url,
            inline_thumbnail,
        } = extraction;

        let mut categories = extracted.categories.clone();
        if categories.is_empty() {
            categories.push(FALLBACK_CATEGORY.to_string());
        }

        let new_recipe = NewRecipe {
            user_id,
            title: extracted.title.clone(),
            source_url,
            source_platform: platform,
            video_embed_url: video_url,
            categories,
            extraction_status: ExtractionStatus::for_recipe(&extracted),
            steps: extracted.steps.clone(),
            image_url: image_url.clone(),
        };

        let mut recipe = self.store.insert_recipe(&new_recipe).await.map_err(|e| {
            tracing::error!(%user_id, error = %e, "failed to insert recipe");
            IngestError::Persistence(e)
        })?;
        tracing::info!(recipe_id = %recipe.id, status = recipe.extraction_status.as_str(), "recipe saved");

        let stored_image = match (inline_thumbnail, image_url) {
            (Some(inline), _) => self.media.persist_inline(&inline, recipe.id).await,
            (None, Some(remote)) => self.media.persist(&remote, recipe.id).await,
            (None, None) => None,
        };
        if let Some(stored) = stored_image {
            if recipe.image_url.as_deref() != Some(stored.as_str()) {
                match self.store.update_image_url(recipe.id, &stored).await {
                    Ok(()) => recipe.image_url = Some(stored),
                    Err(e) => {
                        tracing::warn!(recipe_id = %recipe.id, error = %e, "failed to record stored image")
                    }
                }
            }
        }

        let ingredients: Vec<NewIngredient> = extracted
            .ingredients
            .into_iter()
            .map(|ing| NewIngredient {
                canonical_name: normalize(&ing.name),
                name: ing.name,
                quantity: ing.quantity,
                unit: ing.unit,
            })
            .collect();
        if !ingredients.is_empty() {
            match self.store.insert_ingredients(recipe.id, &ingredients).await {
                Ok(()) => recipe.ingredients = ingredients,
                Err(e) => {
                    tracing::error!(recipe_id = %recipe.id, error = %e, "failed to store ingredients")
                }
            }
        }

        Ok(recipe)
    }
}
