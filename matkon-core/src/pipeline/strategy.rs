//! Extraction strategies for video posts and the executor that runs them.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info_span, Instrument};

use crate::error::FetchError;
use crate::frames::FrameError;
use crate::llm::LlmError;
use crate::types::ExtractedRecipe;

/// Metadata about a strategy.
#[derive(Debug, Clone)]
pub struct StrategyMetadata {
    /// Unique identifier (e.g., "frames", "website_scrape")
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
}

/// State shared by the strategies of one ingestion. Strategies may fill in
/// an image they discover; earlier values are never overwritten.
#[derive(Debug, Clone, Default)]
pub struct StrategyContext {
    pub url: String,
    /// Title and description of the post, if any.
    pub hint: Option<String>,
    /// Remote image URL to persist after the recipe is saved.
    pub image_url: Option<String>,
    /// Inline base64 image to persist, preferred over `image_url`.
    pub inline_thumbnail: Option<String>,
}

impl StrategyContext {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn adopt_image(&mut self, image_url: Option<String>) {
        if self.image_url.is_none() {
            self.image_url = image_url;
        }
    }
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Frames(#[from] FrameError),

    #[error(transparent)]
    Inference(#[from] LlmError),
}

#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn metadata(&self) -> StrategyMetadata;

    /// `Ok(None)` when the strategy ran (or had nothing to work with) but
    /// found no recipe.
    async fn attempt(
        &self,
        ctx: &mut StrategyContext,
    ) -> Result<Option<ExtractedRecipe>, StrategyError>;
}

#[derive(Debug)]
pub enum ChainOutcome {
    Found {
        recipe: ExtractedRecipe,
        strategy: &'static str,
    },
    /// At least one strategy ran cleanly and none found a recipe.
    NoRecipe,
    /// Every strategy failed; carries the last error.
    Failed(StrategyError),
}

/// Run strategies in order until one yields a recipe.
pub async fn run_strategies(
    strategies: &[Box<dyn ExtractionStrategy>],
    ctx: &mut StrategyContext,
) -> ChainOutcome {
    let mut last_error = None;
    let mut ran_cleanly = false;

    for strategy in strategies {
        let meta = strategy.metadata();
        let result = strategy
            .attempt(ctx)
            .instrument(info_span!("strategy", strategy = meta.name))
            .await;

        match result {
            Ok(Some(recipe)) => {
                tracing::info!(strategy = meta.name, title = %recipe.title, "strategy found recipe");
                return ChainOutcome::Found {
                    recipe,
                    strategy: meta.name,
                };
            }
            Ok(None) => {
                tracing::info!(strategy = meta.name, "strategy found no recipe, trying next");
                ran_cleanly = true;
            }
            Err(e) => {
                tracing::warn!(strategy = meta.name, error = %e, "strategy failed, trying next");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if !ran_cleanly => ChainOutcome::Failed(e),
        _ => ChainOutcome::NoRecipe,
    }
}
