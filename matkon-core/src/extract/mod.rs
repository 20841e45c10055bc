//! Recipe extraction: text or images in, structured recipe out.
//!
//! `Ok(None)` means the model answered but there was no usable recipe
//! (sentinel or malformed output). Transport and provider errors are
//! returned as `Err` so the caller can retry them.

mod normalize;
mod parse;
pub mod prompts;

pub use normalize::normalize;
pub use parse::{decode_inference, filter_categories, find_json_object, InferenceOutcome};

use std::sync::Arc;

use base64::Engine;

use crate::llm::{CompletionRequest, ImageData, LlmError, LlmProvider};
use crate::media::{sniff_media_type, strip_data_url, DEFAULT_MEDIA_TYPE};
use crate::types::ExtractedRecipe;
use prompts::{
    render_media_extract_prompt, render_text_extract_prompt, MEDIA_EXTRACT_PROMPT_NAME,
    TEXT_EXTRACT_PROMPT_NAME,
};

pub const MAX_TOKENS: u32 = 2048;

#[derive(Debug, Clone)]
pub struct RecipeExtractor {
    provider: Arc<dyn LlmProvider>,
}

impl RecipeExtractor {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub async fn extract_from_text(&self, text: &str) -> Result<Option<ExtractedRecipe>, LlmError> {
        let request = CompletionRequest::text(render_text_extract_prompt(text), MAX_TOKENS);
        let response = self.provider.complete(&request).await?;
        Ok(self.interpret(TEXT_EXTRACT_PROMPT_NAME, &response))
    }

    /// Images are base64 strings, optionally with a `data:` URL prefix.
    pub async fn extract_from_media(
        &self,
        images: &[String],
        hint: Option<&str>,
    ) -> Result<Option<ExtractedRecipe>, LlmError> {
        let request = CompletionRequest {
            prompt: render_media_extract_prompt(hint),
            images: images.iter().map(|image| image_data(image)).collect(),
            max_tokens: MAX_TOKENS,
        };

        tracing::info!(
            images = request.images.len(),
            provider = self.provider.provider_name(),
            "sending images for multimodal extraction"
        );
        let response = self.provider.complete(&request).await?;
        Ok(self.interpret(MEDIA_EXTRACT_PROMPT_NAME, &response))
    }

    fn interpret(&self, prompt_name: &str, response: &str) -> Option<ExtractedRecipe> {
        match decode_inference(response) {
            InferenceOutcome::RecipeFound(recipe) => {
                tracing::debug!(
                    prompt = prompt_name,
                    model = self.provider.model_name(),
                    ingredients = recipe.ingredients.len(),
                    steps = recipe.steps.len(),
                    "recipe extracted"
                );
                Some(recipe)
            }
            InferenceOutcome::NotFound => {
                tracing::info!(prompt = prompt_name, "model reported no recipe");
                None
            }
            InferenceOutcome::Malformed(reason) => {
                tracing::warn!(
                    prompt = prompt_name,
                    reason = %reason,
                    response = %response.chars().take(300).collect::<String>(),
                    "discarding malformed model output"
                );
                None
            }
        }
    }
}

/// Build an inline image, sniffing the media type from the decoded bytes.
fn image_data(encoded: &str) -> ImageData {
    let data = strip_data_url(encoded);
    let media_type = base64::engine::general_purpose::STANDARD
        .decode(data)
        .ok()
        .and_then(|bytes| sniff_media_type(&bytes))
        .unwrap_or(DEFAULT_MEDIA_TYPE);

    ImageData {
        media_type: media_type.to_string(),
        data: data.to_string(),
    }
}
