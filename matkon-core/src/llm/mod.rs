//! Inference provider abstraction.
//!
//! The pipeline only needs one capability: given a prompt and optional
//! inline images, return the model's text. Providers are interchangeable
//! behind `LlmProvider`, and tests use `FakeProvider`.

mod claude;
mod fake;

pub use claude::ClaudeProvider;
pub use fake::FakeProvider;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Default model for the Claude provider.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Error type for LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// A base64-encoded image sent inline with a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub media_type: String,
    pub data: String,
}

/// One completion call: images first, then the prompt text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub images: Vec<ImageData>,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn text(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
            max_tokens,
        }
    }
}

/// Trait for LLM providers.
///
/// Implementations should be stateless and thread-safe. The provider is responsible
/// for making API calls and returning the model's text response.
#[async_trait]
pub trait LlmProvider: Send + Sync + fmt::Debug {
    /// Send a request to the model and get its text response.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Get the provider name (e.g., "claude", "fake").
    fn provider_name(&self) -> &'static str;

    /// Get the model name.
    fn model_name(&self) -> &str;
}

/// Build the configured provider.
///
/// Environment variables:
/// - `MATKON_LLM_PROVIDER`: "claude" (default) | "fake"
/// - `MATKON_LLM_MODEL`: model name (default: `DEFAULT_MODEL`)
/// - `ANTHROPIC_API_KEY`: API key for Claude
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, LlmError> {
    let provider = std::env::var("MATKON_LLM_PROVIDER").unwrap_or_else(|_| "claude".to_string());

    match provider.as_str() {
        "fake" => Ok(Box::new(FakeProvider::default())),
        "claude" => {
            let api_key = std::env::var("ANTHROPIC_API_KEY")
                .map_err(|_| LlmError::NotConfigured("ANTHROPIC_API_KEY not set".to_string()))?;
            let model =
                std::env::var("MATKON_LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
            Ok(Box::new(ClaudeProvider::new(api_key, model)))
        }
        other => Err(LlmError::NotConfigured(format!(
            "Unknown provider: {}",
            other
        ))),
    }
}
