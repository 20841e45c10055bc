//! Fake LLM provider for testing.
//!
//! This provider returns deterministic responses based on prompt matching,
//! allowing tests to run without network access or API costs.

use super::{CompletionRequest, LlmError, LlmProvider};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A fake LLM provider for testing.
///
/// Responses are matched by checking if the prompt contains a registered
/// substring, in registration order. Requests carrying images can be routed
/// separately with `with_media_response`. A number of leading calls can be
/// made to fail to exercise retry paths.
#[derive(Debug)]
pub struct FakeProvider {
    responses: Mutex<Vec<(String, String)>>,
    media_response: Option<String>,
    default_response: Option<String>,
    failures_remaining: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            media_response: None,
            default_response: Some(r#"{"error":"no_recipe"}"#.to_string()),
            failures_remaining: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl FakeProvider {
    /// Create a new FakeProvider with no registered responses.
    pub fn new() -> Self {
        Self {
            default_response: None,
            ..Self::default()
        }
    }

    /// Create a FakeProvider that returns a specific response for prompts containing a substring.
    pub fn with_response(prompt_contains: &str, response: &str) -> Self {
        let provider = Self::new();
        provider.add_response(prompt_contains, response);
        provider
    }

    /// Add a response for prompts containing a specific substring.
    pub fn add_response(&self, prompt_contains: &str, response: &str) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((prompt_contains.to_lowercase(), response.to_string()));
    }

    /// Response for any request that carries images.
    pub fn with_media_response(mut self, response: &str) -> Self {
        self.media_response = Some(response.to_string());
        self
    }

    /// Set the default response when no pattern matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Fail the next `n` calls with a request error.
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Number of completion calls made, including failed ones.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(LlmError::RequestFailed(
                "FakeProvider: scripted failure".to_string(),
            ));
        }

        if !request.images.is_empty() {
            if let Some(response) = &self.media_response {
                return Ok(response.clone());
            }
        }

        let prompt_lower = request.prompt.to_lowercase();
        let responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((_, response)) = responses
            .iter()
            .find(|(pattern, _)| prompt_lower.contains(pattern.as_str()))
        {
            return Ok(response.clone());
        }

        match &self.default_response {
            Some(response) => Ok(response.clone()),
            None => Err(LlmError::RequestFailed(format!(
                "FakeProvider: No response configured for prompt (first 100 chars): {}",
                request.prompt.chars().take(100).collect::<String>()
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
