//! HTTP client trait and implementations.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::FetchError;

use super::BROWSER_USER_AGENT;

/// Request timeout used unless the caller sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Binary response body plus the content type the server declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBytes {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

/// Trait for HTTP clients, enabling mockability in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET a URL and return the body as text. Non-2xx responses are errors.
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;

    /// GET a URL and return the raw body. Non-2xx responses are errors.
    async fn fetch_bytes(&self, url: &str) -> Result<FetchedBytes, FetchError>;

    /// HEAD a URL and report whether it answered with a 2xx status.
    async fn exists(&self, url: &str) -> bool;
}

/// Configuration for WebClient.
#[derive(Clone)]
pub struct WebClientBuilder {
    timeout: Duration,
    user_agent: String,
}

impl Default for WebClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WebClientBuilder {
    /// Create a new builder with [`DEFAULT_TIMEOUT`] and a browser user agent.
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Build the WebClient.
    pub fn build(self) -> Result<WebClient, reqwest::Error> {
        let inner = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(WebClient { inner })
    }
}

/// Production HTTP client backed by reqwest.
pub struct WebClient {
    inner: reqwest::Client,
}

impl WebClient {
    /// Create a new WebClient with default configuration.
    pub fn new() -> Result<Self, reqwest::Error> {
        WebClientBuilder::new().build()
    }

    /// Get a builder for custom configuration.
    pub fn builder() -> WebClientBuilder {
        WebClientBuilder::new()
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        tracing::debug!(url, "network: fetching");
        let response = self.inner.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url, status = %status, "network: request failed");
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        tracing::debug!(url, status = %status, "network: fetched successfully");
        Ok(response)
    }
}

#[async_trait]
impl HttpClient for WebClient {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get(url).await?;
        response
            .text()
            .await
            .map_err(|e| FetchError::InvalidEncoding(e.to_string()))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<FetchedBytes, FetchError> {
        let response = self.get(url).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let data = response.bytes().await?.to_vec();
        Ok(FetchedBytes { data, content_type })
    }

    async fn exists(&self, url: &str) -> bool {
        match self.inner.head(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(url, error = %e, "network: HEAD failed");
                false
            }
        }
    }
}

/// Mock response for testing.
#[derive(Clone)]
pub enum MockResponse {
    Text(String),
    Bytes {
        data: Vec<u8>,
        content_type: Option<String>,
    },
    Status(u16),
    Error(String),
}

/// Mock HTTP client for testing.
///
/// Responses are keyed by exact URL. Every request is counted so tests can
/// assert that a URL was (or was not) hit.
pub struct MockClient {
    responses: HashMap<String, MockResponse>,
    existing: Vec<String>,
    requests: Mutex<HashMap<String, usize>>,
}

impl MockClient {
    /// Create a new empty mock client.
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            existing: Vec::new(),
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Add a response for a URL.
    pub fn with_response(mut self, url: &str, response: MockResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    /// Add a text/HTML response for a URL.
    pub fn with_text(self, url: &str, body: &str) -> Self {
        self.with_response(url, MockResponse::Text(body.to_string()))
    }

    /// Add a bytes response for a URL.
    pub fn with_bytes(self, url: &str, data: Vec<u8>, content_type: Option<&str>) -> Self {
        self.with_response(
            url,
            MockResponse::Bytes {
                data,
                content_type: content_type.map(|s| s.to_string()),
            },
        )
    }

    /// Respond to a URL with a non-2xx status.
    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.with_response(url, MockResponse::Status(status))
    }

    /// Add a transport error for a URL.
    pub fn with_error(self, url: &str, error: &str) -> Self {
        self.with_response(url, MockResponse::Error(error.to_string()))
    }

    /// Make HEAD requests to this URL succeed.
    pub fn with_existing(mut self, url: &str) -> Self {
        self.existing.push(url.to_string());
        self
    }

    /// Number of GET and HEAD requests made for a URL.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    /// Total number of requests made.
    pub fn total_requests(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .sum()
    }

    fn record(&self, url: &str) {
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        *requests.entry(url.to_string()).or_insert(0) += 1;
    }

    fn lookup(&self, url: &str) -> Result<FetchedBytes, FetchError> {
        self.record(url);
        match self.responses.get(url) {
            Some(MockResponse::Text(body)) => Ok(FetchedBytes {
                data: body.as_bytes().to_vec(),
                content_type: Some("text/html".to_string()),
            }),
            Some(MockResponse::Bytes { data, content_type }) => Ok(FetchedBytes {
                data: data.clone(),
                content_type: content_type.clone(),
            }),
            Some(MockResponse::Status(status)) => Err(FetchError::HttpStatus(*status)),
            Some(MockResponse::Error(e)) => Err(FetchError::InvalidUrl(e.clone())),
            None => Err(FetchError::InvalidUrl(format!(
                "No mock response for URL: {}",
                url
            ))),
        }
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let fetched = self.lookup(url)?;
        String::from_utf8(fetched.data).map_err(|e| FetchError::InvalidEncoding(e.to_string()))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<FetchedBytes, FetchError> {
        self.lookup(url)
    }

    async fn exists(&self, url: &str) -> bool {
        self.record(url);
        self.existing.iter().any(|u| u == url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_do_not_read_env() {
        let builder = WebClientBuilder::new();
        assert_eq!(builder.timeout, DEFAULT_TIMEOUT);
        assert_eq!(builder.user_agent, BROWSER_USER_AGENT);

        let builder = builder.timeout(Duration::from_secs(5));
        assert_eq!(builder.timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_mock_client_counts_requests() {
        let client = MockClient::new()
            .with_text("https://example.com/a", "<html></html>")
            .with_status("https://example.com/b", 404);

        assert!(client.fetch_text("https://example.com/a").await.is_ok());
        assert!(matches!(
            client.fetch_text("https://example.com/b").await,
            Err(FetchError::HttpStatus(404))
        ));
        assert!(client.fetch_text("https://example.com/c").await.is_err());

        assert_eq!(client.request_count("https://example.com/a"), 1);
        assert_eq!(client.request_count("https://example.com/b"), 1);
        assert_eq!(client.total_requests(), 3);
    }

    #[tokio::test]
    async fn test_mock_client_head() {
        let client = MockClient::new().with_existing("https://img.example.com/a.jpg");
        assert!(client.exists("https://img.example.com/a.jpg").await);
        assert!(!client.exists("https://img.example.com/b.jpg").await);
    }

    #[tokio::test]
    async fn test_mock_client_bytes_keep_content_type() {
        let client =
            MockClient::new().with_bytes("https://img.example.com/a", vec![1, 2, 3], Some("image/png"));
        let fetched = client.fetch_bytes("https://img.example.com/a").await.unwrap();
        assert_eq!(fetched.data, vec![1, 2, 3]);
        assert_eq!(fetched.content_type.as_deref(), Some("image/png"));
    }
}
