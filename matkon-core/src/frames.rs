//! Client for the remote video frame extraction service.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_FRAMES: u32 = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame extractor not configured")]
    NotConfigured,

    #[error("Frame extraction request failed: {0}")]
    Request(String),

    #[error("Frame extraction failed ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("Invalid frame extraction response: {0}")]
    Decode(String),
}

/// Still frames from a video, base64 encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExtractedFrames {
    #[serde(default)]
    pub frames: Vec<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[async_trait]
pub trait FrameExtractor: Send + Sync {
    async fn extract_frames(&self, video_url: &str) -> Result<ExtractedFrames, FrameError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractFramesRequest<'a> {
    url: &'a str,
    max_frames: u32,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    error: Option<String>,
}

pub struct HttpFrameExtractor {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpFrameExtractor {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, FrameError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FrameError::Request(e.to_string()))?;

        Ok(Self {
            endpoint: format!("{}/api/extract-frames", base_url.trim_end_matches('/')),
            api_key,
            client,
        })
    }

    /// Environment variables:
    /// - `FRAME_EXTRACTOR_URL`: service base URL
    /// - `FRAME_EXTRACTOR_API_KEY`: value for the `x-api-key` header
    /// - `FRAME_EXTRACTOR_TIMEOUT_SECS`: whole-request timeout (default 180)
    ///
    /// Returns `Ok(None)` unless both URL and key are set.
    pub fn from_env() -> Result<Option<Self>, FrameError> {
        let (Ok(base_url), Ok(api_key)) = (
            std::env::var("FRAME_EXTRACTOR_URL"),
            std::env::var("FRAME_EXTRACTOR_API_KEY"),
        ) else {
            return Ok(None);
        };
        let timeout_secs = std::env::var("FRAME_EXTRACTOR_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(&base_url, api_key, Duration::from_secs(timeout_secs)).map(Some)
    }
}

#[async_trait]
impl FrameExtractor for HttpFrameExtractor {
    async fn extract_frames(&self, video_url: &str) -> Result<ExtractedFrames, FrameError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(&ExtractFramesRequest {
                url: video_url,
                max_frames: MAX_FRAMES,
            })
            .send()
            .await
            .map_err(|e| FrameError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FrameError::Request(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ServiceError>(&body)
                .ok()
                .and_then(|e| e.error)
                .unwrap_or_else(|| format!("frame extraction failed ({})", status.as_u16()));
            return Err(FrameError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let frames = parse_frames_response(&body)?;
        tracing::debug!(
            video_url,
            frames = frames.frames.len(),
            has_thumbnail = frames.thumbnail.is_some(),
            "frames extracted"
        );
        Ok(frames)
    }
}

/// A response with no frames is an error: there is nothing to extract from.
fn parse_frames_response(body: &str) -> Result<ExtractedFrames, FrameError> {
    let frames: ExtractedFrames =
        serde_json::from_str(body).map_err(|e| FrameError::Decode(e.to_string()))?;
    if frames.frames.is_empty() {
        return Err(FrameError::Decode("response contained no frames".to_string()));
    }
    Ok(frames)
}

/// Used when no service is configured; every call fails so the pipeline
/// falls through to its next strategy.
#[derive(Debug, Default)]
pub struct DisabledFrameExtractor;

#[async_trait]
impl FrameExtractor for DisabledFrameExtractor {
    async fn extract_frames(&self, _video_url: &str) -> Result<ExtractedFrames, FrameError> {
        Err(FrameError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(ExtractFramesRequest {
            url: "https://www.tiktok.com/@a/video/1",
            max_frames: MAX_FRAMES,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"url": "https://www.tiktok.com/@a/video/1", "maxFrames": 5})
        );
    }

    #[test]
    fn test_parse_frames_response() {
        let frames = parse_frames_response(r#"{"frames":["AAA","BBB"],"thumbnail":"CCC"}"#).unwrap();
        assert_eq!(frames.frames.len(), 2);
        assert_eq!(frames.thumbnail.as_deref(), Some("CCC"));

        assert!(matches!(
            parse_frames_response(r#"{"frames":[]}"#),
            Err(FrameError::Decode(_))
        ));
        assert!(matches!(
            parse_frames_response("<html>"),
            Err(FrameError::Decode(_))
        ));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let extractor =
            HttpFrameExtractor::new("https://frames.example.com/", "k".to_string(), Duration::from_secs(1))
                .unwrap();
        assert_eq!(extractor.endpoint, "https://frames.example.com/api/extract-frames");
    }

    #[tokio::test]
    async fn test_disabled_always_fails() {
        assert!(matches!(
            DisabledFrameExtractor.extract_frames("https://youtu.be/x").await,
            Err(FrameError::NotConfigured)
        ));
    }
}
