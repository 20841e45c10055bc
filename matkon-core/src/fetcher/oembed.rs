//! oEmbed endpoints and YouTube thumbnail resolution.

use serde::Deserialize;

use crate::error::FetchError;
use crate::types::Platform;

/// TikTok and YouTube publish public oEmbed APIs; Instagram and Facebook go
/// through noembed, which handles Meta's token requirement.
const OEMBED_ENDPOINTS: &[(Platform, &str)] = &[
    (Platform::Tiktok, "https://www.tiktok.com/oembed"),
    (Platform::Youtube, "https://www.youtube.com/oembed"),
    (Platform::Instagram, "https://noembed.com/embed"),
    (Platform::Facebook, "https://noembed.com/embed"),
];

pub fn oembed_endpoint(platform: Platform) -> Option<&'static str> {
    OEMBED_ENDPOINTS
        .iter()
        .find(|(p, _)| *p == platform)
        .map(|(_, endpoint)| *endpoint)
}

/// Build `{endpoint}?url=<encoded>&format=json`.
pub fn oembed_request_url(endpoint: &str, url: &str) -> Result<String, FetchError> {
    url::Url::parse_with_params(endpoint, &[("url", url), ("format", "json")])
        .map(|u| u.to_string())
        .map_err(|e| FetchError::InvalidUrl(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct OEmbedResponse {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// noembed answers 200 with an error field for unsupported or private posts.
    #[serde(default)]
    pub error: Option<String>,
}

impl OEmbedResponse {
    pub fn parse(body: &str) -> Result<Self, FetchError> {
        let response: OEmbedResponse = serde_json::from_str(body)
            .map_err(|e| FetchError::Parse(format!("invalid oEmbed response: {}", e)))?;
        if let Some(error) = response.error {
            return Err(FetchError::Parse(format!("oEmbed error: {}", error)));
        }
        Ok(response)
    }

    pub fn title(&self) -> Option<String> {
        non_blank(self.title.as_deref())
    }

    /// Title, else author name, else empty.
    pub fn description(&self) -> String {
        self.title()
            .or_else(|| non_blank(self.author_name.as_deref()))
            .unwrap_or_default()
    }

    pub fn thumbnail(&self) -> Option<String> {
        non_blank(self.thumbnail_url.as_deref())
    }
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Video id from `watch?v=ID`, `/shorts/ID`, or `youtu.be/ID`.
pub fn youtube_video_id(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();

    let id = if host.ends_with("youtu.be") {
        parsed.path_segments()?.next().map(str::to_string)
    } else if host.ends_with("youtube.com") {
        parsed
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
            .or_else(|| {
                let mut segments = parsed.path_segments()?;
                match segments.next() {
                    Some("shorts") => segments.next().map(str::to_string),
                    _ => None,
                }
            })
    } else {
        None
    };

    id.filter(|id| !id.is_empty())
}

/// (high resolution, always available) thumbnail URLs for a video id.
pub fn youtube_thumbnail_urls(video_id: &str) -> (String, String) {
    (
        format!("https://i.ytimg.com/vi/{}/maxresdefault.jpg", video_id),
        format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_table() {
        assert_eq!(
            oembed_endpoint(Platform::Tiktok),
            Some("https://www.tiktok.com/oembed")
        );
        assert_eq!(
            oembed_endpoint(Platform::Facebook),
            Some("https://noembed.com/embed")
        );
        assert_eq!(oembed_endpoint(Platform::Website), None);
        assert_eq!(oembed_endpoint(Platform::Upload), None);
    }

    #[test]
    fn test_request_url_encodes_target() {
        let url = oembed_request_url(
            "https://www.tiktok.com/oembed",
            "https://www.tiktok.com/@chef/video/1?lang=he",
        )
        .unwrap();
        assert_eq!(
            url,
            "https://www.tiktok.com/oembed?url=https%3A%2F%2Fwww.tiktok.com%2F%40chef%2Fvideo%2F1%3Flang%3Dhe&format=json"
        );
    }

    #[test]
    fn test_youtube_ids() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=abc123&t=10"),
            Some("abc123".to_string())
        );
        assert_eq!(
            youtube_video_id("https://youtube.com/shorts/xyz789?feature=share"),
            Some("xyz789".to_string())
        );
        assert_eq!(
            youtube_video_id("https://youtu.be/def456?si=q"),
            Some("def456".to_string())
        );
        assert_eq!(youtube_video_id("https://www.youtube.com/@chef"), None);
        assert_eq!(youtube_video_id("https://example.com/watch?v=abc"), None);
    }

    #[test]
    fn test_noembed_error_is_failure() {
        assert!(OEmbedResponse::parse(r#"{"error":"no matching providers found"}"#).is_err());
        assert!(OEmbedResponse::parse("<html>").is_err());
    }

    #[test]
    fn test_description_falls_back_to_author() {
        let r = OEmbedResponse::parse(r#"{"author_name":"chef","thumbnail_url":"https://t/x.jpg"}"#)
            .unwrap();
        assert_eq!(r.description(), "chef");
        assert_eq!(r.title(), None);
        assert_eq!(r.thumbnail().as_deref(), Some("https://t/x.jpg"));
    }
}
