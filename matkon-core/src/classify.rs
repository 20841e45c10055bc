//! URL classification: which platform a submitted link belongs to and how
//! its content should be extracted.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ClassifyError;
use crate::types::{ExtractionMethod, Platform, UrlClassification};

/// Ordered platform pattern table. First match wins.
static PLATFORM_PATTERNS: LazyLock<Vec<(Platform, Vec<Regex>)>> = LazyLock::new(|| {
    let table: &[(Platform, &[&str])] = &[
        (
            Platform::Instagram,
            &[
                r"(?i)^https?://(www\.)?instagram\.com/(reels?|p)/.+",
                r"(?i)^https?://(www\.)?instagram\.com/stories/.+",
            ],
        ),
        (
            Platform::Tiktok,
            &[
                r"(?i)^https?://(www\.)?tiktok\.com/@[^/]+/video/.+",
                r"(?i)^https?://vm\.tiktok\.com/.+",
            ],
        ),
        (
            Platform::Facebook,
            &[
                r"(?i)^https?://(www\.|m\.)?facebook\.com/.+/videos/.+",
                r"(?i)^https?://fb\.watch/.+",
                r"(?i)^https?://(www\.|m\.)?facebook\.com/reel/.+",
                r"(?i)^https?://(www\.|m\.)?facebook\.com/share/(r|v)/.+",
            ],
        ),
        (
            Platform::Youtube,
            &[
                r"(?i)^https?://(www\.|m\.)?youtube\.com/shorts/.+",
                r"(?i)^https?://(www\.|m\.)?youtube\.com/watch\?(.*&)?v=.+",
                r"(?i)^https?://youtu\.be/.+",
            ],
        ),
    ];

    table
        .iter()
        .map(|(platform, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("Invalid platform regex"))
                .collect();
            (*platform, compiled)
        })
        .collect()
});

/// Classify a raw user-supplied URL.
///
/// Any well-formed http(s) URL that matches no social platform is treated as
/// a scrapeable website.
pub fn classify(raw_url: &str) -> Result<UrlClassification, ClassifyError> {
    let trimmed = raw_url.trim();

    let parsed =
        url::Url::parse(trimmed).map_err(|e| ClassifyError::InvalidUrl(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClassifyError::InvalidUrl(format!(
            "unsupported scheme: {}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none() {
        return Err(ClassifyError::InvalidUrl("missing host".to_string()));
    }

    let platform = PLATFORM_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(trimmed)))
        .map(|(platform, _)| *platform);

    Ok(match platform {
        Some(platform) => UrlClassification {
            platform,
            method: ExtractionMethod::Video,
            url: trimmed.to_string(),
        },
        None => UrlClassification {
            platform: Platform::Website,
            method: ExtractionMethod::Text,
            url: trimmed.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform_of(url: &str) -> Platform {
        classify(url).unwrap().platform
    }

    #[test]
    fn test_tiktok_video() {
        let c = classify("https://www.tiktok.com/@chef/video/123").unwrap();
        assert_eq!(c.platform, Platform::Tiktok);
        assert_eq!(c.method, ExtractionMethod::Video);
    }

    #[test]
    fn test_generic_website() {
        let c = classify("https://example.com/recipe").unwrap();
        assert_eq!(c.platform, Platform::Website);
        assert_eq!(c.method, ExtractionMethod::Text);
    }

    #[test]
    fn test_not_a_url() {
        assert!(matches!(
            classify("not a url"),
            Err(ClassifyError::InvalidUrl(_))
        ));
        assert!(classify("").is_err());
        assert!(classify("ftp://example.com/file").is_err());
    }

    #[test]
    fn test_all_platform_forms() {
        let cases = [
            ("https://www.instagram.com/reel/Cxyz123/", Platform::Instagram),
            ("https://instagram.com/reels/Cxyz123/", Platform::Instagram),
            ("https://www.instagram.com/p/Cabc/", Platform::Instagram),
            ("https://www.instagram.com/stories/chef/123/", Platform::Instagram),
            ("https://vm.tiktok.com/ZMabc/", Platform::Tiktok),
            ("https://www.facebook.com/chef/videos/987/", Platform::Facebook),
            ("https://fb.watch/abc123/", Platform::Facebook),
            ("https://www.facebook.com/reel/555", Platform::Facebook),
            ("https://www.facebook.com/share/r/xyz/", Platform::Facebook),
            ("https://www.facebook.com/share/v/xyz/", Platform::Facebook),
            ("https://www.youtube.com/shorts/abc", Platform::Youtube),
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", Platform::Youtube),
            ("https://youtu.be/dQw4w9WgXcQ", Platform::Youtube),
        ];
        for (url, expected) in cases {
            let c = classify(url).unwrap();
            assert_eq!(c.platform, expected, "url: {}", url);
            assert_eq!(c.method, ExtractionMethod::Video, "url: {}", url);
        }
    }

    #[test]
    fn test_patterns_are_case_insensitive_and_trimmed() {
        let c = classify("  HTTPS://WWW.TIKTOK.COM/@Chef/video/1  ").unwrap();
        assert_eq!(c.platform, Platform::Tiktok);
        assert_eq!(c.url, "HTTPS://WWW.TIKTOK.COM/@Chef/video/1");
    }

    #[test]
    fn test_platform_home_pages_are_websites() {
        assert_eq!(platform_of("https://www.instagram.com/"), Platform::Website);
        assert_eq!(platform_of("https://www.youtube.com/@chef"), Platform::Website);
        assert_eq!(platform_of("https://www.facebook.com/chef"), Platform::Website);
    }

    #[test]
    fn test_watch_with_other_params_first() {
        assert_eq!(
            platform_of("https://www.youtube.com/watch?feature=share&v=abc"),
            Platform::Youtube
        );
    }
}
