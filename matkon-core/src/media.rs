//! Copying recipe images into permanent storage.
//!
//! Third-party image URLs (social CDNs especially) expire, so every image a
//! recipe keeps is re-hosted under `{recipe_id}.{ext}`. Failures here never
//! fail an ingestion; callers get `None` and keep whatever they had.

use std::sync::Arc;

use base64::Engine;
use image::ImageFormat;
use uuid::Uuid;

use crate::http::HttpClient;
use crate::storage::ObjectStorage;

pub const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

/// File extension for a content type; parameters are ignored.
pub fn extension_for_content_type(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    match essence.as_deref() {
        Some("image/png") => "png",
        Some("image/webp") => "webp",
        Some("image/gif") => "gif",
        Some("image/avif") => "avif",
        _ => "jpg",
    }
}

/// Media type of image bytes, from their magic number.
pub fn sniff_media_type(data: &[u8]) -> Option<&'static str> {
    match image::guess_format(data).ok()? {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Avif => Some("image/avif"),
        _ => None,
    }
}

/// Strip a `data:<type>;base64,` prefix if present.
pub fn strip_data_url(encoded: &str) -> &str {
    let trimmed = encoded.trim();
    if trimmed.starts_with("data:") {
        if let Some((_, data)) = trimmed.split_once(',') {
            return data;
        }
    }
    trimmed
}

pub struct MediaPersister {
    client: Arc<dyn HttpClient>,
    storage: Arc<dyn ObjectStorage>,
}

impl MediaPersister {
    pub fn new(client: Arc<dyn HttpClient>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { client, storage }
    }

    pub fn is_storage_url(&self, url: &str) -> bool {
        self.storage.is_storage_url(url)
    }

    /// Download a remote image and re-host it. URLs already in storage are
    /// returned unchanged without a download.
    pub async fn persist(&self, source_url: &str, recipe_id: Uuid) -> Option<String> {
        if self.storage.is_storage_url(source_url) {
            return Some(source_url.to_string());
        }

        let fetched = match self.client.fetch_bytes(source_url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(%recipe_id, source_url, error = %e, "image download failed");
                return None;
            }
        };

        let content_type = fetched
            .content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_string())
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());
        let path = format!(
            "{}.{}",
            recipe_id,
            extension_for_content_type(Some(&content_type))
        );

        self.upload(&path, fetched.data, &content_type, recipe_id).await
    }

    /// Decode an inline base64 image and store it.
    pub async fn persist_inline(&self, encoded: &str, recipe_id: Uuid) -> Option<String> {
        let data = match base64::engine::general_purpose::STANDARD.decode(strip_data_url(encoded))
        {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(%recipe_id, error = %e, "inline image is not valid base64");
                return None;
            }
        };

        let content_type = sniff_media_type(&data).unwrap_or(DEFAULT_MEDIA_TYPE);
        let path = format!(
            "{}.{}",
            recipe_id,
            extension_for_content_type(Some(content_type))
        );

        self.upload(&path, data, content_type, recipe_id).await
    }

    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        recipe_id: Uuid,
    ) -> Option<String> {
        match self.storage.upload(path, data, content_type).await {
            Ok(url) => {
                tracing::info!(%recipe_id, path, "image stored");
                Some(url)
            }
            Err(e) => {
                tracing::warn!(%recipe_id, path, error = %e, "image upload failed");
                None
            }
        }
    }
}
