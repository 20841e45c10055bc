//! Permanent object storage for recipe images.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

pub const DEFAULT_BUCKET: &str = "recipe-thumbnails";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage not configured: {0}")]
    NotConfigured(String),

    #[error("Storage request failed: {0}")]
    Request(String),

    #[error("Upload rejected ({status}): {message}")]
    Upload { status: u16, message: String },
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload (overwriting any existing object) and return the public URL.
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;

    fn public_url(&self, path: &str) -> String;

    /// Whether a URL already points into this storage namespace.
    fn is_storage_url(&self, url: &str) -> bool;
}

fn public_prefix(base_url: &str, bucket: &str) -> String {
    format!(
        "{}/storage/v1/object/public/{}",
        base_url.trim_end_matches('/'),
        bucket
    )
}

fn namespace_marker(bucket: &str) -> String {
    format!("/storage/v1/object/public/{}", bucket)
}

/// Supabase Storage over its REST API.
pub struct SupabaseStorage {
    base_url: String,
    service_key: String,
    bucket: String,
    client: reqwest::Client,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, service_key: String, bucket: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket,
            client: reqwest::Client::new(),
        }
    }

    /// Environment variables:
    /// - `SUPABASE_URL`, `SUPABASE_SERVICE_KEY` (required)
    /// - `STORAGE_BUCKET` (default `recipe-thumbnails`)
    pub fn from_env() -> Result<Self, StorageError> {
        let base_url = std::env::var("SUPABASE_URL")
            .map_err(|_| StorageError::NotConfigured("SUPABASE_URL not set".to_string()))?;
        let service_key = std::env::var("SUPABASE_SERVICE_KEY")
            .map_err(|_| StorageError::NotConfigured("SUPABASE_SERVICE_KEY not set".to_string()))?;
        let bucket = std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| DEFAULT_BUCKET.to_string());
        Ok(Self::new(&base_url, service_key, bucket))
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, path
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Upload {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(path, content_type, "uploaded object");
        Ok(self.public_url(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", public_prefix(&self.base_url, &self.bucket), path)
    }

    fn is_storage_url(&self, url: &str) -> bool {
        url.contains(&namespace_marker(&self.bucket))
    }
}

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// In-memory storage for tests and dry runs.
pub struct MemoryStorage {
    base_url: String,
    objects: Mutex<HashMap<String, StoredObject>>,
    uploads: Mutex<usize>,
    fail_uploads: bool,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            base_url: "https://storage.test".to_string(),
            objects: Mutex::new(HashMap::new()),
            uploads: Mutex::new(0),
            fail_uploads: false,
        }
    }

    /// Storage whose every upload fails.
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Self::new()
        }
    }

    pub fn get(&self, path: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
    }

    pub fn upload_count(&self) -> usize {
        *self.uploads.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        *self.uploads.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        if self.fail_uploads {
            return Err(StorageError::Upload {
                status: 500,
                message: "upload disabled".to_string(),
            });
        }

        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                path.to_string(),
                StoredObject {
                    data,
                    content_type: content_type.to_string(),
                },
            );
        Ok(self.public_url(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", public_prefix(&self.base_url, DEFAULT_BUCKET), path)
    }

    fn is_storage_url(&self, url: &str) -> bool {
        url.contains(&namespace_marker(DEFAULT_BUCKET))
    }
}
