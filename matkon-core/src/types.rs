use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical category labels. Extraction only ever produces these.
pub const CANONICAL_CATEGORIES: &[&str] = &["חלבי", "בשרי", "פרווה", "טבעוני", "בריאותי"];

/// Category used when extraction yields none of the canonical ones.
pub const FALLBACK_CATEGORY: &str = "פרווה";

/// Title used when the model returns a recipe without a name.
pub const DEFAULT_TITLE: &str = "מתכון ללא שם";

/// Where a recipe came from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Facebook,
    Tiktok,
    Youtube,
    #[default]
    Website,
    Upload,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Tiktok => "tiktok",
            Platform::Youtube => "youtube",
            Platform::Website => "website",
            Platform::Upload => "upload",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "instagram" => Some(Platform::Instagram),
            "facebook" => Some(Platform::Facebook),
            "tiktok" => Some(Platform::Tiktok),
            "youtube" => Some(Platform::Youtube),
            "website" => Some(Platform::Website),
            "upload" => Some(Platform::Upload),
            _ => None,
        }
    }

    /// Social platforms carry video content and go through frame extraction.
    pub fn is_video(&self) -> bool {
        matches!(
            self,
            Platform::Instagram | Platform::Facebook | Platform::Tiktok | Platform::Youtube
        )
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How content behind a URL should be turned into a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Video,
    Text,
}

/// Result of classifying a submitted URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlClassification {
    pub platform: Platform,
    pub method: ExtractionMethod,
    /// The trimmed URL that all later stages (and duplicate detection) use.
    pub url: String,
}

/// What the content fetcher learned about a URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchedContent {
    pub description: String,
    pub title: Option<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub platform: Platform,
    /// Richer body text from structured data or page scraping.
    pub full_text: Option<String>,
}

impl FetchedContent {
    /// Best text to extract from: the full body when present, else the description.
    pub fn best_text(&self) -> &str {
        match self.full_text.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => &self.description,
        }
    }

    /// Title and description joined into a short hint for media extraction.
    pub fn text_hint(&self) -> Option<String> {
        let mut parts: Vec<&str> = Vec::new();
        for part in [self.title.as_deref(), Some(self.description.as_str())]
            .into_iter()
            .flatten()
        {
            let part = part.trim();
            if !part.is_empty() && !parts.contains(&part) {
                parts.push(part);
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedIngredient {
    pub name: String,
    pub quantity: Option<String>,
    pub unit: Option<String>,
}

/// Transient recipe produced by inference, consumed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecipe {
    pub title: String,
    pub ingredients: Vec<ExtractedIngredient>,
    pub steps: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Complete,
    Partial,
    Failed,
}

impl ExtractionStatus {
    /// Complete iff both ingredients and steps were extracted.
    pub fn for_recipe(recipe: &ExtractedRecipe) -> Self {
        if !recipe.ingredients.is_empty() && !recipe.steps.is_empty() {
            ExtractionStatus::Complete
        } else {
            ExtractionStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Complete => "complete",
            ExtractionStatus::Partial => "partial",
            ExtractionStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "complete" => Some(ExtractionStatus::Complete),
            "partial" => Some(ExtractionStatus::Partial),
            "failed" => Some(ExtractionStatus::Failed),
            _ => None,
        }
    }
}

/// A recipe row ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub user_id: Uuid,
    pub title: String,
    pub source_url: Option<String>,
    pub source_platform: Platform,
    pub video_embed_url: Option<String>,
    pub categories: Vec<String>,
    pub extraction_status: ExtractionStatus,
    pub steps: Vec<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub canonical_name: String,
    pub quantity: Option<String>,
    pub unit: Option<String>,
}

/// A persisted recipe together with its ingredients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub source_url: Option<String>,
    pub source_platform: Platform,
    pub video_embed_url: Option<String>,
    pub categories: Vec<String>,
    pub extraction_status: ExtractionStatus,
    pub steps: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ingredients: Vec<NewIngredient>,
}

/// Minimal view of an existing recipe, returned by duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingRecipe {
    pub id: Uuid,
    pub title: String,
}

/// A recipe whose image may still live on a third-party host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailCandidate {
    pub id: Uuid,
    pub title: String,
    pub source_url: String,
    pub source_platform: Platform,
    pub image_url: Option<String>,
}
