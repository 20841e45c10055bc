pub mod classify;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod frames;
pub mod http;
pub mod llm;
pub mod media;
pub mod pipeline;
pub mod retry;
pub mod storage;
pub mod store;
pub mod types;

pub use classify::classify;
pub use error::{ClassifyError, FetchError, StoreError};
pub use extract::{normalize, RecipeExtractor};
pub use fetcher::ContentFetcher;
pub use frames::{DisabledFrameExtractor, ExtractedFrames, FrameError, FrameExtractor, HttpFrameExtractor};
pub use http::{HttpClient, MockClient, MockResponse, WebClient};
pub use media::MediaPersister;
pub use pipeline::{IngestError, IngestRequest, Ingestor, MigrationReport};
pub use retry::{with_retry, RetryPolicy};
pub use storage::{MemoryStorage, ObjectStorage, StorageError, SupabaseStorage};
pub use store::{MemoryStore, RecipeStore};
pub use types::{
    ExistingRecipe, ExtractedIngredient, ExtractedRecipe, ExtractionMethod, ExtractionStatus,
    FetchedContent, NewIngredient, NewRecipe, Platform, Recipe, ThumbnailCandidate,
    UrlClassification, CANONICAL_CATEGORIES, DEFAULT_TITLE, FALLBACK_CATEGORY,
};
