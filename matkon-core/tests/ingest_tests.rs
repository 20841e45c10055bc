//! End-to-end ingestion tests.
//!
//! The orchestrator runs against a mock HTTP client, a scripted model, a
//! scripted frame service and in-memory storage, so every fallback path can
//! be driven without network or database access.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use matkon_core::llm::FakeProvider;
use matkon_core::pipeline::MigrationOutcome;
use matkon_core::store::RecipeStore;
use matkon_core::{
    DisabledFrameExtractor, ExtractedFrames, ExtractionStatus, FrameError, FrameExtractor,
    IngestError, IngestRequest, Ingestor, MemoryStorage, MemoryStore, MockClient, NewRecipe,
    ObjectStorage, Platform, RetryPolicy, FALLBACK_CATEGORY,
};
use uuid::Uuid;

const PNG_1X1: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

const RECIPE_JSON: &str = r#"{
    "title": "שקשוקה",
    "ingredients": [
        {"name": "4 ביצים", "quantity": "4", "unit": null},
        {"name": "עגבניות", "quantity": 3, "unit": "יחידות"}
    ],
    "steps": ["לטגן בצל", "להוסיף ביצים"],
    "categories": ["פרווה", "טבעוני"]
}"#;

const WEBSITE_URL: &str = "https://example.com/shakshuka";
const WEBSITE_IMAGE: &str = "https://cdn.example.com/shak.jpg";
const TIKTOK_URL: &str = "https://www.tiktok.com/@chef/video/123";
const TIKTOK_THUMB: &str = "https://p16.tiktokcdn.com/thumb.jpeg";

fn website_html() -> String {
    format!(
        r#"<html><head><title>Shakshuka</title>
        <meta property="og:image" content="{}"></head>
        <body><p>Crack 4 eggs into the tomato sauce.</p></body></html>"#,
        WEBSITE_IMAGE
    )
}

fn tiktok_oembed_url() -> String {
    url::Url::parse_with_params(
        "https://www.tiktok.com/oembed",
        &[("url", TIKTOK_URL), ("format", "json")],
    )
    .unwrap()
    .to_string()
}

fn with_tiktok_oembed(client: MockClient) -> MockClient {
    client
        .with_text(
            &tiktok_oembed_url(),
            &format!(
                r#"{{"title":"Shakshuka in 5 minutes","author_name":"chef","thumbnail_url":"{}"}}"#,
                TIKTOK_THUMB
            ),
        )
        .with_bytes(TIKTOK_THUMB, vec![0xFF, 0xD8, 0xFF], Some("image/jpeg"))
}

/// Frame service double returning fixed frames, or failing.
struct ScriptedFrames(Option<ExtractedFrames>);

#[async_trait]
impl FrameExtractor for ScriptedFrames {
    async fn extract_frames(&self, _video_url: &str) -> Result<ExtractedFrames, FrameError> {
        self.0.clone().ok_or(FrameError::Service {
            status: 500,
            message: "download failed".to_string(),
        })
    }
}

struct Harness {
    client: Arc<MockClient>,
    provider: Arc<FakeProvider>,
    storage: Arc<MemoryStorage>,
    store: Arc<MemoryStore>,
    ingestor: Ingestor,
}

fn harness_with(
    client: MockClient,
    provider: FakeProvider,
    frames: Arc<dyn FrameExtractor>,
    store: MemoryStore,
) -> Harness {
    let client = Arc::new(client);
    let provider = Arc::new(provider);
    let storage = Arc::new(MemoryStorage::new());
    let store = Arc::new(store);
    let ingestor = Ingestor::new(
        client.clone(),
        provider.clone(),
        frames,
        storage.clone(),
        store.clone(),
    )
    .with_retry_policy(RetryPolicy::immediate())
    .with_migration_pause(Duration::ZERO);

    Harness {
        client,
        provider,
        storage,
        store,
        ingestor,
    }
}

fn harness(client: MockClient, provider: FakeProvider) -> Harness {
    harness_with(
        client,
        provider,
        Arc::new(DisabledFrameExtractor),
        MemoryStore::new(),
    )
}

fn url_request(url: &str) -> IngestRequest {
    IngestRequest {
        url: Some(url.to_string()),
        images: None,
    }
}

#[tokio::test]
async fn duplicate_submission_is_rejected_before_inference() {
    let h = harness(
        MockClient::new().with_text(WEBSITE_URL, &website_html()),
        FakeProvider::new().with_default_response(RECIPE_JSON),
    );
    let user = Uuid::new_v4();

    let first = h.ingestor.ingest(user, url_request(WEBSITE_URL)).await.unwrap();
    // Surrounding whitespace normalizes to the same URL
    let second = h
        .ingestor
        .ingest(user, url_request(&format!("  {}  ", WEBSITE_URL)))
        .await;

    match second {
        Err(IngestError::Duplicate { id, title }) => {
            assert_eq!(id, first.id);
            assert_eq!(title, "שקשוקה");
        }
        other => panic!("expected duplicate, got {:?}", other.map(|r| r.id)),
    }
    assert_eq!(h.store.recipes().len(), 1);
    assert_eq!(h.provider.call_count(), 1);
    assert_eq!(h.client.request_count(WEBSITE_URL), 1);

    // Another user may save the same URL
    assert!(h
        .ingestor
        .ingest(Uuid::new_v4(), url_request(WEBSITE_URL))
        .await
        .is_ok());
}

#[tokio::test]
async fn website_recipe_is_saved_with_stored_image_and_canonical_ingredients() {
    let h = harness(
        MockClient::new()
            .with_text(WEBSITE_URL, &website_html())
            .with_bytes(WEBSITE_IMAGE, vec![0xFF, 0xD8, 0xFF], Some("image/jpeg")),
        FakeProvider::with_response("Crack 4 eggs", RECIPE_JSON),
    );
    let user = Uuid::new_v4();

    let recipe = h.ingestor.ingest(user, url_request(WEBSITE_URL)).await.unwrap();

    assert_eq!(recipe.source_platform, Platform::Website);
    assert_eq!(recipe.source_url.as_deref(), Some(WEBSITE_URL));
    assert_eq!(recipe.video_embed_url, None);
    assert_eq!(recipe.extraction_status, ExtractionStatus::Complete);
    assert_eq!(recipe.categories, vec!["פרווה", "טבעוני"]);

    let expected_image = h.storage.public_url(&format!("{}.jpg", recipe.id));
    assert_eq!(recipe.image_url.as_deref(), Some(expected_image.as_str()));

    let names: Vec<(&str, &str)> = recipe
        .ingredients
        .iter()
        .map(|i| (i.name.as_str(), i.canonical_name.as_str()))
        .collect();
    assert_eq!(names, vec![("4 ביצים", "ביצים"), ("עגבניות", "עגבניות")]);
    assert_eq!(recipe.ingredients[1].quantity.as_deref(), Some("3"));

    let saved = h.store.get(recipe.id).unwrap();
    assert_eq!(saved.image_url, recipe.image_url);
    assert_eq!(saved.ingredients.len(), 2);
}

#[tokio::test]
async fn video_falls_back_from_frames_to_website_scrape() {
    let h = harness(
        with_tiktok_oembed(MockClient::new()).with_text(
            TIKTOK_URL,
            "<html><body><p>Full recipe: 4 eggs, 3 tomatoes</p></body></html>",
        ),
        FakeProvider::with_response("Full recipe", RECIPE_JSON),
    );

    let recipe = h
        .ingestor
        .ingest(Uuid::new_v4(), url_request(TIKTOK_URL))
        .await
        .unwrap();

    assert_eq!(recipe.source_platform, Platform::Tiktok);
    assert_eq!(recipe.video_embed_url.as_deref(), Some(TIKTOK_URL));
    // The oEmbed thumbnail survives a scrape that found no image
    assert_eq!(
        h.storage.get(&format!("{}.jpg", recipe.id)).unwrap().data,
        vec![0xFF, 0xD8, 0xFF]
    );
    assert_eq!(h.client.request_count(TIKTOK_THUMB), 1);
    // Frames failed before any model call
    assert_eq!(h.provider.call_count(), 1);
}

#[tokio::test]
async fn video_uses_frames_and_frame_thumbnail() {
    let frames = ScriptedFrames(Some(ExtractedFrames {
        frames: vec!["/9j/4AAQSkZJRgAB".to_string(), "/9j/4AAQSkZJRgAB".to_string()],
        thumbnail: Some(PNG_1X1.to_string()),
    }));
    let h = harness_with(
        with_tiktok_oembed(MockClient::new()),
        FakeProvider::new().with_media_response(RECIPE_JSON),
        Arc::new(frames),
        MemoryStore::new(),
    );

    let recipe = h
        .ingestor
        .ingest(Uuid::new_v4(), url_request(TIKTOK_URL))
        .await
        .unwrap();

    let request = &h.provider.requests()[0];
    assert_eq!(request.images.len(), 2);
    assert_eq!(request.images[0].media_type, "image/jpeg");
    assert!(request.prompt.contains("Shakshuka in 5 minutes"));

    // Inline frame thumbnail wins over the oEmbed thumbnail
    assert!(recipe.image_url.unwrap().ends_with(&format!("{}.png", recipe.id)));
    assert_eq!(h.client.request_count(TIKTOK_THUMB), 0);
    // The post page was never scraped
    assert_eq!(h.client.request_count(TIKTOK_URL), 0);
}

#[tokio::test]
async fn video_hint_text_is_last_resort() {
    let h = harness(
        with_tiktok_oembed(MockClient::new()).with_status(TIKTOK_URL, 403),
        FakeProvider::with_response("Shakshuka in 5 minutes", RECIPE_JSON),
    );

    let recipe = h
        .ingestor
        .ingest(Uuid::new_v4(), url_request(TIKTOK_URL))
        .await
        .unwrap();

    assert_eq!(recipe.title, "שקשוקה");
    // The scrape was retried before giving up
    assert_eq!(h.client.request_count(TIKTOK_URL), 3);
}

#[tokio::test]
async fn video_hint_runs_after_scrape_without_recipe() {
    let provider = FakeProvider::with_response("Shakshuka in 5 minutes", RECIPE_JSON)
        .with_default_response(r#"{"error":"no_recipe"}"#);
    let h = harness(
        with_tiktok_oembed(MockClient::new())
            .with_text(TIKTOK_URL, "<html><body><p>Follow me for more</p></body></html>"),
        provider,
    );

    let recipe = h
        .ingestor
        .ingest(Uuid::new_v4(), url_request(TIKTOK_URL))
        .await
        .unwrap();

    assert_eq!(recipe.title, "שקשוקה");
    assert_eq!(h.provider.call_count(), 2);
}

#[tokio::test]
async fn video_without_recipe_anywhere_is_no_recipe_found() {
    let h = harness(
        with_tiktok_oembed(MockClient::new())
            .with_text(TIKTOK_URL, "<html><body><p>Dance challenge</p></body></html>"),
        FakeProvider::default(),
    );

    let result = h.ingestor.ingest(Uuid::new_v4(), url_request(TIKTOK_URL)).await;
    assert!(matches!(result, Err(IngestError::NoRecipeFound)));
    assert!(h.store.recipes().is_empty());
}

#[tokio::test]
async fn unreachable_website_is_content_unreachable() {
    let h = harness(
        MockClient::new().with_status(WEBSITE_URL, 500),
        FakeProvider::new().with_default_response(RECIPE_JSON),
    );

    let result = h.ingestor.ingest(Uuid::new_v4(), url_request(WEBSITE_URL)).await;
    assert!(matches!(result, Err(IngestError::ContentUnreachable(_))));
    assert_eq!(h.client.request_count(WEBSITE_URL), 3);
    assert_eq!(h.provider.call_count(), 0);
}

#[tokio::test]
async fn inference_error_surfaces_after_retries() {
    let h = harness(
        MockClient::new().with_text(WEBSITE_URL, &website_html()),
        FakeProvider::new(),
    );

    let result = h.ingestor.ingest(Uuid::new_v4(), url_request(WEBSITE_URL)).await;
    assert!(matches!(result, Err(IngestError::Inference(_))));
    assert_eq!(h.provider.call_count(), 3);
}

#[tokio::test]
async fn transient_inference_failure_is_retried() {
    let h = harness(
        MockClient::new().with_text(WEBSITE_URL, &website_html()),
        FakeProvider::new()
            .with_default_response(RECIPE_JSON)
            .failing_first(2),
    );

    assert!(h
        .ingestor
        .ingest(Uuid::new_v4(), url_request(WEBSITE_URL))
        .await
        .is_ok());
    assert_eq!(h.provider.call_count(), 3);
}

#[tokio::test]
async fn categories_fall_back_and_status_is_partial() {
    let h = harness(
        MockClient::new().with_text(WEBSITE_URL, &website_html()),
        FakeProvider::new().with_default_response(
            r#"{"title":"עוגה","ingredients":[{"name":"קמח"}],"steps":[],"categories":["dessert"]}"#,
        ),
    );

    let recipe = h
        .ingestor
        .ingest(Uuid::new_v4(), url_request(WEBSITE_URL))
        .await
        .unwrap();
    assert_eq!(recipe.categories, vec![FALLBACK_CATEGORY]);
    assert_eq!(recipe.extraction_status, ExtractionStatus::Partial);
}

#[tokio::test]
async fn upload_pipeline_stores_first_image() {
    let h = harness(
        MockClient::new(),
        FakeProvider::new().with_media_response(RECIPE_JSON),
    );

    let recipe = h
        .ingestor
        .ingest(
            Uuid::new_v4(),
            IngestRequest {
                url: None,
                images: Some(vec![
                    format!("data:image/png;base64,{}", PNG_1X1),
                    "/9j/4AAQSkZJRgAB".to_string(),
                ]),
            },
        )
        .await
        .unwrap();

    assert_eq!(recipe.source_platform, Platform::Upload);
    assert_eq!(recipe.source_url, None);
    assert!(recipe.image_url.unwrap().ends_with(".png"));
    assert_eq!(h.provider.requests()[0].images.len(), 2);
    assert_eq!(h.client.total_requests(), 0);
}

#[tokio::test]
async fn upload_validation_happens_before_inference() {
    let h = harness(
        MockClient::new(),
        FakeProvider::new().with_media_response(RECIPE_JSON),
    );

    let result = h
        .ingestor
        .ingest(
            Uuid::new_v4(),
            IngestRequest {
                url: None,
                images: Some(vec![PNG_1X1.to_string(); 6]),
            },
        )
        .await;
    assert!(matches!(result, Err(IngestError::Validation(_))));
    assert_eq!(h.provider.call_count(), 0);
}

#[tokio::test]
async fn invalid_url_is_validation_error() {
    let h = harness(MockClient::new(), FakeProvider::default());
    let result = h.ingestor.ingest(Uuid::new_v4(), url_request("not a url")).await;
    assert!(matches!(result, Err(IngestError::Validation(_))));
}

#[tokio::test]
async fn persistence_failure_surfaces() {
    let h = harness_with(
        MockClient::new().with_text(WEBSITE_URL, &website_html()),
        FakeProvider::new().with_default_response(RECIPE_JSON),
        Arc::new(DisabledFrameExtractor),
        MemoryStore::failing(),
    );

    let result = h.ingestor.ingest(Uuid::new_v4(), url_request(WEBSITE_URL)).await;
    assert!(matches!(result, Err(IngestError::Persistence(_))));
}

#[tokio::test]
async fn ingredient_insert_failure_keeps_recipe() {
    let h = harness_with(
        MockClient::new()
            .with_text(WEBSITE_URL, &website_html())
            .with_bytes(WEBSITE_IMAGE, vec![0xFF, 0xD8, 0xFF], Some("image/jpeg")),
        FakeProvider::new().with_default_response(RECIPE_JSON),
        Arc::new(DisabledFrameExtractor),
        MemoryStore::failing_ingredients(),
    );

    let recipe = h
        .ingestor
        .ingest(Uuid::new_v4(), url_request(WEBSITE_URL))
        .await
        .unwrap();
    assert_eq!(recipe.title, "שקשוקה");
    assert!(recipe.ingredients.is_empty());

    let saved = h.store.get(recipe.id).unwrap();
    assert!(saved.ingredients.is_empty());
    assert_eq!(saved.image_url, recipe.image_url);
    assert_eq!(h.store.recipes().len(), 1);
}

#[tokio::test]
async fn image_failure_does_not_fail_ingestion() {
    let h = harness(
        MockClient::new()
            .with_text(WEBSITE_URL, &website_html())
            .with_status(WEBSITE_IMAGE, 404),
        FakeProvider::new().with_default_response(RECIPE_JSON),
    );

    let recipe = h
        .ingestor
        .ingest(Uuid::new_v4(), url_request(WEBSITE_URL))
        .await
        .unwrap();
    // The remote URL stays on the row
    assert_eq!(recipe.image_url.as_deref(), Some(WEBSITE_IMAGE));
    assert_eq!(h.storage.upload_count(), 0);
}

#[tokio::test]
async fn migrate_thumbnails_reports_each_recipe() {
    let store = MemoryStore::new();
    let user = Uuid::new_v4();
    let storage_probe = MemoryStorage::new();

    let row = |title: &str, url: Option<&str>, image: Option<String>| NewRecipe {
        user_id: user,
        title: title.to_string(),
        source_url: url.map(str::to_string),
        source_platform: Platform::Website,
        video_embed_url: None,
        categories: vec![FALLBACK_CATEGORY.to_string()],
        extraction_status: ExtractionStatus::Partial,
        steps: vec![],
        image_url: image,
    };

    let already = store
        .insert_recipe(&row(
            "already",
            Some("https://a.example/1"),
            Some(storage_probe.public_url("x.jpg")),
        ))
        .await
        .unwrap();
    let fresh = store
        .insert_recipe(&row("fresh", Some(WEBSITE_URL), None))
        .await
        .unwrap();
    let broken = store
        .insert_recipe(&row(
            "broken",
            Some("https://gone.example/r"),
            Some("https://gone.example/img.jpg".to_string()),
        ))
        .await
        .unwrap();
    store
        .insert_recipe(&row("no source", None, None))
        .await
        .unwrap();

    let h = harness_with(
        MockClient::new()
            .with_text(WEBSITE_URL, &website_html())
            .with_bytes(WEBSITE_IMAGE, vec![1, 2, 3], Some("image/webp"))
            .with_status("https://gone.example/r", 404)
            .with_status("https://gone.example/img.jpg", 404),
        FakeProvider::default(),
        Arc::new(DisabledFrameExtractor),
        store,
    );

    let report = h.ingestor.migrate_thumbnails(user).await.unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.migrated, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 1);

    let outcome_of = |id: Uuid| {
        report
            .details
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.outcome)
            .unwrap()
    };
    assert_eq!(outcome_of(already.id), MigrationOutcome::Skipped);
    assert_eq!(outcome_of(fresh.id), MigrationOutcome::Migrated);
    assert_eq!(outcome_of(broken.id), MigrationOutcome::Failed);

    let migrated = h.store.get(fresh.id).unwrap();
    assert!(migrated.image_url.unwrap().ends_with(&format!("{}.webp", fresh.id)));
    // Stored images are never re-downloaded
    assert_eq!(h.client.request_count("https://a.example/1"), 0);
}
