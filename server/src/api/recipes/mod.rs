pub mod categories;
pub mod delete;
pub mod get;
pub mod ingest;
pub mod list;
pub mod migrate;
pub mod update;

use crate::AppState;
use axum::handler::Handler;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/recipes endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list::list_recipes).post(ingest::ingest_recipe.layer(ingest::body_limit())),
        )
        .route("/categories", get(categories::list_categories))
        .route(
            "/migrate-thumbnails",
            post(migrate::migrate_thumbnails),
        )
        .route(
            "/{id}",
            get(get::get_recipe)
                .patch(update::update_categories)
                .delete(delete::delete_recipe),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        ingest::ingest_recipe,
        list::list_recipes,
        get::get_recipe,
        update::update_categories,
        delete::delete_recipe,
        categories::list_categories,
        migrate::migrate_thumbnails,
    ),
    components(schemas(
        ingest::IngestRecipeRequest,
        ingest::DuplicateRecipeResponse,
        list::ListRecipesResponse,
        get::RecipeResponse,
        get::RecipeEnvelope,
        get::IngredientResponse,
        update::UpdateCategoriesRequest,
        categories::CategoriesResponse,
        migrate::MigrationReportResponse,
        migrate::MigrationDetailResponse,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedUserId;
    use crate::rate_limit::RateLimits;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Extension;
    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::pg::PgConnection;
    use matkon_core::llm::FakeProvider;
    use matkon_core::{DisabledFrameExtractor, Ingestor, MemoryStorage, MemoryStore, MockClient};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app() -> Router {
        // Never connects: the user id comes from the request extension
        let manager = ConnectionManager::<PgConnection>::new("postgres://localhost/unused");
        let pool = Pool::builder().min_idle(Some(0)).build_unchecked(manager);

        let state = AppState {
            pool: Arc::new(pool),
            ingestor: Arc::new(Ingestor::new(
                Arc::new(MockClient::new()),
                Arc::new(FakeProvider::default()),
                Arc::new(DisabledFrameExtractor),
                Arc::new(MemoryStorage::new()),
                Arc::new(MemoryStore::new()),
            )),
            rate_limits: Arc::new(RateLimits::default()),
        };

        router()
            .layer(Extension(AuthenticatedUserId(Uuid::new_v4())))
            .with_state(state)
    }

    fn post_json(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_ingest_accepts_bodies_over_default_limit() {
        let image = "A".repeat(3 * 1024 * 1024);
        let body = format!(r#"{{"images":["{}"]}}"#, image);
        assert!(body.len() > 2 * 1024 * 1024);

        let response = app().oneshot(post_json(body)).await.unwrap();
        assert_ne!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_ne!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ingest_rejects_bodies_over_upload_bound() {
        let body = format!(r#"{{"images":["{}"]}}"#, "A".repeat(ingest::MAX_BODY_BYTES));

        let response = app().oneshot(post_json(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
