pub mod suggest;

use crate::AppState;
use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/ingredients endpoints (mounted at /api/ingredients)
pub fn router() -> Router<AppState> {
    Router::new().route("/suggest", get(suggest::suggest_ingredients))
}

#[derive(OpenApi)]
#[openapi(
    paths(suggest::suggest_ingredients),
    components(schemas(suggest::SuggestionsResponse))
)]
pub struct ApiDoc;
