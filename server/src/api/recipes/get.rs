use crate::api::{error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::store::find_owned;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use matkon_core::{NewIngredient, Recipe};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IngredientResponse {
    /// Name as extracted
    pub name: String,
    /// Normalized name used for matching and suggestions
    pub canonical_name: String,
    pub quantity: Option<String>,
    pub unit: Option<String>,
}

impl From<NewIngredient> for IngredientResponse {
    fn from(i: NewIngredient) -> Self {
        Self {
            name: i.name,
            canonical_name: i.canonical_name,
            quantity: i.quantity,
            unit: i.unit,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeResponse {
    pub id: Uuid,
    pub title: String,
    pub source_url: Option<String>,
    /// instagram | facebook | tiktok | youtube | website | upload
    pub source_platform: String,
    pub video_embed_url: Option<String>,
    pub categories: Vec<String>,
    /// complete | partial | failed
    pub extraction_status: String,
    pub steps: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ingredients: Vec<IngredientResponse>,
    /// Canonical names the user doesn't have. Only present when listing
    /// with an `ingredients` filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_ingredients: Option<Vec<String>>,
}

impl From<Recipe> for RecipeResponse {
    fn from(r: Recipe) -> Self {
        Self {
            id: r.id,
            title: r.title,
            source_url: r.source_url,
            source_platform: r.source_platform.as_str().to_string(),
            video_embed_url: r.video_embed_url,
            categories: r.categories,
            extraction_status: r.extraction_status.as_str().to_string(),
            steps: r.steps,
            image_url: r.image_url,
            created_at: r.created_at,
            ingredients: r.ingredients.into_iter().map(Into::into).collect(),
            missing_ingredients: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeEnvelope {
    pub recipe: RecipeResponse,
}

impl From<Recipe> for RecipeEnvelope {
    fn from(r: Recipe) -> Self {
        Self { recipe: r.into() }
    }
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe details", body = RecipeEnvelope),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_recipe(
    AuthUser(user_id): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    match find_owned(&mut conn, user_id, id) {
        Ok(Some(recipe)) => (StatusCode::OK, Json(RecipeEnvelope::from(recipe))).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "המתכון לא נמצא"),
        Err(e) => {
            tracing::error!(recipe_id = %id, error = %e, "failed to fetch recipe");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "שגיאה בטעינת המתכון")
        }
    }
}
