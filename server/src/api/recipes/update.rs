use crate::api::{error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::schema::recipes;
use crate::store::find_owned;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::get::RecipeEnvelope;

/// Replaces the recipe's categories. Custom labels are allowed here even
/// though extraction only produces the canonical ones.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateCategoriesRequest {
    pub categories: Vec<String>,
}

/// Trim and deduplicate, keeping first occurrences. `None` if any entry is
/// blank or nothing is left.
fn clean_categories(categories: &[String]) -> Option<Vec<String>> {
    let mut cleaned: Vec<String> = Vec::with_capacity(categories.len());
    for category in categories {
        let category = category.trim();
        if category.is_empty() {
            return None;
        }
        if !cleaned.iter().any(|c| c == category) {
            cleaned.push(category.to_string());
        }
    }
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[utoipa::path(
    patch,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    request_body = UpdateCategoriesRequest,
    responses(
        (status = 200, description = "Categories updated", body = RecipeEnvelope),
        (status = 400, description = "Empty or blank categories", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_categories(
    AuthUser(user_id): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCategoriesRequest>,
) -> impl IntoResponse {
    let Some(categories) = clean_categories(&request.categories) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "יש לבחור לפחות קטגוריה אחת חוקית",
        );
    };

    let mut conn = get_conn!(pool);

    let updated = diesel::update(
        recipes::table
            .filter(recipes::id.eq(id))
            .filter(recipes::user_id.eq(user_id)),
    )
    .set(recipes::categories.eq(&categories))
    .execute(&mut conn);

    match updated {
        Ok(0) => return error_response(StatusCode::NOT_FOUND, "המתכון לא נמצא"),
        Ok(_) => {}
        Err(e) => {
            tracing::error!(recipe_id = %id, error = %e, "failed to update categories");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "שגיאה בעדכון הקטגוריות",
            );
        }
    }

    match find_owned(&mut conn, user_id, id) {
        Ok(Some(recipe)) => (StatusCode::OK, Json(RecipeEnvelope::from(recipe))).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "המתכון לא נמצא"),
        Err(e) => {
            tracing::error!(recipe_id = %id, error = %e, "failed to reload recipe");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "שגיאה בעדכון הקטגוריות")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_clean_trims_and_dedupes() {
        assert_eq!(
            clean_categories(&strings(&[" חלבי ", "קינוחים", "חלבי"])),
            Some(strings(&["חלבי", "קינוחים"]))
        );
    }

    #[test]
    fn test_clean_rejects_empty_or_blank() {
        assert_eq!(clean_categories(&[]), None);
        assert_eq!(clean_categories(&strings(&["חלבי", "  "])), None);
    }
}
