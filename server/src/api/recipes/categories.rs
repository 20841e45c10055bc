use crate::api::{error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::raw_sql;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Uuid as DieselUuid;
use matkon_core::CANONICAL_CATEGORIES;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoriesResponse {
    /// Canonical categories first, then the user's own, sorted
    pub categories: Vec<String>,
}

#[derive(QueryableByName)]
struct CategoryRow {
    #[diesel(sql_type = diesel::sql_types::Text)]
    category: String,
}

fn merge_with_canonical(custom: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut custom: Vec<String> = custom
        .into_iter()
        .filter(|c| !CANONICAL_CATEGORIES.contains(&c.as_str()))
        .collect();
    custom.sort();
    custom.dedup();

    CANONICAL_CATEGORIES
        .iter()
        .map(|c| c.to_string())
        .chain(custom)
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/recipes/categories",
    tag = "recipes",
    responses(
        (status = 200, description = "Categories available to the user", body = CategoriesResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_categories(
    AuthUser(user_id): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let rows: Vec<CategoryRow> = match sql_query(raw_sql::DISTINCT_CATEGORIES_QUERY)
        .bind::<DieselUuid, _>(user_id)
        .load(&mut conn)
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, "failed to fetch categories");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "שגיאה בטעינת הקטגוריות",
            );
        }
    };

    let response = CategoriesResponse {
        categories: merge_with_canonical(rows.into_iter().map(|r| r.category)),
    };

    (StatusCode::OK, Json(response)).into_response()
}
