use crate::api::recipes::ingest::rate_limited;
use crate::api::{error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::raw_sql;
use crate::rate_limit::{RateDecision, RateLimits};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text, Uuid as DieselUuid};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

const MIN_QUERY_CHARS: usize = 2;
const MAX_SUGGESTIONS: i64 = 10;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SuggestParams {
    /// Part of an ingredient name, at least 2 characters
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SuggestionsResponse {
    /// Distinct canonical ingredient names, at most 10
    pub suggestions: Vec<String>,
}

#[derive(QueryableByName)]
struct NameRow {
    #[diesel(sql_type = Text)]
    name: String,
}

/// The trimmed query, if it is long enough to search for.
fn usable_query(q: Option<&str>) -> Option<&str> {
    q.map(str::trim)
        .filter(|q| q.chars().count() >= MIN_QUERY_CHARS)
}

#[utoipa::path(
    get,
    path = "/api/ingredients/suggest",
    tag = "ingredients",
    params(SuggestParams),
    responses(
        (status = 200, description = "Matching ingredient names", body = SuggestionsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn suggest_ingredients(
    AuthUser(user_id): AuthUser,
    State(pool): State<Arc<DbPool>>,
    State(limits): State<Arc<RateLimits>>,
    Query(params): Query<SuggestParams>,
) -> impl IntoResponse {
    let decision = limits.suggestions.check(&user_id.to_string());
    if decision != RateDecision::Allowed {
        return rate_limited(decision);
    }

    let Some(q) = usable_query(params.q.as_deref()) else {
        return (
            StatusCode::OK,
            Json(SuggestionsResponse {
                suggestions: Vec::new(),
            }),
        )
            .into_response();
    };

    let pattern = format!("%{}%", raw_sql::escape_like(q));
    let mut conn = get_conn!(pool);

    let rows: Vec<NameRow> = match sql_query(raw_sql::SUGGEST_INGREDIENTS_QUERY)
        .bind::<DieselUuid, _>(user_id)
        .bind::<Text, _>(&pattern)
        .bind::<BigInt, _>(MAX_SUGGESTIONS)
        .load(&mut conn)
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, "failed to suggest ingredients");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "שגיאה בחיפוש מצרכים");
        }
    };

    let response = SuggestionsResponse {
        suggestions: rows.into_iter().map(|r| r.name).collect(),
    };
    (StatusCode::OK, Json(response)).into_response()
}
