use crate::api::{error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::rate_limit::{RateDecision, RateLimits};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use matkon_core::pipeline::{MAX_IMAGE_BASE64_LEN, MAX_UPLOAD_IMAGES};
use matkon_core::{IngestError, IngestRequest, Ingestor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::get::RecipeEnvelope;

/// Largest accepted submission: a full upload batch plus JSON framing.
pub const MAX_BODY_BYTES: usize = MAX_UPLOAD_IMAGES * MAX_IMAGE_BASE64_LEN + 64 * 1024;

/// Replaces axum's 2MB default so upload batches reach validation.
pub(crate) fn body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(MAX_BODY_BYTES)
}

/// Exactly one of `url` or `images` must be given.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct IngestRecipeRequest {
    /// Social post or recipe website URL
    pub url: Option<String>,
    /// Up to 5 base64 photos (plain or data URL), 4MB each
    pub images: Option<Vec<String>>,
}

impl From<IngestRecipeRequest> for IngestRequest {
    fn from(r: IngestRecipeRequest) -> Self {
        IngestRequest {
            url: r.url,
            images: r.images,
        }
    }
}

/// Returned with 409 when the URL was already saved by this user.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DuplicateRecipeResponse {
    pub error: String,
    pub existing_id: Uuid,
    pub existing_title: String,
}

pub(crate) fn rate_limited(decision: RateDecision) -> Response {
    let mut response = error_response(
        StatusCode::TOO_MANY_REQUESTS,
        "יותר מדי בקשות. נסו שוב בעוד רגע.",
    );
    if let Some(secs) = decision.retry_after_secs() {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    }
    response
}

fn ingest_error_response(error: IngestError) -> Response {
    match error {
        IngestError::Validation(message) => error_response(StatusCode::BAD_REQUEST, message),
        IngestError::Duplicate { id, title } => (
            StatusCode::CONFLICT,
            Json(DuplicateRecipeResponse {
                error: "המתכון הזה כבר נשמר".to_string(),
                existing_id: id,
                existing_title: title,
            }),
        )
            .into_response(),
        IngestError::NoRecipeFound => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, "לא נמצא מתכון בתוכן הזה")
        }
        IngestError::ContentUnreachable(reason) => {
            tracing::warn!(%reason, "content unreachable");
            error_response(
                StatusCode::BAD_GATEWAY,
                "לא הצלחנו לגשת לתוכן. נסו שוב מאוחר יותר.",
            )
        }
        e @ (IngestError::Inference(_) | IngestError::Persistence(_)) => {
            tracing::error!(error = %e, "recipe ingestion failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "שגיאה בעיבוד המתכון. נסו שוב מאוחר יותר.",
            )
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body = IngestRecipeRequest,
    responses(
        (status = 201, description = "Recipe extracted and saved", body = RecipeEnvelope),
        (status = 400, description = "Invalid submission", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 409, description = "Already saved from this URL", body = DuplicateRecipeResponse),
        (status = 422, description = "No recipe found in the content", body = ErrorResponse),
        (status = 429, description = "Too many submissions", body = ErrorResponse),
        (status = 502, description = "Content could not be reached", body = ErrorResponse),
        (status = 500, description = "Extraction or storage failed", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn ingest_recipe(
    AuthUser(user_id): AuthUser,
    State(ingestor): State<Arc<Ingestor>>,
    State(limits): State<Arc<RateLimits>>,
    Json(request): Json<IngestRecipeRequest>,
) -> impl IntoResponse {
    let decision = limits.submissions.check(&user_id.to_string());
    if decision != RateDecision::Allowed {
        tracing::warn!(%user_id, "submission rate limit hit");
        return rate_limited(decision);
    }

    match ingestor.ingest(user_id, request.into()).await {
        Ok(recipe) => (StatusCode::CREATED, Json(RecipeEnvelope::from(recipe))).into_response(),
        Err(e) => ingest_error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matkon_core::StoreError;
    use std::time::Duration;

    #[test]
    fn test_error_statuses() {
        let cases = [
            (IngestError::Validation("bad".to_string()), StatusCode::BAD_REQUEST),
            (
                IngestError::Duplicate {
                    id: Uuid::new_v4(),
                    title: "שקשוקה".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (IngestError::NoRecipeFound, StatusCode::UNPROCESSABLE_ENTITY),
            (
                IngestError::ContentUnreachable("HTTP 404".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                IngestError::Persistence(StoreError::Backend("down".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(ingest_error_response(error).status(), status);
        }
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = rate_limited(RateDecision::Denied {
            retry_after: Duration::from_millis(41_500),
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            &HeaderValue::from(42u64)
        );
    }

    #[test]
    fn test_request_deserializes_either_shape() {
        let by_url: IngestRecipeRequest =
            serde_json::from_str(r#"{"url": "https://example.com/r"}"#).unwrap();
        assert_eq!(by_url.url.as_deref(), Some("https://example.com/r"));
        assert!(by_url.images.is_none());

        let by_images: IngestRecipeRequest =
            serde_json::from_str(r#"{"images": ["aGk="]}"#).unwrap();
        assert_eq!(by_images.images.map(|i| i.len()), Some(1));
    }
}
