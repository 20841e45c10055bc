use crate::api::ErrorResponse;
use crate::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::db::user_id_from_token;
use super::extractor::AuthenticatedUserId;

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Middleware that requires a valid auth token for all requests.
/// Apply this to routes that should be protected by default.
///
/// The resolved user id is stored in the request extensions so `AuthUser`
/// doesn't look the session up a second time.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(auth_header) = request.headers().get(header::AUTHORIZATION) else {
        return unauthorized("Missing Authorization header");
    };

    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("Invalid Authorization header");
    };

    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("Invalid Authorization header format");
    };

    let Some(user_id) = user_id_from_token(&state.pool, token).await else {
        return unauthorized("Invalid or expired token");
    };

    request.extensions_mut().insert(AuthenticatedUserId(user_id));
    next.run(request).await
}
