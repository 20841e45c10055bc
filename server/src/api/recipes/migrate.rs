use crate::api::{error_response, ErrorResponse};
use crate::auth::AuthUser;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use matkon_core::pipeline::{MigrationDetail, MigrationOutcome};
use matkon_core::{Ingestor, MigrationReport};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MigrationDetailResponse {
    pub id: Uuid,
    pub title: String,
    /// migrated | failed | skipped
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<MigrationDetail> for MigrationDetailResponse {
    fn from(d: MigrationDetail) -> Self {
        let outcome = match d.outcome {
            MigrationOutcome::Migrated => "migrated",
            MigrationOutcome::Failed => "failed",
            MigrationOutcome::Skipped => "skipped",
        };
        Self {
            id: d.id,
            title: d.title,
            outcome: outcome.to_string(),
            image_url: d.image_url,
            reason: d.reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MigrationReportResponse {
    pub total: usize,
    pub migrated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub details: Vec<MigrationDetailResponse>,
}

impl From<MigrationReport> for MigrationReportResponse {
    fn from(r: MigrationReport) -> Self {
        Self {
            total: r.total,
            migrated: r.migrated,
            failed: r.failed,
            skipped: r.skipped,
            details: r.details.into_iter().map(Into::into).collect(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/recipes/migrate-thumbnails",
    tag = "recipes",
    responses(
        (status = 200, description = "Images moved into permanent storage", body = MigrationReportResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Could not list recipes", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn migrate_thumbnails(
    AuthUser(user_id): AuthUser,
    State(ingestor): State<Arc<Ingestor>>,
) -> impl IntoResponse {
    match ingestor.migrate_thumbnails(user_id).await {
        Ok(report) => (StatusCode::OK, Json(MigrationReportResponse::from(report))).into_response(),
        Err(e) => {
            tracing::error!(%user_id, error = %e, "thumbnail migration failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "שגיאה בהעברת התמונות")
        }
    }
}
