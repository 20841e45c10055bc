//! Re-hosting images of recipes saved before media persistence existed,
//! or whose third-party image has since changed.

use serde::Serialize;
use uuid::Uuid;

use crate::error::StoreError;

use super::Ingestor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationOutcome {
    Migrated,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationDetail {
    pub id: Uuid,
    pub title: String,
    pub outcome: MigrationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub total: usize,
    pub migrated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub details: Vec<MigrationDetail>,
}

impl MigrationReport {
    fn record(&mut self, detail: MigrationDetail) {
        match detail.outcome {
            MigrationOutcome::Migrated => self.migrated += 1,
            MigrationOutcome::Failed => self.failed += 1,
            MigrationOutcome::Skipped => self.skipped += 1,
        }
        self.details.push(detail);
    }
}

impl Ingestor {
    /// Move every image of this user's recipes into permanent storage.
    ///
    /// Each recipe is re-fetched once for a fresh image URL, falling back to
    /// the stored one. Recipes already in storage are skipped without any
    /// network access.
    pub async fn migrate_thumbnails(&self, user_id: Uuid) -> Result<MigrationReport, StoreError> {
        let candidates = self.store.thumbnail_candidates(user_id).await?;
        let mut report = MigrationReport {
            total: candidates.len(),
            ..Default::default()
        };

        let mut first = true;
        for candidate in candidates {
            let detail = |outcome, image_url: Option<String>, reason: Option<&str>| MigrationDetail {
                id: candidate.id,
                title: candidate.title.clone(),
                outcome,
                image_url,
                reason: reason.map(str::to_string),
            };

            if let Some(current) = candidate
                .image_url
                .as_deref()
                .filter(|url| self.media.is_storage_url(url))
            {
                report.record(detail(
                    MigrationOutcome::Skipped,
                    Some(current.to_string()),
                    Some("already stored"),
                ));
                continue;
            }

            if !first {
                tokio::time::sleep(self.migration_pause).await;
            }
            first = false;

            let fresh = match self
                .fetcher
                .fetch(&candidate.source_url, candidate.source_platform)
                .await
            {
                Ok(content) => content.image_url,
                Err(e) => {
                    tracing::warn!(recipe_id = %candidate.id, error = %e, "re-fetch failed, using stored image");
                    None
                }
            };

            let Some(source) = fresh.or_else(|| candidate.image_url.clone()) else {
                report.record(detail(MigrationOutcome::Skipped, None, Some("no image found")));
                continue;
            };

            let Some(stored) = self.media.persist(&source, candidate.id).await else {
                report.record(detail(
                    MigrationOutcome::Failed,
                    None,
                    Some("could not store image"),
                ));
                continue;
            };

            match self.store.update_image_url(candidate.id, &stored).await {
                Ok(()) => report.record(detail(MigrationOutcome::Migrated, Some(stored), None)),
                Err(e) => {
                    tracing::warn!(recipe_id = %candidate.id, error = %e, "failed to update image");
                    report.record(detail(MigrationOutcome::Failed, None, Some("update failed")));
                }
            }
        }

        tracing::info!(
            %user_id,
            total = report.total,
            migrated = report.migrated,
            failed = report.failed,
            skipped = report.skipped,
            "thumbnail migration finished"
        );
        Ok(report)
    }
}
