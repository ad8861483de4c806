//! Photo moderation
//!
//! Uploads start `pending`; an admin moves each one to `approved` or
//! `rejected` exactly once.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use super::{Page, utc_midnight};
use crate::data::{ApprovalStatus, Database, NewSystemLog, Photo, PhotoWithOwner, User};
use crate::error::AppError;
use crate::metrics::APPROVALS_TOTAL;
use crate::strategy::StrategyEngine;

/// Result of a bulk review
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    pub processed: Vec<i64>,
    /// Ids that were missing or already reviewed
    pub skipped: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalStats {
    pub total_pending: i64,
    pub total_approved: i64,
    pub total_rejected: i64,
    pub today_approved: i64,
    pub today_rejected: i64,
    pub approval_rate: f64,
}

/// Percentage of reviewed photos that were approved, one decimal
pub fn approval_rate(approved: i64, rejected: i64) -> f64 {
    let reviewed = approved + rejected;
    if reviewed == 0 {
        return 0.0;
    }
    (approved as f64 / reviewed as f64 * 1000.0).round() / 10.0
}

/// Approval service
pub struct ApprovalService {
    db: Arc<Database>,
    engine: Arc<StrategyEngine>,
}

impl ApprovalService {
    pub fn new(db: Arc<Database>, engine: Arc<StrategyEngine>) -> Self {
        Self { db, engine }
    }

    /// Review a pending photo
    ///
    /// # Errors
    /// - `Forbidden` when `reviewer` is not an admin
    /// - `NotFound` for an unknown photo
    /// - `Validation` when the photo was already reviewed
    pub async fn review(
        &self,
        photo_id: i64,
        reviewer: &User,
        decision: ApprovalStatus,
        notes: Option<&str>,
    ) -> Result<Photo, AppError> {
        let photo = self.apply_review(photo_id, reviewer, decision, notes).await?;

        self.db
            .insert_system_log(
                &NewSystemLog::new(
                    reviewer.id,
                    &format!("{}_photo", verb(decision)),
                    "photo",
                    Some(photo_id),
                )
                .with_details(json!({ "notes": notes })),
            )
            .await?;

        Ok(photo)
    }

    pub async fn approve(
        &self,
        photo_id: i64,
        reviewer: &User,
        notes: Option<&str>,
    ) -> Result<Photo, AppError> {
        self.review(photo_id, reviewer, ApprovalStatus::Approved, notes)
            .await
    }

    pub async fn reject(
        &self,
        photo_id: i64,
        reviewer: &User,
        notes: Option<&str>,
    ) -> Result<Photo, AppError> {
        self.review(photo_id, reviewer, ApprovalStatus::Rejected, notes)
            .await
    }

    /// Review many photos; ids that cannot be reviewed are skipped
    pub async fn bulk_review(
        &self,
        photo_ids: &[i64],
        reviewer: &User,
        decision: ApprovalStatus,
        notes: Option<&str>,
    ) -> Result<BulkOutcome, AppError> {
        if photo_ids.is_empty() {
            return Err(AppError::Validation("photo_ids must not be empty".to_string()));
        }

        let mut outcome = BulkOutcome::default();
        for &photo_id in photo_ids {
            match self.apply_review(photo_id, reviewer, decision, notes).await {
                Ok(_) => outcome.processed.push(photo_id),
                Err(AppError::NotFound | AppError::Validation(_)) => {
                    outcome.skipped.push(photo_id)
                }
                Err(error) => return Err(error),
            }
        }

        self.db
            .insert_system_log(
                &NewSystemLog::new(
                    reviewer.id,
                    &format!("bulk_{}_photos", verb(decision)),
                    "photo",
                    None,
                )
                .with_details(json!({
                    "processed": outcome.processed,
                    "skipped": outcome.skipped,
                    "notes": notes,
                })),
            )
            .await?;

        tracing::info!(
            decision = decision.as_str(),
            processed = outcome.processed.len(),
            skipped = outcome.skipped.len(),
            "Bulk review finished"
        );
        Ok(outcome)
    }

    /// Pending photos, oldest first
    pub async fn list_pending(&self, page: Page) -> Result<(Vec<PhotoWithOwner>, i64), AppError> {
        self.db.list_pending_photos(page.limit(), page.offset()).await
    }

    pub async fn stats(&self) -> Result<ApprovalStats, AppError> {
        let counts = self.db.approval_counts(utc_midnight(Utc::now())).await?;

        Ok(ApprovalStats {
            total_pending: counts.pending,
            total_approved: counts.approved,
            total_rejected: counts.rejected,
            today_approved: counts.today_approved,
            today_rejected: counts.today_rejected,
            approval_rate: approval_rate(counts.approved, counts.rejected),
        })
    }

    async fn apply_review(
        &self,
        photo_id: i64,
        reviewer: &User,
        decision: ApprovalStatus,
        notes: Option<&str>,
    ) -> Result<Photo, AppError> {
        if !reviewer.is_admin() {
            return Err(AppError::Forbidden);
        }
        if decision == ApprovalStatus::Pending {
            return Err(AppError::Validation(
                "approval_status must be approved or rejected".to_string(),
            ));
        }

        let Some(photo) = self
            .db
            .review_photo(photo_id, decision, reviewer.id, notes)
            .await?
        else {
            return match self.db.get_photo(photo_id).await? {
                None => Err(AppError::NotFound),
                Some(_) => Err(AppError::Validation(
                    "Photo has already been reviewed".to_string(),
                )),
            };
        };

        APPROVALS_TOTAL
            .with_label_values(&[decision.as_str()])
            .inc();
        self.engine.invalidate_photo(photo_id).await;
        tracing::info!(
            photo_id,
            reviewer_id = reviewer.id,
            decision = decision.as_str(),
            "Photo reviewed"
        );
        Ok(photo)
    }
}

fn verb(decision: ApprovalStatus) -> &'static str {
    match decision {
        ApprovalStatus::Approved => "approve",
        ApprovalStatus::Rejected => "reject",
        ApprovalStatus::Pending => "reset",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_rate_rounds_to_one_decimal() {
        assert_eq!(approval_rate(0, 0), 0.0);
        assert_eq!(approval_rate(2, 1), 66.7);
        assert_eq!(approval_rate(5, 0), 100.0);
    }
}
