//! Photo competitions
//!
//! Lifecycle: `draft → active → voting → closed`, with `close` accepted from
//! any state that is not already closed.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{Page, SettingsService};
use crate::data::{
    Competition, CompetitionFields, CompetitionStatus, Database, LeaderboardRow, PhotoFilter,
    PhotoSort, PhotoWithOwner, User,
};
use crate::error::AppError;
use crate::strategy::StrategyEngine;

const MAX_NAME_LEN: usize = 100;
const MAX_SUBMISSIONS: i64 = 10;
const DETAIL_PHOTOS: i64 = 10;

/// Create/update payload; `max_submissions` falls back to the configured rule
#[derive(Debug, Clone)]
pub struct CompetitionInput {
    pub name: String,
    pub description: Option<String>,
    pub theme: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub voting_end_time: Option<DateTime<Utc>>,
    pub rules: Option<serde_json::Value>,
    pub prizes: Option<serde_json::Value>,
    pub max_submissions: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CompetitionDetail {
    pub competition: Competition,
    pub photos_count: i64,
    pub participants_count: i64,
    pub photos: Vec<PhotoWithOwner>,
}

/// Competition service
pub struct CompetitionService {
    db: Arc<Database>,
    settings: Arc<SettingsService>,
    engine: Arc<StrategyEngine>,
}

impl CompetitionService {
    pub fn new(
        db: Arc<Database>,
        settings: Arc<SettingsService>,
        engine: Arc<StrategyEngine>,
    ) -> Self {
        Self {
            db,
            settings,
            engine,
        }
    }

    pub async fn create(&self, input: CompetitionInput) -> Result<Competition, AppError> {
        let default_max = self.settings.competition_rules().await?.max_submissions_per_user;
        let fields = validate(input, default_max)?;
        let competition = self.db.insert_competition(&fields).await?;
        tracing::info!(
            competition_id = competition.id,
            name = %competition.name,
            "Competition created"
        );
        Ok(competition)
    }

    pub async fn list(
        &self,
        status: Option<CompetitionStatus>,
        theme: Option<&str>,
        page: Page,
    ) -> Result<(Vec<Competition>, i64), AppError> {
        self.db
            .list_competitions(status, theme, page.limit(), page.offset())
            .await
    }

    /// Active or voting competitions whose window contains now
    pub async fn running(&self) -> Result<Vec<Competition>, AppError> {
        self.db.list_running_competitions(Utc::now()).await
    }

    pub async fn detail(&self, id: i64) -> Result<CompetitionDetail, AppError> {
        let competition = self.load(id).await?;
        let (photos_count, participants_count) = self.db.competition_totals(id).await?;
        let filter = PhotoFilter {
            competition_id: Some(id),
            ..PhotoFilter::default()
        };
        let (photos, _) = self
            .db
            .list_approved_photos(&filter, DETAIL_PHOTOS, 0)
            .await?;

        Ok(CompetitionDetail {
            competition,
            photos_count,
            participants_count,
            photos,
        })
    }

    pub async fn update(&self, id: i64, input: CompetitionInput) -> Result<Competition, AppError> {
        let existing = self.load(id).await?;
        let fields = validate(input, existing.max_submissions)?;
        let competition = self
            .db
            .update_competition(id, &fields)
            .await?
            .ok_or(AppError::NotFound)?;
        tracing::info!(competition_id = id, "Competition updated");
        Ok(competition)
    }

    /// Delete a competition that has no photos attached
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.load(id).await?;
        let (photos, _) = self.db.competition_totals(id).await?;
        if photos > 0 {
            return Err(AppError::Validation(
                "Cannot delete a competition with submitted photos".to_string(),
            ));
        }
        if !self.db.delete_competition(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(competition_id = id, "Competition deleted");
        Ok(())
    }

    pub async fn start(&self, id: i64) -> Result<Competition, AppError> {
        self.transition(id, &[CompetitionStatus::Draft], CompetitionStatus::Active)
            .await
    }

    pub async fn start_voting(&self, id: i64) -> Result<Competition, AppError> {
        self.transition(id, &[CompetitionStatus::Active], CompetitionStatus::Voting)
            .await
    }

    pub async fn close(&self, id: i64) -> Result<Competition, AppError> {
        self.transition(
            id,
            &[
                CompetitionStatus::Draft,
                CompetitionStatus::Active,
                CompetitionStatus::Voting,
            ],
            CompetitionStatus::Closed,
        )
        .await
    }

    pub async fn photos(
        &self,
        id: i64,
        sort: PhotoSort,
        page: Page,
    ) -> Result<(Vec<PhotoWithOwner>, i64), AppError> {
        self.load(id).await?;
        let filter = PhotoFilter {
            competition_id: Some(id),
            sort,
            descending: true,
            ..PhotoFilter::default()
        };
        self.db
            .list_approved_photos(&filter, page.limit(), page.offset())
            .await
    }

    /// Entries ranked by `votes + likes * 0.5`
    pub async fn leaderboard(&self, id: i64, limit: i64) -> Result<Vec<LeaderboardRow>, AppError> {
        if !(1..=100).contains(&limit) {
            return Err(AppError::Validation(
                "limit must be between 1 and 100".to_string(),
            ));
        }
        self.load(id).await?;
        self.db.competition_leaderboard(id, limit).await
    }

    /// Check that `user` may submit, optionally entering one of their photos
    ///
    /// # Returns
    /// Submissions the user has left after this call
    pub async fn join(
        &self,
        user: &User,
        id: i64,
        photo_id: Option<i64>,
    ) -> Result<i64, AppError> {
        let competition = self.load(id).await?;
        if competition.status() != CompetitionStatus::Active {
            return Err(AppError::Validation(
                "Competition is not open for entries".to_string(),
            ));
        }

        let submitted = self.db.count_competition_submissions(user.id, id).await?;
        if submitted >= competition.max_submissions {
            return Err(AppError::Validation(format!(
                "Submission limit reached ({})",
                competition.max_submissions
            )));
        }

        let Some(photo_id) = photo_id else {
            return Ok(competition.max_submissions - submitted);
        };

        let photo = self.db.get_photo(photo_id).await?.ok_or(AppError::NotFound)?;
        if photo.user_id != user.id {
            return Err(AppError::Forbidden);
        }
        if !self.db.set_photo_competition(photo_id, id).await? {
            return Err(AppError::Validation(
                "Photo is already entered in a competition".to_string(),
            ));
        }
        self.engine.invalidate_photo(photo_id).await;
        tracing::info!(competition_id = id, photo_id, user_id = user.id, "Photo entered");
        Ok(competition.max_submissions - submitted - 1)
    }

    async fn load(&self, id: i64) -> Result<Competition, AppError> {
        self.db.get_competition(id).await?.ok_or(AppError::NotFound)
    }

    async fn transition(
        &self,
        id: i64,
        from: &[CompetitionStatus],
        to: CompetitionStatus,
    ) -> Result<Competition, AppError> {
        let current = self.load(id).await?;
        match self.db.transition_competition(id, from, to).await? {
            Some(competition) => {
                tracing::info!(
                    competition_id = id,
                    from = %current.status,
                    to = to.as_str(),
                    "Competition status changed"
                );
                Ok(competition)
            }
            None => {
                tracing::warn!(
                    competition_id = id,
                    status = %current.status,
                    to = to.as_str(),
                    "Refused competition transition"
                );
                Err(AppError::Validation(format!(
                    "Cannot move a {} competition to {}",
                    current.status,
                    to.as_str()
                )))
            }
        }
    }
}

fn validate(input: CompetitionInput, default_max: i64) -> Result<CompetitionFields, AppError> {
    let name = input.name.trim().to_string();
    let length = name.chars().count();
    if length == 0 || length > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "name must be 1 to {} characters",
            MAX_NAME_LEN
        )));
    }
    if input.end_time <= input.start_time {
        return Err(AppError::Validation(
            "end_time must be after start_time".to_string(),
        ));
    }
    if let Some(voting_end) = input.voting_end_time {
        if voting_end < input.end_time {
            return Err(AppError::Validation(
                "voting_end_time must not be before end_time".to_string(),
            ));
        }
    }

    let max_submissions = input.max_submissions.unwrap_or(default_max);
    if !(1..=MAX_SUBMISSIONS).contains(&max_submissions) {
        return Err(AppError::Validation(format!(
            "max_submissions must be between 1 and {}",
            MAX_SUBMISSIONS
        )));
    }

    Ok(CompetitionFields {
        name,
        description: input.description,
        theme: input.theme,
        start_time: input.start_time,
        end_time: input.end_time,
        voting_end_time: input.voting_end_time,
        rules: input.rules,
        prizes: input.prizes,
        max_submissions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input() -> CompetitionInput {
        let start = Utc::now();
        CompetitionInput {
            name: "Spring on campus".to_string(),
            description: None,
            theme: Some("nature_landscape".to_string()),
            start_time: start,
            end_time: start + Duration::days(14),
            voting_end_time: None,
            rules: None,
            prizes: None,
            max_submissions: None,
        }
    }

    #[test]
    fn max_submissions_defaults_from_rules() {
        let fields = validate(input(), 3).unwrap();
        assert_eq!(fields.max_submissions, 3);
    }

    #[test]
    fn end_must_follow_start() {
        let mut bad = input();
        bad.end_time = bad.start_time;
        assert!(validate(bad, 3).is_err());
    }

    #[test]
    fn submission_cap_is_bounded() {
        let mut bad = input();
        bad.max_submissions = Some(11);
        assert!(validate(bad, 3).is_err());
    }
}
