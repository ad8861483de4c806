//! Ranking service
//!
//! Photo and photographer leaderboards over approved photos, plus heat score
//! maintenance. Also the database-backed source for the strategy engine.

use axum::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::SettingsService;
use crate::data::{
    CounterDelta, Database, HeatWeights, PhotographerRankingRow, RankedPhoto, RankingPeriod,
    UserThemeCount,
};
use crate::error::AppError;
use crate::metrics::HEAT_RECALCULATIONS_TOTAL;
use crate::strategy::{PhotoSnapshot, PhotoSource};

pub const DEFAULT_RANKING_LIMIT: i64 = 20;
pub const MAX_RANKING_LIMIT: i64 = 100;
const MAX_SPECIALTIES: usize = 3;

/// Photographer leaderboard entry
#[derive(Debug, Clone, Serialize)]
pub struct RankedPhotographer {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    /// Summed heat of the photographer's approved photos
    pub heat_score: f64,
    pub rating: f64,
    pub photos_count: i64,
    pub total_likes: i64,
    pub rank: usize,
    pub specialties: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingStats {
    pub total_photos: i64,
    pub total_photographers: i64,
    pub period: RankingPeriod,
}

/// Check a requested ranking size
pub fn validate_limit(limit: Option<i64>) -> Result<i64, AppError> {
    let limit = limit.unwrap_or(DEFAULT_RANKING_LIMIT);
    if !(1..=MAX_RANKING_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_RANKING_LIMIT
        )));
    }
    Ok(limit)
}

/// Star rating derived from average heat: `avg / 10` clamped to 1..=5
pub fn photographer_rating(avg_heat: f64) -> f64 {
    let rating = (avg_heat / 10.0).clamp(1.0, 5.0);
    (rating * 10.0).round() / 10.0
}

/// Most frequent themes per user, ties broken by name
fn specialties(counts: Vec<UserThemeCount>) -> HashMap<i64, Vec<String>> {
    let mut by_user: HashMap<i64, Vec<(String, i64)>> = HashMap::new();
    for row in counts {
        by_user
            .entry(row.user_id)
            .or_default()
            .push((row.theme, row.count));
    }

    by_user
        .into_iter()
        .map(|(user_id, mut themes)| {
            themes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            let top = themes
                .into_iter()
                .take(MAX_SPECIALTIES)
                .map(|(theme, _)| theme)
                .collect();
            (user_id, top)
        })
        .collect()
}

/// Ranking service
pub struct RankingService {
    db: Arc<Database>,
    settings: Arc<SettingsService>,
}

impl RankingService {
    pub fn new(db: Arc<Database>, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    /// Approved photos in the window, `heat_score DESC, id ASC`, ranked from 1
    pub async fn photo_rankings(
        &self,
        period: RankingPeriod,
        limit: i64,
    ) -> Result<Vec<RankedPhoto>, AppError> {
        let rows = self
            .db
            .photo_rankings(period.window_start(Utc::now()), limit)
            .await?;
        Ok(RankedPhoto::from_rows(rows))
    }

    pub async fn photographer_rankings(
        &self,
        period: RankingPeriod,
        limit: i64,
    ) -> Result<Vec<RankedPhotographer>, AppError> {
        let since = period.window_start(Utc::now());
        let rows = self.db.photographer_rankings(since, limit).await?;

        let user_ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut themes = specialties(self.db.user_theme_counts(&user_ids, since).await?);

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                let PhotographerRankingRow {
                    id,
                    username,
                    avatar_url,
                    photos_count,
                    total_likes,
                    total_heat,
                    avg_heat,
                } = row;
                RankedPhotographer {
                    id,
                    username,
                    avatar_url,
                    heat_score: total_heat,
                    rating: photographer_rating(avg_heat),
                    photos_count,
                    total_likes,
                    rank: index + 1,
                    specialties: themes.remove(&id).unwrap_or_default(),
                }
            })
            .collect())
    }

    pub async fn stats(&self, period: RankingPeriod) -> Result<RankingStats, AppError> {
        let (total_photos, total_photographers) = self
            .db
            .ranking_totals(period.window_start(Utc::now()))
            .await?;

        Ok(RankingStats {
            total_photos,
            total_photographers,
            period,
        })
    }

    /// Recompute every photo's heat score with the current weights
    pub async fn recalculate_all(&self) -> Result<u64, AppError> {
        let weights = self.settings.heat_weights().await?;
        let updated = self.db.recalculate_all_heat(&weights).await?;
        HEAT_RECALCULATIONS_TOTAL.inc();
        tracing::info!(updated, "Heat scores recalculated");
        Ok(updated)
    }
}

#[async_trait]
impl PhotoSource for RankingService {
    async fn load_photo(&self, photo_id: i64) -> Result<Option<PhotoSnapshot>, AppError> {
        Ok(self
            .db
            .get_photo_with_owner(photo_id)
            .await?
            .filter(|row| row.photo.is_approved())
            .map(PhotoSnapshot::from))
    }

    async fn load_rankings(
        &self,
        period: RankingPeriod,
        limit: i64,
    ) -> Result<Vec<RankedPhoto>, AppError> {
        self.photo_rankings(period, limit).await
    }

    async fn apply_delta(&self, photo_id: i64, delta: CounterDelta) -> Result<bool, AppError> {
        let weights = self.heat_weights().await;
        self.db.apply_counter_delta(photo_id, delta, &weights).await
    }

    async fn heat_weights(&self) -> HeatWeights {
        match self.settings.heat_weights().await {
            Ok(weights) => weights,
            Err(error) => {
                tracing::warn!(error = %error, "Could not read ranking weights, using defaults");
                HeatWeights::default()
            }
        }
    }
}
