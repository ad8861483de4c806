//! Analytics service
//!
//! Read-only reports over photos, interactions and appointments: hot and
//! competition standings, per-user statistics, trending photos, interaction
//! summaries, theme popularity and photographer performance.

use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::data::{
    ActiveUserCount, AppointmentScope, AppointmentStatus, Competition, DailyCount, DailyKindCount,
    Database, KindCount, MonthlyCount, Photo, PhotoWithOwner, RankingPeriod, Role, ThemeCount,
    ThemeEngagementRow, User, UserPhotoTotals,
};
use crate::error::AppError;

pub const DEFAULT_TRENDING_HOURS: i64 = 24;
pub const MAX_TRENDING_HOURS: i64 = 168;
pub const DEFAULT_TRENDING_LIMIT: i64 = 10;
pub const MAX_TRENDING_LIMIT: i64 = 50;
pub const DEFAULT_SUMMARY_DAYS: i64 = 7;
pub const MAX_SUMMARY_DAYS: i64 = 365;

const POPULAR_PHOTOS: i64 = 5;
const UPLOAD_TREND_DAYS: i64 = 30;
const ACTIVE_USERS: i64 = 10;
const TREND_MONTHS: i64 = 12;

/// Check an optional bounded parameter, applying its default
pub fn bounded(name: &str, value: Option<i64>, default: i64, max: i64) -> Result<i64, AppError> {
    let value = value.unwrap_or(default);
    if !(1..=max).contains(&value) {
        return Err(AppError::Validation(format!(
            "{} must be between 1 and {}",
            name, max
        )));
    }
    Ok(value)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Photo ranked in a report, numbered from 1
#[derive(Debug, Clone)]
pub struct RankedEntry {
    pub rank: usize,
    pub entry: PhotoWithOwner,
}

fn number(rows: Vec<PhotoWithOwner>) -> Vec<RankedEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(index, entry)| RankedEntry {
            rank: index + 1,
            entry,
        })
        .collect()
}

/// Competition entry score: `votes·3 + favorites·2 + likes`
pub fn competition_score(photo: &Photo) -> i64 {
    photo.votes * 3 + photo.favorites * 2 + photo.likes
}

#[derive(Debug, Clone)]
pub struct CompetitionStandings {
    pub competition: Competition,
    pub rankings: Vec<RankedEntry>,
}

#[derive(Debug, Clone)]
pub struct UserReport {
    pub user: User,
    pub totals: UserPhotoTotals,
    pub themes: Vec<ThemeCount>,
    pub popular_photos: Vec<Photo>,
    pub upload_trend: Vec<DailyCount>,
}

#[derive(Debug, Clone)]
pub struct TrendingEntry {
    pub entry: PhotoWithOwner,
    pub recent_interactions: i64,
}

impl TrendingEntry {
    /// Lifetime likes, favorites and votes
    pub fn total_interactions(&self) -> i64 {
        let photo = &self.entry.photo;
        photo.likes + photo.favorites + photo.votes
    }
}

#[derive(Debug, Clone)]
pub struct InteractionSummary {
    pub days: i64,
    pub by_kind: Vec<KindCount>,
    pub daily: Vec<DailyKindCount>,
    pub active_users: Vec<ActiveUserCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemePopularity {
    pub theme: String,
    pub upload_count: i64,
    pub total_interactions: i64,
    pub avg_interactions: f64,
    pub popularity_score: f64,
}

/// Score themes by `uploads·0.3 + avg_interactions·0.7`, best first, ties by name
pub fn theme_popularity(rows: Vec<ThemeEngagementRow>) -> Vec<ThemePopularity> {
    let mut themes: Vec<ThemePopularity> = rows
        .into_iter()
        .map(|row| ThemePopularity {
            popularity_score: round2(row.upload_count as f64 * 0.3 + row.avg_interactions * 0.7),
            avg_interactions: round2(row.avg_interactions),
            theme: row.theme,
            upload_count: row.upload_count,
            total_interactions: row.total_interactions,
        })
        .collect();
    themes.sort_by(|a, b| {
        b.popularity_score
            .total_cmp(&a.popularity_score)
            .then_with(|| a.theme.cmp(&b.theme))
    });
    themes
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentPerformance {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub avg_rating: f64,
    pub total_ratings: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhotographerPerformance {
    /// `None` when an admin looks at every photographer
    pub photographer_id: Option<i64>,
    pub appointment_stats: AppointmentPerformance,
    /// Up to the last twelve months with bookings, oldest first
    pub monthly_trend: Vec<MonthlyCount>,
}

/// Analytics service
pub struct AnalyticsService {
    db: Arc<Database>,
}

impl AnalyticsService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Approved photos in the window by heat, optionally of one theme
    pub async fn hot(
        &self,
        period: RankingPeriod,
        theme: Option<&str>,
        limit: i64,
    ) -> Result<Vec<RankedEntry>, AppError> {
        let since = period.window_start(Utc::now());
        Ok(number(self.db.hot_photos(since, theme, limit).await?))
    }

    /// # Errors
    /// `NotFound` when the competition does not exist
    pub async fn competition(
        &self,
        competition_id: i64,
        limit: i64,
    ) -> Result<CompetitionStandings, AppError> {
        let competition = self
            .db
            .get_competition(competition_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let rows = self.db.competition_standings(competition_id, limit).await?;

        Ok(CompetitionStandings {
            competition,
            rankings: number(rows),
        })
    }

    /// # Errors
    /// `NotFound` when the user does not exist
    pub async fn user_report(&self, user_id: i64) -> Result<UserReport, AppError> {
        let user = self.db.get_user(user_id).await?.ok_or(AppError::NotFound)?;
        let since = Utc::now() - Duration::days(UPLOAD_TREND_DAYS);

        Ok(UserReport {
            totals: self.db.user_photo_totals(user_id).await?,
            themes: self.db.user_theme_distribution(user_id).await?,
            popular_photos: self.db.popular_user_photos(user_id, POPULAR_PHOTOS).await?,
            upload_trend: self.db.daily_uploads(user_id, since).await?,
            user,
        })
    }

    /// Photos with the most likes, favorites and votes in the last `hours`
    pub async fn trending(&self, hours: i64, limit: i64) -> Result<Vec<TrendingEntry>, AppError> {
        let since = Utc::now() - Duration::hours(hours);
        let rows = self.db.trending_photos(since, limit).await?;

        Ok(rows
            .into_iter()
            .map(|row| TrendingEntry {
                entry: row.entry,
                recent_interactions: row.recent_count,
            })
            .collect())
    }

    pub async fn interactions(&self, days: i64) -> Result<InteractionSummary, AppError> {
        let since = Utc::now() - Duration::days(days);

        Ok(InteractionSummary {
            days,
            by_kind: self.db.interaction_kind_counts(since).await?,
            daily: self.db.interaction_daily_counts(since).await?,
            active_users: self.db.most_active_users(since, ACTIVE_USERS).await?,
        })
    }

    pub async fn themes(&self, period: RankingPeriod) -> Result<Vec<ThemePopularity>, AppError> {
        let rows = self
            .db
            .theme_engagement(period.window_start(Utc::now()))
            .await?;
        Ok(theme_popularity(rows))
    }

    /// Booking statistics: a photographer sees their own, an admin sees all
    ///
    /// # Errors
    /// `Forbidden` for students
    pub async fn photographer_performance(
        &self,
        caller: &User,
    ) -> Result<PhotographerPerformance, AppError> {
        let (photographer_id, scope) = match caller.role() {
            Role::Admin => (None, AppointmentScope::All),
            Role::Photographer => (Some(caller.id), AppointmentScope::AsPhotographer(caller.id)),
            Role::Student => return Err(AppError::Forbidden),
        };

        let mut by_status: BTreeMap<String, i64> = AppointmentStatus::ALL
            .iter()
            .map(|status| (status.as_str().to_string(), 0))
            .collect();
        for row in self.db.appointment_status_counts(scope).await? {
            by_status.insert(row.status, row.count);
        }
        let total = by_status.values().sum();

        let (avg_rating, total_ratings) = self.db.appointment_rating_totals(scope).await?;
        let mut monthly_trend = self.db.monthly_appointments(scope, TREND_MONTHS).await?;
        monthly_trend.reverse();

        Ok(PhotographerPerformance {
            photographer_id,
            appointment_stats: AppointmentPerformance {
                total,
                by_status,
                avg_rating: round2(avg_rating.unwrap_or(0.0)),
                total_ratings,
            },
            monthly_trend,
        })
    }
}
