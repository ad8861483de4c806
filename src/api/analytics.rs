//! Analytics endpoints
//!
//! Read-only reports. Everything here is public except photographer
//! performance, which needs a photographer or admin token.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::converters::photo_to_response;
use super::dto::PhotoResponse;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{ActiveUserCount, PhotoWithOwner, RankingPeriod, UserPhotoTotals, UserSummary};
use crate::error::AppError;
use crate::service::{
    DEFAULT_SUMMARY_DAYS, DEFAULT_TRENDING_HOURS, DEFAULT_TRENDING_LIMIT, MAX_SUMMARY_DAYS,
    MAX_TRENDING_HOURS, MAX_TRENDING_LIMIT, PhotographerPerformance, RankedEntry, ThemePopularity,
    bounded, competition_score, validate_limit,
};

#[derive(Debug, Default, Deserialize)]
pub struct HotQuery {
    pub period: Option<String>,
    pub theme: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendingQuery {
    pub hours: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

fn period_or(value: Option<&str>, default: RankingPeriod) -> Result<RankingPeriod, AppError> {
    value
        .map(RankingPeriod::parse)
        .transpose()
        .map(|period| period.unwrap_or(default))
}

fn owner_of(entry: &PhotoWithOwner) -> UserSummary {
    UserSummary {
        id: entry.photo.user_id,
        username: entry.owner_username.clone(),
        avatar_url: entry.owner_avatar_url.clone(),
    }
}

#[derive(Debug, Serialize)]
pub struct HotEntry {
    pub rank: usize,
    pub photo: PhotoResponse,
    pub score: f64,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct HotRankingsResponse {
    pub period: RankingPeriod,
    pub theme: Option<String>,
    pub total: usize,
    pub rankings: Vec<HotEntry>,
}

#[derive(Debug, Serialize)]
pub struct CompetitionSummary {
    pub id: i64,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CompetitionEntry {
    pub rank: usize,
    pub photo: PhotoResponse,
    pub score: i64,
    pub votes: i64,
    pub likes: i64,
    pub favorites: i64,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct CompetitionRankingsResponse {
    pub competition: CompetitionSummary,
    pub total: usize,
    pub rankings: Vec<CompetitionEntry>,
}

#[derive(Debug, Serialize)]
pub struct UserProfileSummary {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ThemeShare {
    pub theme: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct PopularPhoto {
    pub id: i64,
    pub title: String,
    pub likes: i64,
    pub favorites: i64,
    pub views: i64,
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct DateCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct UserStatsResponse {
    pub user: UserProfileSummary,
    pub basic_stats: UserPhotoTotals,
    pub theme_distribution: Vec<ThemeShare>,
    pub popular_photos: Vec<PopularPhoto>,
    pub upload_trend: Vec<DateCount>,
}

#[derive(Debug, Serialize)]
pub struct TrendingPhoto {
    pub photo: PhotoResponse,
    pub user: UserSummary,
    pub recent_interactions: i64,
    pub total_interactions: i64,
    pub trend_score: i64,
}

#[derive(Debug, Serialize)]
pub struct TrendingResponse {
    pub period_hours: i64,
    pub trending_photos: Vec<TrendingPhoto>,
}

#[derive(Debug, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DailyTrend {
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct InteractionSummaryResponse {
    pub period_days: i64,
    pub interaction_stats: Vec<TypeCount>,
    pub daily_trends: Vec<DailyTrend>,
    pub active_users: Vec<ActiveUserCount>,
}

#[derive(Debug, Serialize)]
pub struct ThemePopularityResponse {
    pub period: RankingPeriod,
    pub theme_analysis: Vec<ThemePopularity>,
}

/// Create analytics router
///
/// Routes:
/// - GET /api/analytics/rankings/hot
/// - GET /api/analytics/rankings/competition/:id
/// - GET /api/analytics/user-stats/:user_id
/// - GET /api/analytics/trending
/// - GET /api/analytics/interactions/summary
/// - GET /api/analytics/themes/popularity
/// - GET /api/analytics/photographers/performance (photographer or admin)
pub fn analytics_router() -> Router<AppState> {
    Router::new()
        .route("/rankings/hot", get(hot_rankings))
        .route("/rankings/competition/:id", get(competition_rankings))
        .route("/user-stats/:user_id", get(user_stats))
        .route("/trending", get(trending))
        .route("/interactions/summary", get(interactions_summary))
        .route("/themes/popularity", get(theme_popularity))
        .route("/photographers/performance", get(photographer_performance))
}

/// GET /api/analytics/rankings/hot
///
/// `period` defaults to `week`.
async fn hot_rankings(
    State(state): State<AppState>,
    Query(query): Query<HotQuery>,
) -> Result<Json<HotRankingsResponse>, AppError> {
    let period = period_or(query.period.as_deref(), RankingPeriod::Week)?;
    let limit = validate_limit(query.limit)?;
    let theme = query.theme.filter(|theme| !theme.trim().is_empty());

    let entries = state
        .analytics
        .hot(period, theme.as_deref(), limit)
        .await?;
    let rankings: Vec<HotEntry> = entries
        .into_iter()
        .map(|RankedEntry { rank, entry }| HotEntry {
            rank,
            score: entry.photo.heat_score,
            user: owner_of(&entry),
            photo: photo_to_response(&entry.photo),
        })
        .collect();

    Ok(Json(HotRankingsResponse {
        period,
        theme,
        total: rankings.len(),
        rankings,
    }))
}

/// GET /api/analytics/rankings/competition/:id
async fn competition_rankings(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<CompetitionRankingsResponse>, AppError> {
    let limit = validate_limit(query.limit)?;
    let standings = state.analytics.competition(id, limit).await?;

    let rankings: Vec<CompetitionEntry> = standings
        .rankings
        .into_iter()
        .map(|RankedEntry { rank, entry }| CompetitionEntry {
            rank,
            score: competition_score(&entry.photo),
            votes: entry.photo.votes,
            likes: entry.photo.likes,
            favorites: entry.photo.favorites,
            user: owner_of(&entry),
            photo: photo_to_response(&entry.photo),
        })
        .collect();

    let competition = standings.competition;
    Ok(Json(CompetitionRankingsResponse {
        competition: CompetitionSummary {
            id: competition.id,
            name: competition.name,
            status: competition.status,
        },
        total: rankings.len(),
        rankings,
    }))
}

/// GET /api/analytics/user-stats/:user_id
async fn user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserStatsResponse>, AppError> {
    let report = state.analytics.user_report(user_id).await?;

    Ok(Json(UserStatsResponse {
        user: UserProfileSummary {
            id: report.user.id,
            username: report.user.username,
            role: report.user.role,
            avatar_url: report.user.avatar_url,
        },
        basic_stats: report.totals,
        theme_distribution: report
            .themes
            .into_iter()
            .map(|row| ThemeShare {
                theme: row.theme,
                count: row.count,
            })
            .collect(),
        popular_photos: report
            .popular_photos
            .into_iter()
            .map(|photo| PopularPhoto {
                id: photo.id,
                title: photo.title,
                likes: photo.likes,
                favorites: photo.favorites,
                views: photo.views,
                image_url: photo.image_url,
            })
            .collect(),
        upload_trend: report
            .upload_trend
            .into_iter()
            .map(|row| DateCount {
                date: row.day,
                count: row.count,
            })
            .collect(),
    }))
}

/// GET /api/analytics/trending
///
/// `hours` in 1..=168 (default 24), `limit` in 1..=50 (default 10).
async fn trending(
    State(state): State<AppState>,
    Query(query): Query<TrendingQuery>,
) -> Result<Json<TrendingResponse>, AppError> {
    let hours = bounded(
        "hours",
        query.hours,
        DEFAULT_TRENDING_HOURS,
        MAX_TRENDING_HOURS,
    )?;
    let limit = bounded(
        "limit",
        query.limit,
        DEFAULT_TRENDING_LIMIT,
        MAX_TRENDING_LIMIT,
    )?;

    let trending_photos = state
        .analytics
        .trending(hours, limit)
        .await?
        .into_iter()
        .map(|trending| TrendingPhoto {
            total_interactions: trending.total_interactions(),
            recent_interactions: trending.recent_interactions,
            trend_score: trending.recent_interactions,
            user: owner_of(&trending.entry),
            photo: photo_to_response(&trending.entry.photo),
        })
        .collect();

    Ok(Json(TrendingResponse {
        period_hours: hours,
        trending_photos,
    }))
}

/// GET /api/analytics/interactions/summary
///
/// `days` in 1..=365 (default 7).
async fn interactions_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<InteractionSummaryResponse>, AppError> {
    let days = bounded("days", query.days, DEFAULT_SUMMARY_DAYS, MAX_SUMMARY_DAYS)?;
    let summary = state.analytics.interactions(days).await?;

    Ok(Json(InteractionSummaryResponse {
        period_days: summary.days,
        interaction_stats: summary
            .by_kind
            .into_iter()
            .map(|row| TypeCount {
                kind: row.kind,
                count: row.count,
            })
            .collect(),
        daily_trends: summary
            .daily
            .into_iter()
            .map(|row| DailyTrend {
                date: row.day,
                kind: row.kind,
                count: row.count,
            })
            .collect(),
        active_users: summary.active_users,
    }))
}

/// GET /api/analytics/themes/popularity
///
/// `period` defaults to `month`.
async fn theme_popularity(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ThemePopularityResponse>, AppError> {
    let period = period_or(query.period.as_deref(), RankingPeriod::Month)?;
    let theme_analysis = state.analytics.themes(period).await?;

    Ok(Json(ThemePopularityResponse {
        period,
        theme_analysis,
    }))
}

/// GET /api/analytics/photographers/performance
async fn photographer_performance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PhotographerPerformance>, AppError> {
    Ok(Json(
        state.analytics.photographer_performance(&user).await?,
    ))
}
