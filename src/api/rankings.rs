//! Ranking endpoints

use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::RequireAdmin;
use crate::data::{RankedPhoto, RankingPeriod};
use crate::error::AppError;
use crate::service::{RankedPhotographer, RankingStats, validate_limit};
use crate::strategy::{CacheStrategy, RankingReader};

#[derive(Debug, Default, Deserialize)]
pub struct RankingQuery {
    pub period: Option<String>,
    pub limit: Option<i64>,
    pub strategy: Option<String>,
}

impl RankingQuery {
    fn period(&self) -> Result<RankingPeriod, AppError> {
        self.period
            .as_deref()
            .map(RankingPeriod::parse)
            .transpose()
            .map(|period| period.unwrap_or(RankingPeriod::Week))
    }
}

#[derive(Debug, Serialize)]
pub struct RecalculateResponse {
    pub message: String,
    pub updated_count: u64,
}

/// Create rankings router
///
/// Routes:
/// - GET /api/rankings/photos
/// - GET /api/rankings/photographers
/// - GET /api/rankings/stats
/// - POST /api/rankings/recalculate (admin)
pub fn rankings_router() -> Router<AppState> {
    Router::new()
        .route("/photos", get(photo_rankings))
        .route("/photographers", get(photographer_rankings))
        .route("/stats", get(ranking_stats))
        .route("/recalculate", post(recalculate))
}

/// GET /api/rankings/photos
///
/// Served through the requested cache strategy, or the current default.
async fn photo_rankings(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<Vec<RankedPhoto>>, AppError> {
    let period = query.period()?;
    let limit = validate_limit(query.limit)?;
    let strategy = match query.strategy.as_deref() {
        Some(name) => CacheStrategy::parse(name)?,
        None => state.engine.current_strategy(),
    };

    let lookup = state.engine.read_rankings(strategy, period, limit).await?;
    Ok(Json(lookup.value))
}

/// GET /api/rankings/photographers
async fn photographer_rankings(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<Vec<RankedPhotographer>>, AppError> {
    let period = query.period()?;
    let limit = validate_limit(query.limit)?;
    Ok(Json(
        state.rankings.photographer_rankings(period, limit).await?,
    ))
}

/// GET /api/rankings/stats
async fn ranking_stats(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<RankingStats>, AppError> {
    Ok(Json(state.rankings.stats(query.period()?).await?))
}

/// POST /api/rankings/recalculate
async fn recalculate(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<RecalculateResponse>, AppError> {
    let updated_count = state.rankings.recalculate_all().await?;
    state.engine.invalidate_rankings().await;
    tracing::info!(admin_id = admin.id, updated_count, "Manual heat recalculation");

    Ok(Json(RecalculateResponse {
        message: "Heat scores recalculated".to_string(),
        updated_count,
    }))
}
