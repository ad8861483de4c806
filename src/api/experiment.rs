//! Cache strategy experiment endpoints
//!
//! Each data endpoint runs through the strategy named in `?strategy=`
//! (default `baseline`) and reports timing plus whether the store answered.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use super::dto::{ExperimentMetadata, ExperimentResponse};
use crate::AppState;
use crate::auth::RequireAdmin;
use crate::data::{RankedPhoto, RankingPeriod};
use crate::error::AppError;
use crate::service::validate_limit;
use crate::strategy::{
    CacheStrategy, Lookup, PhotoSnapshot, RankingReader, RankingWriter, StrategyStats,
    stats_by_name,
};

#[derive(Debug, Default, Deserialize)]
pub struct StrategyQuery {
    pub strategy: Option<String>,
}

impl StrategyQuery {
    fn strategy(&self) -> Result<CacheStrategy, AppError> {
        self.strategy
            .as_deref()
            .map(CacheStrategy::parse)
            .transpose()
            .map(|strategy| strategy.unwrap_or(CacheStrategy::Baseline))
    }
}

#[derive(Debug, Deserialize)]
pub struct ExperimentRankingQuery {
    pub strategy: Option<String>,
    pub period: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct InvalidateQuery {
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExperimentStatus {
    pub current_strategy: CacheStrategy,
    pub cache_stats: BTreeMap<String, StrategyStats>,
    pub available_strategies: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
pub struct StrategySwitched {
    pub message: String,
    pub strategy: CacheStrategy,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CacheActionResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ExperimentMetrics {
    pub current_strategy: CacheStrategy,
    pub cache_stats: BTreeMap<String, StrategyStats>,
    pub pending_writes: usize,
    pub timestamp: DateTime<Utc>,
}

/// Create experiment router
///
/// Routes:
/// - GET /api/experiment/status
/// - POST /api/experiment/strategy/:name (admin)
/// - GET /api/experiment/photo/:id
/// - POST /api/experiment/photo/:id/view
/// - GET /api/experiment/rankings/photos
/// - POST /api/experiment/cache/invalidate (admin)
/// - POST /api/experiment/cache/clear (admin)
/// - GET /api/experiment/metrics
pub fn experiment_router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/strategy/:name", post(switch_strategy))
        .route("/photo/:id", get(read_photo))
        .route("/photo/:id/view", post(record_view))
        .route("/rankings/photos", get(read_rankings))
        .route("/cache/invalidate", post(invalidate))
        .route("/cache/clear", post(clear))
        .route("/metrics", get(metrics))
}

fn available_strategies() -> BTreeMap<&'static str, &'static str> {
    CacheStrategy::ALL
        .into_iter()
        .map(|strategy| (strategy.as_str(), strategy.label()))
        .collect()
}

fn envelope<T>(
    strategy: CacheStrategy,
    started: Instant,
    lookup: Lookup<T>,
) -> ExperimentResponse<T> {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    ExperimentResponse {
        data: lookup.value,
        metadata: ExperimentMetadata {
            strategy: strategy.as_str().to_string(),
            strategy_name: strategy.label().to_string(),
            response_time_ms: (elapsed_ms * 100.0).round() / 100.0,
            cache_hit: lookup.cache_hit,
            timestamp: Utc::now(),
        },
    }
}

/// GET /api/experiment/status
async fn status(State(state): State<AppState>) -> Json<ExperimentStatus> {
    Json(ExperimentStatus {
        current_strategy: state.engine.current_strategy(),
        cache_stats: stats_by_name(state.engine.all_stats().await),
        available_strategies: available_strategies(),
    })
}

/// POST /api/experiment/strategy/:name
async fn switch_strategy(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(name): Path<String>,
) -> Result<Json<StrategySwitched>, AppError> {
    let strategy = CacheStrategy::parse(&name)?;
    state.engine.switch_strategy(strategy).await;
    Ok(Json(StrategySwitched {
        message: format!("Switched to {}", strategy.label()),
        strategy,
        timestamp: Utc::now(),
    }))
}

/// GET /api/experiment/photo/:id
async fn read_photo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<StrategyQuery>,
) -> Result<Json<ExperimentResponse<PhotoSnapshot>>, AppError> {
    let strategy = query.strategy()?;
    let started = Instant::now();
    let lookup = state.engine.read_photo(strategy, id).await?;
    Ok(Json(envelope(strategy, started, lookup)))
}

/// POST /api/experiment/photo/:id/view
async fn record_view(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<StrategyQuery>,
) -> Result<Json<ExperimentResponse<PhotoSnapshot>>, AppError> {
    let strategy = query.strategy()?;
    let started = Instant::now();
    let lookup = state.engine.record_view(strategy, id).await?;
    Ok(Json(envelope(strategy, started, lookup)))
}

/// GET /api/experiment/rankings/photos
async fn read_rankings(
    State(state): State<AppState>,
    Query(query): Query<ExperimentRankingQuery>,
) -> Result<Json<ExperimentResponse<Vec<RankedPhoto>>>, AppError> {
    let strategy = StrategyQuery {
        strategy: query.strategy,
    }
    .strategy()?;
    let period = query
        .period
        .as_deref()
        .map(RankingPeriod::parse)
        .transpose()?
        .unwrap_or(RankingPeriod::Week);
    let limit = validate_limit(query.limit)?;

    let started = Instant::now();
    let lookup = state.engine.read_rankings(strategy, period, limit).await?;
    Ok(Json(envelope(strategy, started, lookup)))
}

/// POST /api/experiment/cache/invalidate
async fn invalidate(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<InvalidateQuery>,
) -> Json<CacheActionResponse> {
    let pattern = query.pattern.unwrap_or_else(|| "*".to_string());
    let removed = state.engine.invalidate_pattern(&pattern).await;
    Json(CacheActionResponse {
        message: format!("Invalidated entries matching {}", pattern),
        removed: Some(removed),
        timestamp: Utc::now(),
    })
}

/// POST /api/experiment/cache/clear
async fn clear(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Json<CacheActionResponse> {
    state.engine.clear().await;
    Json(CacheActionResponse {
        message: "All cache entries cleared".to_string(),
        removed: None,
        timestamp: Utc::now(),
    })
}

/// GET /api/experiment/metrics
async fn metrics(State(state): State<AppState>) -> Json<ExperimentMetrics> {
    Json(ExperimentMetrics {
        current_strategy: state.engine.current_strategy(),
        cache_stats: stats_by_name(state.engine.all_stats().await),
        pending_writes: state.engine.pending_writes(),
        timestamp: Utc::now(),
    })
}
