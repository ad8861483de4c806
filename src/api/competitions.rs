//! Competition endpoints

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::converters::{
    competition_detail_to_response, competition_to_response, leaderboard_to_response,
    owned_photo_to_response,
};
use super::dto::{
    CompetitionDetailResponse, CompetitionResponse, JoinResponse, LeaderboardEntry,
    MessageResponse, PhotoResponse,
};
use crate::AppState;
use crate::auth::{CurrentUser, RequireAdmin};
use crate::data::{Competition, CompetitionStatus, PhotoSort};
use crate::error::AppError;
use crate::service::{CompetitionInput, Page, Paginated};

const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct CompetitionRequest {
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

impl From<CompetitionRequest> for CompetitionInput {
    fn from(req: CompetitionRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            theme: req.theme,
            start_time: req.start_time,
            end_time: req.end_time,
            voting_end_time: req.voting_end_time,
            rules: req.rules,
            prizes: req.prizes,
            max_submissions: req.max_submissions,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompetitionListQuery {
    pub status_filter: Option<String>,
    pub theme: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CompetitionPhotosQuery {
    pub sort_by: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinQuery {
    pub photo_id: Option<i64>,
}

/// Create competitions router
///
/// Routes:
/// - GET|POST /api/competitions
/// - GET /api/competitions/active/list
/// - GET|PUT|DELETE /api/competitions/:id
/// - POST /api/competitions/:id/start, /start-voting, /close (admin)
/// - GET /api/competitions/:id/photos
/// - GET /api/competitions/:id/leaderboard
/// - POST /api/competitions/:id/join
pub fn competitions_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_competitions).post(create_competition))
        .route("/active/list", get(running_competitions))
        .route(
            "/:id",
            get(get_competition)
                .put(update_competition)
                .delete(delete_competition),
        )
        .route("/:id/start", post(start_competition))
        .route("/:id/start-voting", post(start_voting))
        .route("/:id/close", post(close_competition))
        .route("/:id/photos", get(competition_photos))
        .route("/:id/leaderboard", get(leaderboard))
        .route("/:id/join", post(join_competition))
}

fn respond(competition: Competition) -> Json<CompetitionResponse> {
    Json(competition_to_response(&competition))
}

/// POST /api/competitions
async fn create_competition(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(req): Json<CompetitionRequest>,
) -> Result<Json<CompetitionResponse>, AppError> {
    Ok(respond(state.competitions.create(req.into()).await?))
}

/// GET /api/competitions
async fn list_competitions(
    State(state): State<AppState>,
    Query(query): Query<CompetitionListQuery>,
) -> Result<Json<Paginated<CompetitionResponse>>, AppError> {
    let page = Page::new(query.page, query.size)?;
    let status = query
        .status_filter
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(CompetitionStatus::parse)
        .transpose()?;
    let theme = query.theme.as_deref().filter(|s| !s.is_empty());

    let (competitions, total) = state.competitions.list(status, theme, page).await?;
    Ok(Json(
        Paginated::new(competitions, total, page).map(|c| competition_to_response(&c)),
    ))
}

/// GET /api/competitions/active/list
async fn running_competitions(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompetitionResponse>>, AppError> {
    let competitions = state.competitions.running().await?;
    Ok(Json(
        competitions.iter().map(competition_to_response).collect(),
    ))
}

/// GET /api/competitions/:id
async fn get_competition(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CompetitionDetailResponse>, AppError> {
    let detail = state.competitions.detail(id).await?;
    Ok(Json(competition_detail_to_response(&detail)))
}

/// PUT /api/competitions/:id
async fn update_competition(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(req): Json<CompetitionRequest>,
) -> Result<Json<CompetitionResponse>, AppError> {
    Ok(respond(state.competitions.update(id, req.into()).await?))
}

/// DELETE /api/competitions/:id
async fn delete_competition(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.competitions.delete(id).await?;
    Ok(Json(MessageResponse::new("Competition deleted")))
}

/// POST /api/competitions/:id/start
async fn start_competition(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<CompetitionResponse>, AppError> {
    Ok(respond(state.competitions.start(id).await?))
}

/// POST /api/competitions/:id/start-voting
async fn start_voting(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<CompetitionResponse>, AppError> {
    Ok(respond(state.competitions.start_voting(id).await?))
}

/// POST /api/competitions/:id/close
async fn close_competition(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<CompetitionResponse>, AppError> {
    Ok(respond(state.competitions.close(id).await?))
}

/// GET /api/competitions/:id/photos
async fn competition_photos(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<CompetitionPhotosQuery>,
) -> Result<Json<Paginated<PhotoResponse>>, AppError> {
    let page = Page::new(query.page, query.size)?;
    let sort = match query.sort_by.as_deref() {
        None => PhotoSort::Votes,
        Some(name @ ("votes" | "likes" | "views" | "uploaded_at")) => PhotoSort::parse(name)?,
        Some(other) => {
            return Err(AppError::Validation(format!(
                "sort_by must be votes, likes, views or uploaded_at, got {}",
                other
            )));
        }
    };

    let (photos, total) = state.competitions.photos(id, sort, page).await?;
    Ok(Json(
        Paginated::new(photos, total, page).map(|row| owned_photo_to_response(&row)),
    ))
}

/// GET /api/competitions/:id/leaderboard
async fn leaderboard(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    let rows = state.competitions.leaderboard(id, limit).await?;
    Ok(Json(leaderboard_to_response(rows)))
}

/// POST /api/competitions/:id/join
///
/// Without `photo_id` this only checks eligibility.
async fn join_competition(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Query(query): Query<JoinQuery>,
) -> Result<Json<JoinResponse>, AppError> {
    let remaining = state.competitions.join(&user, id, query.photo_id).await?;
    let message = match query.photo_id {
        Some(_) => "Photo entered into the competition",
        None => "You can submit photos to this competition",
    };
    Ok(Json(JoinResponse {
        message: message.to_string(),
        success: true,
        remaining_submissions: remaining,
    }))
}
