//! Admin API endpoints
//!
//! Moderation, configuration, audit log and reports.
//! Every route requires an admin.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};

use super::converters::{
    analysis_report_to_response, configuration_to_response, owned_photo_to_response,
    photo_to_response, system_log_to_response,
};
use super::dto::{
    AnalysisReportResponse, ConfigurationList, MessageResponse, PageQuery, PhotoResponse,
    SystemLogResponse,
};
use crate::AppState;
use crate::auth::RequireAdmin;
use crate::data::{ApprovalStatus, DashboardCounts};
use crate::error::AppError;
use crate::service::{ApprovalStats, BulkOutcome, Page, Paginated};

#[derive(Debug, Deserialize)]
pub struct ConfigurationItem {
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConfigurationsRequest {
    pub configurations: Vec<ConfigurationItem>,
}

#[derive(Debug, Serialize)]
pub struct UpdateConfigurationsResponse {
    pub message: String,
    pub updated: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub action: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BulkReviewRequest {
    pub photo_ids: Vec<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkReviewResponse {
    pub message: String,
    pub success: bool,
    #[serde(flatten)]
    pub outcome: BulkOutcome,
}

#[derive(Debug, Deserialize)]
pub struct AdminPhotoQuery {
    pub status_filter: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub approval_status: String,
    pub approval_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisUpdateRequest {
    pub theme: Option<String>,
    pub confidence: Option<f64>,
}

/// Create admin router
///
/// Routes:
/// - GET /api/admin/dashboard
/// - GET|PUT /api/admin/configurations
/// - GET /api/admin/logs
/// - POST /api/admin/bulk-actions/approve-photos, reject-photos
/// - GET /api/admin/photos, /photos/pending, /photos/approval-stats
/// - PUT /api/admin/photos/:id/approve, /photos/:id/analysis
/// - DELETE /api/admin/photos/:id
/// - GET /api/admin/analysis
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route(
            "/configurations",
            get(list_configurations).put(update_configurations),
        )
        .route("/logs", get(list_logs))
        // Moderation
        .route("/bulk-actions/approve-photos", post(bulk_approve))
        .route("/bulk-actions/reject-photos", post(bulk_reject))
        .route("/photos", get(list_photos))
        .route("/photos/pending", get(pending_photos))
        .route("/photos/approval-stats", get(approval_stats))
        .route("/photos/:id/approve", put(review_photo))
        .route("/photos/:id/analysis", put(update_analysis))
        .route("/photos/:id", delete(delete_photo))
        // Reports
        .route("/analysis", get(analysis_report))
}

// =============================================================================
// Dashboard and configuration
// =============================================================================

/// GET /api/admin/dashboard
async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<DashboardCounts>, AppError> {
    Ok(Json(state.dashboard.counts().await?))
}

/// GET /api/admin/configurations
async fn list_configurations(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<ConfigurationList>, AppError> {
    let rows = state.settings.list().await?;
    Ok(Json(ConfigurationList {
        items: rows.iter().map(configuration_to_response).collect(),
    }))
}

/// PUT /api/admin/configurations
///
/// Items apply in order; the first invalid one stops the batch.
async fn update_configurations(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(req): Json<UpdateConfigurationsRequest>,
) -> Result<Json<UpdateConfigurationsResponse>, AppError> {
    let mut updated = Vec::with_capacity(req.configurations.len());
    for item in req.configurations {
        state.settings.update(admin.id, &item.key, item.value).await?;
        updated.push(item.key);
    }

    if updated.iter().any(|key| key == "ranking_weights") {
        state.rankings.recalculate_all().await?;
        state.engine.invalidate_rankings().await;
    }

    Ok(Json(UpdateConfigurationsResponse {
        message: format!("Updated {} configuration(s)", updated.len()),
        updated,
    }))
}

/// GET /api/admin/logs
async fn list_logs(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<LogQuery>,
) -> Result<Json<Paginated<SystemLogResponse>>, AppError> {
    let page = Page::new(query.page, query.size)?;
    let action = query.action.as_deref().filter(|s| !s.is_empty());
    let (logs, total) = state.dashboard.logs(action, page).await?;
    Ok(Json(
        Paginated::new(logs, total, page).map(|log| system_log_to_response(&log)),
    ))
}

// =============================================================================
// Moderation
// =============================================================================

async fn bulk_review(
    state: &AppState,
    admin: &crate::data::User,
    req: BulkReviewRequest,
    decision: ApprovalStatus,
) -> Result<Json<BulkReviewResponse>, AppError> {
    let outcome = state
        .approvals
        .bulk_review(&req.photo_ids, admin, decision, req.notes.as_deref())
        .await?;
    Ok(Json(BulkReviewResponse {
        message: format!(
            "{} photo(s) {}",
            outcome.processed.len(),
            decision.as_str()
        ),
        success: true,
        outcome,
    }))
}

/// POST /api/admin/bulk-actions/approve-photos
async fn bulk_approve(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(req): Json<BulkReviewRequest>,
) -> Result<Json<BulkReviewResponse>, AppError> {
    bulk_review(&state, &admin, req, ApprovalStatus::Approved).await
}

/// POST /api/admin/bulk-actions/reject-photos
async fn bulk_reject(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(req): Json<BulkReviewRequest>,
) -> Result<Json<BulkReviewResponse>, AppError> {
    bulk_review(&state, &admin, req, ApprovalStatus::Rejected).await
}

/// GET /api/admin/photos
async fn list_photos(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<AdminPhotoQuery>,
) -> Result<Json<Paginated<PhotoResponse>>, AppError> {
    let page = Page::new(query.page, query.size)?;
    let status = query
        .status_filter
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(ApprovalStatus::parse)
        .transpose()?;
    let search = query.search.as_deref().filter(|s| !s.trim().is_empty());

    let (photos, total) = state
        .photos
        .list_by_status(None, status, search, page)
        .await?;
    Ok(Json(
        Paginated::new(photos, total, page).map(|row| owned_photo_to_response(&row)),
    ))
}

/// GET /api/admin/photos/pending
async fn pending_photos(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<PhotoResponse>>, AppError> {
    let page = query.page()?;
    let (photos, total) = state.approvals.list_pending(page).await?;
    Ok(Json(
        Paginated::new(photos, total, page).map(|row| owned_photo_to_response(&row)),
    ))
}

/// GET /api/admin/photos/approval-stats
async fn approval_stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<ApprovalStats>, AppError> {
    Ok(Json(state.approvals.stats().await?))
}

/// PUT /api/admin/photos/:id/approve
async fn review_photo(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<PhotoResponse>, AppError> {
    let decision = ApprovalStatus::parse(&req.approval_status)?;
    let photo = state
        .approvals
        .review(id, &admin, decision, req.approval_notes.as_deref())
        .await?;
    Ok(Json(photo_to_response(&photo)))
}

/// PUT /api/admin/photos/:id/analysis
async fn update_analysis(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(req): Json<AnalysisUpdateRequest>,
) -> Result<Json<PhotoResponse>, AppError> {
    let photo = state
        .photos
        .update_analysis(id, req.theme.as_deref(), req.confidence)
        .await?;
    Ok(Json(photo_to_response(&photo)))
}

/// DELETE /api/admin/photos/:id
async fn delete_photo(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.photos.delete(&admin, id).await?;
    Ok(Json(MessageResponse::new("Photo deleted")))
}

// =============================================================================
// Reports
// =============================================================================

/// GET /api/admin/analysis
async fn analysis_report(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<AnalysisReportResponse>, AppError> {
    let report = state.dashboard.analysis().await?;
    Ok(Json(analysis_report_to_response(report)))
}
