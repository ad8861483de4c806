//! API request and response DTOs
//!
//! Wire shapes consumed by the campus frontend. Database rows are converted
//! into these in `converters.rs`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::UserSummary;
use crate::error::AppError;
use crate::service::Page;

/// Generic acknowledgement
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
    pub success: bool,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }
}

/// `page` / `size` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> Result<Page, AppError> {
        Page::new(self.page, self.size)
    }
}

// =============================================================================
// Users
// =============================================================================

/// User as exposed over the API; never carries the password hash
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub photos_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserResponse,
}

// =============================================================================
// Photos
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PhotoResponse {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub theme: Option<String>,
    pub confidence: Option<f64>,
    pub quality_score: Option<f64>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub views: i64,
    pub likes: i64,
    pub favorites: i64,
    pub votes: i64,
    pub heat_score: f64,
    pub competition_id: Option<i64>,
    pub approval_status: String,
    pub approval_notes: Option<String>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub is_approved: bool,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhotoDetailResponse {
    #[serde(flatten)]
    pub photo: PhotoResponse,
    pub competition: Option<CompetitionResponse>,
    pub is_liked: bool,
    pub is_favorited: bool,
    pub is_voted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionRequest {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub active: bool,
    pub views: i64,
    pub likes: i64,
    pub favorites: i64,
    pub votes: i64,
    pub heat_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThemesResponse {
    pub themes: Vec<String>,
}

// =============================================================================
// Appointments
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentResponse {
    pub id: i64,
    pub student_id: i64,
    pub photographer_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub preferred_time: DateTime<Utc>,
    pub actual_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub rating: Option<i64>,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetailResponse {
    #[serde(flatten)]
    pub appointment: AppointmentResponse,
    pub student: UserResponse,
    pub photographer: UserResponse,
    pub can_cancel: bool,
    pub can_rate: bool,
}

// =============================================================================
// Competitions
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CompetitionResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub theme: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub voting_end_time: Option<DateTime<Utc>>,
    pub status: String,
    pub rules: Option<serde_json::Value>,
    pub prizes: Option<serde_json::Value>,
    pub max_submissions: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompetitionDetailResponse {
    #[serde(flatten)]
    pub competition: CompetitionResponse,
    pub photos_count: i64,
    pub participants_count: i64,
    pub photos: Vec<PhotoResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub photo_id: i64,
    pub title: String,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub likes: i64,
    pub votes: i64,
    pub views: i64,
    pub score: f64,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinResponse {
    pub message: String,
    pub success: bool,
    pub remaining_submissions: i64,
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationResponse {
    pub id: i64,
    pub key: String,
    pub value: serde_json::Value,
    pub description: Option<String>,
    pub category: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationList {
    pub items: Vec<ConfigurationResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemLogResponse {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<i64>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentAnalysisResponse {
    pub id: i64,
    pub title: String,
    pub category: Option<String>,
    pub confidence: Option<f64>,
    pub quality_score: Option<f64>,
    pub analyzed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReportResponse {
    pub total_photos: i64,
    pub analyzed_photos: i64,
    pub analysis_accuracy: f64,
    pub category_distribution: Vec<crate::service::CategoryShare>,
    pub quality_stats: crate::service::QualityStats,
    pub recent_analysis: Vec<RecentAnalysisResponse>,
    pub system_performance: crate::analysis::AnalyzerPerformance,
}

// =============================================================================
// Experiment
// =============================================================================

/// Timing and cache details attached to every experiment response
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentMetadata {
    pub strategy: String,
    pub strategy_name: String,
    pub response_time_ms: f64,
    pub cache_hit: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentResponse<T> {
    pub data: T,
    pub metadata: ExperimentMetadata,
}
