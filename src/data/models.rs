//! Data models
//!
//! Rust structs representing database rows and the closed sets of
//! states they move through. Integer IDs, chrono timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// =============================================================================
// Users
// =============================================================================

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Photographer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Photographer => "photographer",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "student" => Ok(Self::Student),
            "photographer" => Ok(Self::Photographer),
            "admin" => Ok(Self::Admin),
            other => Err(AppError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

/// Registered account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub role: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Role parsed from the stored column; unknown values degrade to student.
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::Student)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }
}

/// Fields required to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub bio: Option<String>,
}

/// Partial profile update; `None` leaves the column untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

// =============================================================================
// Photos
// =============================================================================

/// Moderation state of a photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(AppError::Validation(format!(
                "Unknown approval status: {}",
                other
            ))),
        }
    }
}

/// Uploaded photo with engagement counters and moderation audit fields
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Photo {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    /// Storage key of the original file
    pub storage_key: Option<String>,
    /// Storage key of the generated thumbnail
    pub thumbnail_key: Option<String>,
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
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Photo {
    pub fn status(&self) -> ApprovalStatus {
        ApprovalStatus::parse(&self.approval_status).unwrap_or(ApprovalStatus::Pending)
    }

    pub fn is_approved(&self) -> bool {
        self.status() == ApprovalStatus::Approved
    }
}

/// Fields required to insert a photo
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub storage_key: Option<String>,
    pub thumbnail_key: Option<String>,
    pub theme: Option<String>,
    pub confidence: Option<f64>,
    pub quality_score: Option<f64>,
    pub competition_id: Option<i64>,
}

/// Photo joined with the owner's public summary
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PhotoWithOwner {
    #[sqlx(flatten)]
    pub photo: Photo,
    pub owner_username: String,
    pub owner_avatar_url: Option<String>,
}

/// Sortable photo columns for public listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoSort {
    UploadedAt,
    HeatScore,
    Likes,
    Views,
    Favorites,
    Votes,
}

impl PhotoSort {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "uploaded_at" => Ok(Self::UploadedAt),
            "heat_score" => Ok(Self::HeatScore),
            "likes" => Ok(Self::Likes),
            "views" => Ok(Self::Views),
            "favorites" => Ok(Self::Favorites),
            "votes" => Ok(Self::Votes),
            other => Err(AppError::Validation(format!(
                "Unsupported sort field: {}",
                other
            ))),
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::UploadedAt => "uploaded_at",
            Self::HeatScore => "heat_score",
            Self::Likes => "likes",
            Self::Views => "views",
            Self::Favorites => "favorites",
            Self::Votes => "votes",
        }
    }
}

/// Filters for public photo listings
#[derive(Debug, Clone)]
pub struct PhotoFilter {
    pub theme: Option<String>,
    pub competition_id: Option<i64>,
    pub user_id: Option<i64>,
    pub sort: PhotoSort,
    pub descending: bool,
}

impl Default for PhotoFilter {
    fn default() -> Self {
        Self {
            theme: None,
            competition_id: None,
            user_id: None,
            sort: PhotoSort::UploadedAt,
            descending: true,
        }
    }
}

// =============================================================================
// Interactions
// =============================================================================

/// Kind of engagement a user can record on a photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Like,
    Favorite,
    View,
    Vote,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Favorite => "favorite",
            Self::View => "view",
            Self::Vote => "vote",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "like" => Ok(Self::Like),
            "favorite" => Ok(Self::Favorite),
            "view" => Ok(Self::View),
            "vote" => Ok(Self::Vote),
            other => Err(AppError::Validation(format!(
                "Unsupported interaction type: {}",
                other
            ))),
        }
    }

    /// Likes, favorites and votes flip on repeat; views only accumulate.
    pub fn is_toggle(&self) -> bool {
        !matches!(self, Self::View)
    }
}

/// Counter deltas applied to a photo in one statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterDelta {
    pub views: i64,
    pub likes: i64,
    pub favorites: i64,
    pub votes: i64,
}

impl CounterDelta {
    pub fn single(kind: InteractionKind, amount: i64) -> Self {
        let mut delta = Self::default();
        match kind {
            InteractionKind::Like => delta.likes = amount,
            InteractionKind::Favorite => delta.favorites = amount,
            InteractionKind::View => delta.views = amount,
            InteractionKind::Vote => delta.votes = amount,
        }
        delta
    }

    pub fn merge(&mut self, other: CounterDelta) {
        self.views += other.views;
        self.likes += other.likes;
        self.favorites += other.favorites;
        self.votes += other.votes;
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Which toggles the viewer currently holds on a photo
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerFlags {
    pub liked: bool,
    pub favorited: bool,
    pub voted: bool,
}

// =============================================================================
// Rankings
// =============================================================================

/// Ranking window over `uploaded_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingPeriod {
    Week,
    Month,
    Year,
    All,
}

impl RankingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::All => "all",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            "all" => Ok(Self::All),
            other => Err(AppError::Validation(format!(
                "Unsupported period: {} (expected week, month, year or all)",
                other
            ))),
        }
    }

    /// Earliest `uploaded_at` included, or `None` for all time.
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Year => 365,
            Self::All => return None,
        };
        Some(now - chrono::Duration::days(days))
    }
}

/// One row of the photo ranking query
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PhotoRankingRow {
    pub id: i64,
    pub title: String,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub theme: Option<String>,
    pub likes: i64,
    pub views: i64,
    pub favorites: i64,
    pub votes: i64,
    pub heat_score: f64,
    pub user_id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Per-owner aggregate for the photographer ranking
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PhotographerRankingRow {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub photos_count: i64,
    pub total_likes: i64,
    pub total_heat: f64,
    pub avg_heat: f64,
}

/// Owner summary embedded in photo and ranking payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Ranked photo as served by the ranking endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPhoto {
    pub id: i64,
    pub title: String,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub theme: Option<String>,
    pub likes: i64,
    pub views: i64,
    pub favorites: i64,
    pub votes: i64,
    pub heat_score: f64,
    pub rank: usize,
    pub user: UserSummary,
}

impl RankedPhoto {
    /// Number rows 1.. in the order they were returned
    pub fn from_rows(rows: Vec<PhotoRankingRow>) -> Vec<Self> {
        rows.into_iter()
            .enumerate()
            .map(|(index, row)| Self {
                id: row.id,
                title: row.title,
                image_url: row.image_url,
                thumbnail_url: row.thumbnail_url,
                theme: row.theme,
                likes: row.likes,
                views: row.views,
                favorites: row.favorites,
                votes: row.votes,
                heat_score: row.heat_score,
                rank: index + 1,
                user: UserSummary {
                    id: row.user_id,
                    username: row.username,
                    avatar_url: row.avatar_url,
                },
            })
            .collect()
    }
}

/// Weights applied to engagement counters to form `heat_score`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatWeights {
    pub like: f64,
    pub view: f64,
    pub favorite: f64,
    pub vote: f64,
}

impl Default for HeatWeights {
    fn default() -> Self {
        Self {
            like: 0.4,
            view: 0.3,
            favorite: 0.2,
            vote: 0.1,
        }
    }
}

impl HeatWeights {
    pub fn is_valid(&self) -> bool {
        [self.like, self.view, self.favorite, self.vote]
            .iter()
            .all(|weight| weight.is_finite() && *weight >= 0.0)
    }

    pub fn score(&self, likes: i64, views: i64, favorites: i64, votes: i64) -> f64 {
        likes as f64 * self.like
            + views as f64 * self.view
            + favorites as f64 * self.favorite
            + votes as f64 * self.vote
    }
}

/// Theme frequency for one photographer
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserThemeCount {
    pub user_id: i64,
    pub theme: String,
    pub count: i64,
}

/// Competition leaderboard row; `score = votes + likes * 0.5`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeaderboardRow {
    pub id: i64,
    pub title: String,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub likes: i64,
    pub votes: i64,
    pub views: i64,
    pub score: f64,
    pub user_id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
}

// =============================================================================
// Appointments
// =============================================================================

/// Booking lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        Self::Pending,
        Self::Accepted,
        Self::Rejected,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(AppError::Validation(format!(
                "Unknown appointment status: {}",
                other
            ))),
        }
    }
}

/// Booking between a student and a photographer
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Appointment {
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

impl Appointment {
    pub fn status(&self) -> AppointmentStatus {
        AppointmentStatus::parse(&self.status).unwrap_or(AppointmentStatus::Pending)
    }
}

/// Fields required to insert an appointment
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub student_id: i64,
    pub photographer_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub preferred_time: DateTime<Utc>,
    pub location: Option<String>,
}

/// Editable appointment details; status is deliberately absent
#[derive(Debug, Clone, Default)]
pub struct AppointmentChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub preferred_time: Option<DateTime<Utc>>,
    pub actual_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Which side of a booking a listing is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentScope {
    All,
    AsStudent(i64),
    AsPhotographer(i64),
}

// =============================================================================
// Competitions
// =============================================================================

/// Competition lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionStatus {
    Draft,
    Active,
    Voting,
    Closed,
}

impl CompetitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Voting => "voting",
            Self::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "voting" => Ok(Self::Voting),
            "closed" => Ok(Self::Closed),
            other => Err(AppError::Validation(format!(
                "Unknown competition status: {}",
                other
            ))),
        }
    }
}

/// Photo competition
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Competition {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub theme: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub voting_end_time: Option<DateTime<Utc>>,
    pub status: String,
    /// JSON object
    pub rules: Option<String>,
    /// JSON object
    pub prizes: Option<String>,
    pub max_submissions: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Competition {
    pub fn status(&self) -> CompetitionStatus {
        CompetitionStatus::parse(&self.status).unwrap_or(CompetitionStatus::Draft)
    }
}

/// Competition fields written on create and update
#[derive(Debug, Clone)]
pub struct CompetitionFields {
    pub name: String,
    pub description: Option<String>,
    pub theme: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub voting_end_time: Option<DateTime<Utc>>,
    pub rules: Option<serde_json::Value>,
    pub prizes: Option<serde_json::Value>,
    pub max_submissions: i64,
}

// =============================================================================
// Configurations and audit log
// =============================================================================

/// Stored dynamic configuration entry
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConfigurationRow {
    pub id: i64,
    pub key: String,
    /// JSON object
    pub value: String,
    pub description: Option<String>,
    pub category: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Audit trail entry
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SystemLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<i64>,
    /// JSON object
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Audit entry to append
#[derive(Debug, Clone)]
pub struct NewSystemLog {
    pub user_id: Option<i64>,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<i64>,
    pub details: Option<serde_json::Value>,
}

impl NewSystemLog {
    pub fn new(user_id: i64, action: &str, resource_type: &str, resource_id: Option<i64>) -> Self {
        Self {
            user_id: Some(user_id),
            action: action.to_string(),
            resource_type: Some(resource_type.to_string()),
            resource_id,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Moderation counters for the admin dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, sqlx::FromRow)]
pub struct ApprovalCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub today_approved: i64,
    pub today_rejected: i64,
}

/// Site-wide totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DashboardCounts {
    pub total_users: i64,
    pub total_photos: i64,
    pub total_competitions: i64,
    pub total_appointments: i64,
    pub active_competitions: i64,
    pub photos_this_month: i64,
    pub users_this_month: i64,
}

/// Analysis columns of one photo
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalysisRow {
    pub id: i64,
    pub title: String,
    pub theme: Option<String>,
    pub confidence: Option<f64>,
    pub quality_score: Option<f64>,
    pub analyzed_at: Option<DateTime<Utc>>,
}

/// Row count per status value
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Aggregate over analysed photos
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct AnalysisCounts {
    pub total_photos: i64,
    pub analyzed_photos: i64,
    pub confident_photos: i64,
    pub average_quality: Option<f64>,
    pub high_quality_count: i64,
    pub medium_quality_count: i64,
    pub low_quality_count: i64,
}

/// Theme frequency
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ThemeCount {
    pub theme: String,
    pub count: i64,
}

// =============================================================================
// Analytics
// =============================================================================

/// Photo and engagement totals for one owner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserPhotoTotals {
    pub total_photos: i64,
    pub approved_photos: i64,
    /// Engagement sums cover approved photos only
    pub total_likes: i64,
    pub total_favorites: i64,
    pub total_views: i64,
}

/// Rows per UTC calendar day (`YYYY-MM-DD`)
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DailyCount {
    pub day: String,
    pub count: i64,
}

/// Interactions of one type
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct KindCount {
    pub kind: String,
    pub count: i64,
}

/// Interactions of one type on one UTC day
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DailyKindCount {
    pub day: String,
    pub kind: String,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ActiveUserCount {
    pub user_id: i64,
    pub interaction_count: i64,
}

/// Approved photo with its like, favorite and vote rows inside a window
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrendingRow {
    #[sqlx(flatten)]
    pub entry: PhotoWithOwner,
    pub recent_count: i64,
}

/// Uploads and engagement of approved photos sharing a theme
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ThemeEngagementRow {
    pub theme: String,
    pub upload_count: i64,
    /// likes + favorites + votes, summed
    pub total_interactions: i64,
    pub avg_interactions: f64,
}

/// Appointments created in one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MonthlyCount {
    pub year: i64,
    pub month: i64,
    pub count: i64,
}
