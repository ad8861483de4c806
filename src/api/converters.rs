//! Conversion functions from database models to API DTOs

use crate::api::dto::*;
use crate::data::{
    AnalysisRow, Appointment, Competition, ConfigurationRow, LeaderboardRow, Photo,
    PhotoWithOwner, SystemLog, User, UserSummary,
};
use crate::service::{AnalysisReport, AppointmentDetail, CompetitionDetail, PhotoDetail};

/// Parse a stored JSON column, dropping values that no longer parse
fn json_column(raw: Option<&str>) -> Option<serde_json::Value> {
    raw.and_then(|text| serde_json::from_str(text).ok())
}

pub fn user_to_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role.clone(),
        avatar_url: user.avatar_url.clone(),
        bio: user.bio.clone(),
        is_active: user.is_active,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

pub fn user_to_profile(user: &User, photos_count: i64) -> UserProfileResponse {
    UserProfileResponse {
        user: user_to_response(user),
        photos_count,
        followers_count: 0,
        following_count: 0,
    }
}

pub fn photo_to_response(photo: &Photo) -> PhotoResponse {
    PhotoResponse {
        id: photo.id,
        user_id: photo.user_id,
        title: photo.title.clone(),
        description: photo.description.clone(),
        image_url: photo.image_url.clone(),
        thumbnail_url: photo.thumbnail_url.clone(),
        theme: photo.theme.clone(),
        confidence: photo.confidence,
        quality_score: photo.quality_score,
        analyzed_at: photo.analyzed_at,
        views: photo.views,
        likes: photo.likes,
        favorites: photo.favorites,
        votes: photo.votes,
        heat_score: photo.heat_score,
        competition_id: photo.competition_id,
        approval_status: photo.approval_status.clone(),
        approval_notes: photo.approval_notes.clone(),
        approved_by: photo.approved_by,
        approved_at: photo.approved_at,
        is_approved: photo.is_approved(),
        uploaded_at: photo.uploaded_at,
        updated_at: photo.updated_at,
        user: None,
    }
}

/// Photo with the owner summary attached
pub fn owned_photo_to_response(row: &PhotoWithOwner) -> PhotoResponse {
    PhotoResponse {
        user: Some(UserSummary {
            id: row.photo.user_id,
            username: row.owner_username.clone(),
            avatar_url: row.owner_avatar_url.clone(),
        }),
        ..photo_to_response(&row.photo)
    }
}

pub fn photo_detail_to_response(detail: &PhotoDetail) -> PhotoDetailResponse {
    PhotoDetailResponse {
        photo: owned_photo_to_response(&detail.photo),
        competition: detail.competition.as_ref().map(competition_to_response),
        is_liked: detail.flags.liked,
        is_favorited: detail.flags.favorited,
        is_voted: detail.flags.voted,
    }
}

pub fn appointment_to_response(appointment: &Appointment) -> AppointmentResponse {
    AppointmentResponse {
        id: appointment.id,
        student_id: appointment.student_id,
        photographer_id: appointment.photographer_id,
        title: appointment.title.clone(),
        description: appointment.description.clone(),
        preferred_time: appointment.preferred_time,
        actual_time: appointment.actual_time,
        location: appointment.location.clone(),
        status: appointment.status.clone(),
        notes: appointment.notes.clone(),
        rating: appointment.rating,
        review: appointment.review.clone(),
        created_at: appointment.created_at,
        updated_at: appointment.updated_at,
    }
}

pub fn appointment_detail_to_response(detail: &AppointmentDetail) -> AppointmentDetailResponse {
    AppointmentDetailResponse {
        appointment: appointment_to_response(&detail.appointment),
        student: user_to_response(&detail.student),
        photographer: user_to_response(&detail.photographer),
        can_cancel: detail.can_cancel,
        can_rate: detail.can_rate,
    }
}

pub fn competition_to_response(competition: &Competition) -> CompetitionResponse {
    CompetitionResponse {
        id: competition.id,
        name: competition.name.clone(),
        description: competition.description.clone(),
        theme: competition.theme.clone(),
        start_time: competition.start_time,
        end_time: competition.end_time,
        voting_end_time: competition.voting_end_time,
        status: competition.status.clone(),
        rules: json_column(competition.rules.as_deref()),
        prizes: json_column(competition.prizes.as_deref()),
        max_submissions: competition.max_submissions,
        created_at: competition.created_at,
        updated_at: competition.updated_at,
    }
}

pub fn competition_detail_to_response(detail: &CompetitionDetail) -> CompetitionDetailResponse {
    CompetitionDetailResponse {
        competition: competition_to_response(&detail.competition),
        photos_count: detail.photos_count,
        participants_count: detail.participants_count,
        photos: detail.photos.iter().map(owned_photo_to_response).collect(),
    }
}

pub fn leaderboard_to_response(rows: Vec<LeaderboardRow>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| LeaderboardEntry {
            rank: index + 1,
            photo_id: row.id,
            title: row.title,
            image_url: row.image_url,
            thumbnail_url: row.thumbnail_url,
            likes: row.likes,
            votes: row.votes,
            views: row.views,
            score: row.score,
            user: UserSummary {
                id: row.user_id,
                username: row.username,
                avatar_url: row.avatar_url,
            },
        })
        .collect()
}

pub fn configuration_to_response(row: &ConfigurationRow) -> ConfigurationResponse {
    ConfigurationResponse {
        id: row.id,
        key: row.key.clone(),
        value: json_column(Some(&row.value)).unwrap_or(serde_json::Value::Null),
        description: row.description.clone(),
        category: row.category.clone(),
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub fn system_log_to_response(log: &SystemLog) -> SystemLogResponse {
    SystemLogResponse {
        id: log.id,
        user_id: log.user_id,
        action: log.action.clone(),
        resource_type: log.resource_type.clone(),
        resource_id: log.resource_id,
        details: json_column(log.details.as_deref()),
        ip_address: log.ip_address.clone(),
        user_agent: log.user_agent.clone(),
        created_at: log.created_at,
    }
}

fn analysis_row_to_response(row: AnalysisRow) -> RecentAnalysisResponse {
    RecentAnalysisResponse {
        id: row.id,
        title: row.title,
        category: row.theme,
        confidence: row.confidence,
        quality_score: row.quality_score,
        analyzed_at: row.analyzed_at,
    }
}

pub fn analysis_report_to_response(report: AnalysisReport) -> AnalysisReportResponse {
    AnalysisReportResponse {
        total_photos: report.total_photos,
        analyzed_photos: report.analyzed_photos,
        analysis_accuracy: report.analysis_accuracy,
        category_distribution: report.category_distribution,
        quality_stats: report.quality_stats,
        recent_analysis: report
            .recent_analysis
            .into_iter()
            .map(analysis_row_to_response)
            .collect(),
        system_performance: report.system_performance,
    }
}
