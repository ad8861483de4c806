//! Appointment booking endpoints

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use super::converters::{appointment_detail_to_response, appointment_to_response};
use super::dto::{AppointmentDetailResponse, AppointmentResponse};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{AppointmentChanges, AppointmentStatus, Role};
use crate::error::AppError;
use crate::service::{
    ActionInput, AppointmentAction, AppointmentStatistics, BookingRequest, Page, Paginated,
};

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub photographer_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub preferred_time: DateTime<Utc>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentListQuery {
    pub status_filter: Option<String>,
    pub role_filter: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

/// Status is accepted only to reject it with a pointer to the actions endpoint
#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub preferred_time: Option<DateTime<Utc>>,
    pub actual_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionQuery {
    pub action: Option<String>,
    pub notes: Option<String>,
    pub actual_time: Option<DateTime<Utc>>,
    pub rating: Option<i64>,
    pub review: Option<String>,
}

impl ActionQuery {
    fn input(self) -> ActionInput {
        ActionInput {
            notes: self.notes,
            actual_time: self.actual_time,
            rating: self.rating,
            review: self.review,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Create appointments router
///
/// Routes:
/// - GET|POST /api/appointments
/// - GET /api/appointments/my/statistics
/// - GET /api/appointments/photographer/:id/schedule
/// - GET|PUT /api/appointments/:id
/// - POST /api/appointments/:id/actions?action=
/// - POST /api/appointments/:id/{accept,reject,complete,cancel,rate}
pub fn appointments_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route("/my/statistics", get(my_statistics))
        .route("/photographer/:id/schedule", get(photographer_schedule))
        .route("/:id", get(get_appointment).put(update_appointment))
        .route("/:id/actions", post(dispatch_action))
        .route("/:id/:action", post(named_action))
}

/// GET /api/appointments
async fn list_appointments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Paginated<AppointmentResponse>>, AppError> {
    let page = Page::new(query.page, query.size)?;
    let status = query
        .status_filter
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(AppointmentStatus::parse)
        .transpose()?;
    let role_filter = query
        .role_filter
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(Role::parse)
        .transpose()?;

    let (appointments, total) = state
        .appointments
        .list(&user, page, status, role_filter)
        .await?;
    Ok(Json(
        Paginated::new(appointments, total, page).map(|a| appointment_to_response(&a)),
    ))
}

/// POST /api/appointments
async fn create_appointment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let appointment = state
        .appointments
        .create(
            &user,
            BookingRequest {
                photographer_id: req.photographer_id,
                title: req.title,
                description: req.description,
                preferred_time: req.preferred_time,
                location: req.location,
            },
        )
        .await?;
    Ok(Json(appointment_to_response(&appointment)))
}

/// GET /api/appointments/:id
async fn get_appointment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<AppointmentDetailResponse>, AppError> {
    let detail = state.appointments.detail(&user, id).await?;
    Ok(Json(appointment_detail_to_response(&detail)))
}

/// PUT /api/appointments/:id
async fn update_appointment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    if req.status.is_some() {
        return Err(AppError::Validation(
            "Use /api/appointments/{id}/actions to change status".to_string(),
        ));
    }

    let changes = AppointmentChanges {
        title: req.title,
        description: req.description,
        preferred_time: req.preferred_time,
        actual_time: req.actual_time,
        location: req.location,
        notes: req.notes,
    };
    let appointment = state.appointments.update(&user, id, changes).await?;
    Ok(Json(appointment_to_response(&appointment)))
}

/// POST /api/appointments/:id/actions?action=
async fn dispatch_action(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Query(mut query): Query<ActionQuery>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let action = query
        .action
        .take()
        .ok_or_else(|| AppError::Validation("action is required".to_string()))?;
    let action = AppointmentAction::parse(&action)?;

    let appointment = state
        .appointments
        .perform(&user, id, action, query.input())
        .await?;
    Ok(Json(appointment_to_response(&appointment)))
}

/// POST /api/appointments/:id/{accept,reject,complete,cancel,rate}
async fn named_action(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, action)): Path<(i64, String)>,
    Query(query): Query<ActionQuery>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let action = AppointmentAction::parse(&action)?;
    let appointment = state
        .appointments
        .perform(&user, id, action, query.input())
        .await?;
    Ok(Json(appointment_to_response(&appointment)))
}

/// GET /api/appointments/photographer/:id/schedule
async fn photographer_schedule(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<i64>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<AppointmentResponse>>, AppError> {
    let appointments = state
        .appointments
        .schedule(id, query.start_date, query.end_date)
        .await?;
    Ok(Json(
        appointments.iter().map(appointment_to_response).collect(),
    ))
}

/// GET /api/appointments/my/statistics
async fn my_statistics(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<AppointmentStatistics>, AppError> {
    Ok(Json(state.appointments.statistics(&user).await?))
}
