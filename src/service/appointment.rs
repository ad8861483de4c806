//! Appointment booking and its state machine
//!
//! ```text
//! pending ──accept──▶ accepted ──complete──▶ completed ──rate──▶ completed
//!    │ └──reject──▶ rejected
//!    └──cancel──▶ cancelled
//! ```
//!
//! Every transition is a conditional update on the expected source state.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::{Page, SettingsService, utc_midnight};
use crate::data::{
    Appointment, AppointmentChanges, AppointmentScope, AppointmentStatus, Database,
    NewAppointment, Role, User,
};
use crate::error::AppError;
use crate::metrics::APPOINTMENT_TRANSITIONS_TOTAL;

const MAX_TITLE_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentAction {
    Accept,
    Reject,
    Complete,
    Cancel,
    Rate,
}

impl AppointmentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::Rate => "rate",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            "complete" => Ok(Self::Complete),
            "cancel" => Ok(Self::Cancel),
            "rate" => Ok(Self::Rate),
            other => Err(AppError::Validation(format!("Unknown action: {}", other))),
        }
    }

    /// (from, to) for status-changing actions
    fn edge(&self) -> Option<(AppointmentStatus, AppointmentStatus)> {
        use AppointmentStatus::*;
        match self {
            Self::Accept => Some((Pending, Accepted)),
            Self::Reject => Some((Pending, Rejected)),
            Self::Complete => Some((Accepted, Completed)),
            Self::Cancel => Some((Pending, Cancelled)),
            Self::Rate => None,
        }
    }

    fn allowed(&self, caller: &User, appointment: &Appointment) -> bool {
        match self {
            Self::Accept | Self::Reject | Self::Complete => {
                caller.id == appointment.photographer_id
            }
            Self::Cancel => {
                caller.is_admin()
                    || caller.id == appointment.student_id
                    || caller.id == appointment.photographer_id
            }
            Self::Rate => caller.id == appointment.student_id,
        }
    }
}

/// Optional inputs carried by an action
#[derive(Debug, Clone, Default)]
pub struct ActionInput {
    pub notes: Option<String>,
    pub actual_time: Option<DateTime<Utc>>,
    pub rating: Option<i64>,
    pub review: Option<String>,
}

/// Booking request from a student
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub photographer_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub preferred_time: DateTime<Utc>,
    pub location: Option<String>,
}

/// Appointment with both parties and caller-specific hints
#[derive(Debug, Clone)]
pub struct AppointmentDetail {
    pub appointment: Appointment,
    pub student: User,
    pub photographer: User,
    pub can_cancel: bool,
    pub can_rate: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppointmentStatistics {
    pub total: i64,
    pub pending: i64,
    pub accepted: i64,
    pub rejected: i64,
    pub completed: i64,
    pub cancelled: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ratings: Option<i64>,
}

fn validate_title(title: &str) -> Result<(), AppError> {
    let length = title.trim().chars().count();
    if length == 0 || length > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "title must be 1 to {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

/// Appointment service
pub struct AppointmentService {
    db: Arc<Database>,
    settings: Arc<SettingsService>,
}

impl AppointmentService {
    pub fn new(db: Arc<Database>, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    /// Book a photographer
    ///
    /// # Errors
    /// - `NotFound` unless the photographer exists, is active and has the
    ///   photographer role
    /// - `Validation` for a past or too-distant time, a double booking, a
    ///   full day, or booking oneself
    pub async fn create(
        &self,
        student: &User,
        request: BookingRequest,
    ) -> Result<Appointment, AppError> {
        validate_title(&request.title)?;
        if request.photographer_id == student.id {
            return Err(AppError::Validation(
                "You cannot book an appointment with yourself".to_string(),
            ));
        }

        let photographer = self
            .db
            .get_user(request.photographer_id)
            .await?
            .filter(|user| user.is_active && user.role() == Role::Photographer)
            .ok_or(AppError::NotFound)?;

        let settings = self.settings.appointment_settings().await?;
        let now = Utc::now();
        if request.preferred_time <= now {
            return Err(AppError::Validation(
                "preferred_time must be in the future".to_string(),
            ));
        }
        if request.preferred_time > now + Duration::days(settings.advance_booking_days) {
            return Err(AppError::Validation(format!(
                "Appointments can be booked at most {} days ahead",
                settings.advance_booking_days
            )));
        }
        if self
            .db
            .photographer_slot_taken(photographer.id, request.preferred_time, None)
            .await?
        {
            return Err(AppError::Validation(
                "The photographer already has an appointment at that time".to_string(),
            ));
        }

        let day_start = utc_midnight(request.preferred_time);
        let booked = self
            .db
            .count_open_bookings_between(photographer.id, day_start, day_start + Duration::days(1))
            .await?;
        if booked >= settings.max_daily_appointments {
            return Err(AppError::Validation(
                "The photographer is fully booked on that day".to_string(),
            ));
        }

        let appointment = self
            .db
            .insert_appointment(&NewAppointment {
                student_id: student.id,
                photographer_id: photographer.id,
                title: request.title.trim().to_string(),
                description: request.description,
                preferred_time: request.preferred_time,
                location: request.location,
            })
            .await?;

        tracing::info!(
            appointment_id = appointment.id,
            student_id = student.id,
            photographer_id = photographer.id,
            "Appointment booked"
        );
        Ok(appointment)
    }

    /// Bookings visible to `caller`, newest first
    ///
    /// Students see their bookings and photographers their assignments.
    /// Admins see everything unless `role_filter` narrows it to their own
    /// side.
    pub async fn list(
        &self,
        caller: &User,
        page: Page,
        status: Option<AppointmentStatus>,
        role_filter: Option<Role>,
    ) -> Result<(Vec<Appointment>, i64), AppError> {
        let scope = match caller.role() {
            Role::Student => AppointmentScope::AsStudent(caller.id),
            Role::Photographer => AppointmentScope::AsPhotographer(caller.id),
            Role::Admin => match role_filter {
                Some(Role::Student) => AppointmentScope::AsStudent(caller.id),
                Some(Role::Photographer) => AppointmentScope::AsPhotographer(caller.id),
                _ => AppointmentScope::All,
            },
        };

        self.db
            .list_appointments(scope, status, page.limit(), page.offset())
            .await
    }

    pub async fn detail(&self, caller: &User, id: i64) -> Result<AppointmentDetail, AppError> {
        let appointment = self.load(id).await?;
        if !is_party_or_admin(caller, &appointment) {
            return Err(AppError::Forbidden);
        }

        let student = self
            .db
            .get_user(appointment.student_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let photographer = self
            .db
            .get_user(appointment.photographer_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let settings = self.settings.appointment_settings().await?;
        let can_cancel = appointment.status() == AppointmentStatus::Pending
            && AppointmentAction::Cancel.allowed(caller, &appointment)
            && outside_cancellation_window(&appointment, settings.cancellation_hours, Utc::now());
        let can_rate = appointment.status() == AppointmentStatus::Completed
            && appointment.rating.is_none()
            && caller.id == appointment.student_id;

        Ok(AppointmentDetail {
            appointment,
            student,
            photographer,
            can_cancel,
            can_rate,
        })
    }

    /// Edit booking details; status changes go through [`Self::perform`]
    pub async fn update(
        &self,
        caller: &User,
        id: i64,
        changes: AppointmentChanges,
    ) -> Result<Appointment, AppError> {
        let appointment = self.load(id).await?;
        let allowed = caller.is_admin()
            || caller.id == appointment.photographer_id
            || (caller.id == appointment.student_id
                && appointment.status() == AppointmentStatus::Pending);
        if !allowed {
            return Err(AppError::Forbidden);
        }

        if let Some(title) = &changes.title {
            validate_title(title)?;
        }
        if let Some(preferred_time) = changes.preferred_time {
            if preferred_time <= Utc::now() {
                return Err(AppError::Validation(
                    "preferred_time must be in the future".to_string(),
                ));
            }
            if self
                .db
                .photographer_slot_taken(appointment.photographer_id, preferred_time, Some(id))
                .await?
            {
                return Err(AppError::Validation(
                    "The photographer already has an appointment at that time".to_string(),
                ));
            }
        }

        self.db
            .update_appointment(id, &changes)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Run one state machine action
    ///
    /// # Errors
    /// - `NotFound` for an unknown appointment
    /// - `Forbidden` when `caller` may not perform `action`
    /// - `Validation` for a disallowed transition, a cancellation inside the
    ///   notice window, an invalid or repeated rating, or a lost race
    pub async fn perform(
        &self,
        caller: &User,
        id: i64,
        action: AppointmentAction,
        input: ActionInput,
    ) -> Result<Appointment, AppError> {
        let appointment = self.load(id).await?;
        if !action.allowed(caller, &appointment) {
            return Err(AppError::Forbidden);
        }

        let updated = match action.edge() {
            Some((from, to)) => {
                self.transition(caller, &appointment, action, from, to, input)
                    .await?
            }
            None => self.rate(&appointment, input).await?,
        };

        APPOINTMENT_TRANSITIONS_TOTAL
            .with_label_values(&[action.as_str()])
            .inc();
        tracing::info!(
            appointment_id = id,
            user_id = caller.id,
            action = action.as_str(),
            status = %updated.status,
            "Appointment updated"
        );
        Ok(updated)
    }

    /// Open bookings of a photographer between two dates, inclusive
    pub async fn schedule(
        &self,
        photographer_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppError> {
        if end_date < start_date {
            return Err(AppError::Validation(
                "end_date must not be before start_date".to_string(),
            ));
        }

        let start = start_date.and_time(chrono::NaiveTime::MIN).and_utc();
        let end = end_date.and_time(chrono::NaiveTime::MIN).and_utc() + Duration::days(1);
        self.db
            .photographer_schedule(photographer_id, start, end)
            .await
    }

    pub async fn statistics(&self, caller: &User) -> Result<AppointmentStatistics, AppError> {
        let scope = match caller.role() {
            Role::Student => AppointmentScope::AsStudent(caller.id),
            Role::Photographer => AppointmentScope::AsPhotographer(caller.id),
            Role::Admin => AppointmentScope::All,
        };

        let mut stats = AppointmentStatistics::default();
        for row in self.db.appointment_status_counts(scope).await? {
            stats.total += row.count;
            match AppointmentStatus::parse(&row.status) {
                Ok(AppointmentStatus::Pending) => stats.pending = row.count,
                Ok(AppointmentStatus::Accepted) => stats.accepted = row.count,
                Ok(AppointmentStatus::Rejected) => stats.rejected = row.count,
                Ok(AppointmentStatus::Completed) => stats.completed = row.count,
                Ok(AppointmentStatus::Cancelled) => stats.cancelled = row.count,
                Err(_) => {}
            }
        }

        if caller.role() == Role::Photographer {
            let (average, count) = self.db.photographer_rating(caller.id).await?;
            stats.avg_rating = Some(average.map_or(0.0, |avg| (avg * 100.0).round() / 100.0));
            stats.total_ratings = Some(count);
        }

        Ok(stats)
    }

    async fn load(&self, id: i64) -> Result<Appointment, AppError> {
        self.db.get_appointment(id).await?.ok_or(AppError::NotFound)
    }

    async fn transition(
        &self,
        caller: &User,
        appointment: &Appointment,
        action: AppointmentAction,
        from: AppointmentStatus,
        to: AppointmentStatus,
        input: ActionInput,
    ) -> Result<Appointment, AppError> {
        if appointment.status() != from {
            tracing::warn!(
                appointment_id = appointment.id,
                action = action.as_str(),
                status = %appointment.status,
                "Refused appointment transition"
            );
            return Err(AppError::Validation(format!(
                "Cannot {} an appointment that is {}",
                action.as_str(),
                appointment.status
            )));
        }

        if action == AppointmentAction::Cancel {
            let settings = self.settings.appointment_settings().await?;
            if !outside_cancellation_window(appointment, settings.cancellation_hours, Utc::now()) {
                tracing::warn!(
                    appointment_id = appointment.id,
                    user_id = caller.id,
                    "Cancellation inside notice window"
                );
                return Err(AppError::Validation(format!(
                    "Appointments can only be cancelled more than {} hours in advance",
                    settings.cancellation_hours
                )));
            }
        }

        let actual_time = match action {
            AppointmentAction::Accept => {
                Some(input.actual_time.unwrap_or(appointment.preferred_time))
            }
            _ => input.actual_time,
        };

        self.db
            .transition_appointment(appointment.id, from, to, input.notes.as_deref(), actual_time)
            .await?
            .ok_or_else(|| {
                AppError::Validation("Appointment was modified concurrently".to_string())
            })
    }

    async fn rate(
        &self,
        appointment: &Appointment,
        input: ActionInput,
    ) -> Result<Appointment, AppError> {
        let rating = input
            .rating
            .ok_or_else(|| AppError::Validation("rating is required".to_string()))?;
        if !(1..=5).contains(&rating) {
            return Err(AppError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
        if appointment.status() != AppointmentStatus::Completed {
            return Err(AppError::Validation(
                "Only completed appointments can be rated".to_string(),
            ));
        }
        if appointment.rating.is_some() {
            return Err(AppError::Validation(
                "Appointment has already been rated".to_string(),
            ));
        }

        self.db
            .rate_appointment(appointment.id, rating, input.review.as_deref())
            .await?
            .ok_or_else(|| AppError::Validation("Appointment has already been rated".to_string()))
    }
}

fn is_party_or_admin(caller: &User, appointment: &Appointment) -> bool {
    caller.is_admin()
        || caller.id == appointment.student_id
        || caller.id == appointment.photographer_id
}

/// A booking can be cancelled only while more than the notice window remains
fn outside_cancellation_window(
    appointment: &Appointment,
    cancellation_hours: i64,
    now: DateTime<Utc>,
) -> bool {
    appointment.preferred_time > now + Duration::hours(cancellation_hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appointment(status: AppointmentStatus, preferred_time: DateTime<Utc>) -> Appointment {
        Appointment {
            id: 1,
            student_id: 10,
            photographer_id: 20,
            title: "Graduation shoot".to_string(),
            description: None,
            preferred_time,
            actual_time: None,
            location: None,
            status: status.as_str().to_string(),
            notes: None,
            rating: None,
            review: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            role: role.as_str().to_string(),
            avatar_url: None,
            bio: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn action_names_round_trip() {
        for name in ["accept", "reject", "complete", "cancel", "rate"] {
            assert_eq!(AppointmentAction::parse(name).unwrap().as_str(), name);
        }
        assert!(AppointmentAction::parse("reschedule").is_err());
    }

    #[test]
    fn only_the_photographer_accepts() {
        let booking = appointment(AppointmentStatus::Pending, Utc::now());
        assert!(AppointmentAction::Accept.allowed(&user(20, Role::Photographer), &booking));
        assert!(!AppointmentAction::Accept.allowed(&user(10, Role::Student), &booking));
        assert!(!AppointmentAction::Accept.allowed(&user(99, Role::Admin), &booking));
    }

    #[test]
    fn cancel_is_open_to_both_parties_and_admins() {
        let booking = appointment(AppointmentStatus::Pending, Utc::now());
        assert!(AppointmentAction::Cancel.allowed(&user(10, Role::Student), &booking));
        assert!(AppointmentAction::Cancel.allowed(&user(20, Role::Photographer), &booking));
        assert!(AppointmentAction::Cancel.allowed(&user(99, Role::Admin), &booking));
        assert!(!AppointmentAction::Cancel.allowed(&user(11, Role::Student), &booking));
    }

    #[test]
    fn only_the_student_rates() {
        let booking = appointment(AppointmentStatus::Completed, Utc::now());
        assert!(AppointmentAction::Rate.allowed(&user(10, Role::Student), &booking));
        assert!(!AppointmentAction::Rate.allowed(&user(20, Role::Photographer), &booking));
    }

    #[test]
    fn cancellation_window_boundary() {
        let now = Utc::now();
        let inside = appointment(AppointmentStatus::Pending, now + Duration::hours(23));
        let boundary = appointment(AppointmentStatus::Pending, now + Duration::hours(24));
        let outside = appointment(AppointmentStatus::Pending, now + Duration::hours(25));

        assert!(!outside_cancellation_window(&inside, 24, now));
        assert!(!outside_cancellation_window(&boundary, 24, now));
        assert!(outside_cancellation_window(&outside, 24, now));
    }

    #[test]
    fn transition_table() {
        use AppointmentStatus::*;
        assert_eq!(AppointmentAction::Accept.edge(), Some((Pending, Accepted)));
        assert_eq!(AppointmentAction::Complete.edge(), Some((Accepted, Completed)));
        assert_eq!(AppointmentAction::Cancel.edge(), Some((Pending, Cancelled)));
        assert_eq!(AppointmentAction::Rate.edge(), None);
    }
}
