//! API layer
//!
//! HTTP handlers for:
//! - Authentication and user profiles
//! - Photos, rankings and competitions
//! - Appointment booking
//! - Admin moderation and configuration
//! - Analytics reports
//! - Cache strategy experiments
//! - Metrics (Prometheus)

mod admin;
mod analytics;
mod appointments;
mod auth;
mod competitions;
mod converters;
mod dto;
mod experiment;
pub mod metrics;
mod photos;
mod rankings;
mod users;

pub use converters::*;
pub use dto::*;

pub use admin::admin_router;
pub use analytics::analytics_router;
pub use appointments::appointments_router;
pub use auth::auth_router;
pub use competitions::competitions_router;
pub use experiment::experiment_router;
pub use metrics::metrics_router;
pub use photos::photos_router;
pub use rankings::rankings_router;
pub use users::users_router;

use axum::Router;

use crate::AppState;

/// Every JSON endpoint, to be nested under `/api`
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_router())
        .nest("/users", users_router())
        .nest("/photos", photos_router())
        .nest("/rankings", rankings_router())
        .nest("/appointments", appointments_router())
        .nest("/competitions", competitions_router())
        .nest("/admin", admin_router())
        .nest("/analytics", analytics_router())
        .nest("/experiment", experiment_router())
}
