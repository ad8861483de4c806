//! User directory and profile endpoints

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post, put},
};
use serde::Deserialize;

use super::converters::{owned_photo_to_response, user_to_profile, user_to_response};
use super::dto::{MessageResponse, PageQuery, PhotoResponse, UserProfileResponse, UserResponse};
use crate::AppState;
use crate::auth::{CurrentUser, RequireAdmin};
use crate::data::{PhotoFilter, Role, UserChanges};
use crate::error::AppError;
use crate::service::{AdminUserChanges, Page, Paginated, UserStatistics};

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AdminUpdateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// Create users router
///
/// Routes:
/// - GET /api/users (admin)
/// - GET /api/users/photographers
/// - GET /api/users/me/profile
/// - GET /api/users/me/statistics
/// - PUT /api/users/me
/// - GET|PUT /api/users/:id/profile
/// - PUT /api/users/:id (admin)
/// - POST /api/users/:id/activate, /api/users/:id/deactivate (admin)
/// - GET /api/users/:id/photos
pub fn users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/photographers", get(list_photographers))
        .route("/me", put(update_me))
        .route("/me/profile", get(my_profile))
        .route("/me/statistics", get(my_statistics))
        .route("/:id", put(admin_update_user))
        .route("/:id/profile", get(user_profile).put(update_user_profile))
        .route("/:id/activate", post(activate_user))
        .route("/:id/deactivate", post(deactivate_user))
        .route("/:id/photos", get(user_photos))
}

/// GET /api/users
async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Paginated<UserResponse>>, AppError> {
    let page = Page::new(query.page, query.size)?;
    let role = query.role.as_deref().map(Role::parse).transpose()?;
    let search = query.search.as_deref().filter(|s| !s.trim().is_empty());

    let (users, total) = state.users.list(role, search, page).await?;
    Ok(Json(
        Paginated::new(users, total, page).map(|user| user_to_response(&user)),
    ))
}

/// GET /api/users/photographers
async fn list_photographers(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<UserResponse>>, AppError> {
    let page = query.page()?;
    let (users, total) = state.users.photographers(page).await?;
    Ok(Json(
        Paginated::new(users, total, page).map(|user| user_to_response(&user)),
    ))
}

/// GET /api/users/me/profile
async fn my_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserProfileResponse>, AppError> {
    let (user, photos) = state.users.public_profile(user.id).await?;
    Ok(Json(user_to_profile(&user, photos)))
}

/// GET /api/users/me/statistics
async fn my_statistics(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserStatistics>, AppError> {
    Ok(Json(state.users.statistics(&user).await?))
}

/// PUT /api/users/me
async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(changes): Json<UserChanges>,
) -> Result<Json<UserResponse>, AppError> {
    let updated = state.users.update_profile(&user, user.id, changes).await?;
    Ok(Json(user_to_response(&updated)))
}

/// GET /api/users/:id/profile
async fn user_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserProfileResponse>, AppError> {
    let (user, photos) = state.users.public_profile(id).await?;
    Ok(Json(user_to_profile(&user, photos)))
}

/// PUT /api/users/:id/profile
async fn update_user_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(changes): Json<UserChanges>,
) -> Result<Json<UserResponse>, AppError> {
    let updated = state.users.update_profile(&user, id, changes).await?;
    Ok(Json(user_to_response(&updated)))
}

/// PUT /api/users/:id
async fn admin_update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(req): Json<AdminUpdateRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let changes = AdminUserChanges {
        profile: UserChanges {
            username: req.username,
            email: req.email,
            bio: req.bio,
            avatar_url: req.avatar_url,
        },
        role: req.role.as_deref().map(Role::parse).transpose()?,
        is_active: req.is_active,
    };
    let updated = state.users.admin_update(&admin, id, changes).await?;
    Ok(Json(user_to_response(&updated)))
}

/// POST /api/users/:id/activate
async fn activate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.users.set_active(&admin, id, true).await?;
    Ok(Json(MessageResponse::new("User activated")))
}

/// POST /api/users/:id/deactivate
async fn deactivate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.users.set_active(&admin, id, false).await?;
    Ok(Json(MessageResponse::new("User deactivated")))
}

/// GET /api/users/:id/photos
///
/// Approved photos only, newest first.
async fn user_photos(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<PhotoResponse>>, AppError> {
    let page = query.page()?;
    state.users.public_profile(id).await?;

    let filter = PhotoFilter {
        user_id: Some(id),
        ..PhotoFilter::default()
    };
    let (photos, total) = state.photos.list_approved(&filter, page).await?;
    Ok(Json(
        Paginated::new(photos, total, page).map(|row| owned_photo_to_response(&row)),
    ))
}
