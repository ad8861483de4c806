//! Registration, login and session endpoints

use axum::{Router, extract::State, response::Json, routing::{get, post}};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Deserialize;

use super::converters::user_to_response;
use super::dto::{MessageResponse, TokenResponse, UserResponse};
use crate::AppState;
use crate::auth::{CurrentUser, TOKEN_COOKIE};
use crate::data::{Role, User};
use crate::error::AppError;
use crate::service::{IssuedToken, Registration};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub bio: Option<String>,
}

/// `username` may also hold an email address
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Create auth router
///
/// Routes:
/// - POST /api/auth/register
/// - POST /api/auth/login
/// - GET /api/auth/me
/// - POST /api/auth/refresh
/// - POST /api/auth/logout
/// - POST /api/auth/change-password
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
}

fn token_cookie(token: &IssuedToken) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token.access_token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn token_response(user: &User, token: IssuedToken) -> TokenResponse {
    TokenResponse {
        access_token: token.access_token,
        token_type: "bearer",
        expires_in: token.expires_in,
        user: user_to_response(user),
    }
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let role = req.role.as_deref().map(Role::parse).transpose()?;
    let user = state
        .users
        .register(Registration {
            username: req.username,
            email: req.email,
            password: req.password,
            role,
            bio: req.bio,
        })
        .await?;
    Ok(Json(user_to_response(&user)))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), AppError> {
    let (user, token) = state.users.login(&req.username, &req.password).await?;
    let jar = jar.add(token_cookie(&token));
    Ok((jar, Json(token_response(&user, token))))
}

/// GET /api/auth/me
async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user_to_response(&user))
}

/// POST /api/auth/refresh
async fn refresh(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<TokenResponse>), AppError> {
    let token = state.users.issue_token(&user)?;
    let jar = jar.add(token_cookie(&token));
    Ok((jar, Json(token_response(&user, token))))
}

/// POST /api/auth/logout
///
/// Tokens are stateless; this only drops the cookie.
async fn logout(
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    tracing::info!(user_id = user.id, "User logged out");
    let jar = jar.remove(Cookie::build(TOKEN_COOKIE).path("/").build());
    (jar, Json(MessageResponse::new("Logged out")))
}

/// POST /api/auth/change-password
async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .users
        .change_password(&user, &req.old_password, &req.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Password changed")))
}
