//! Accounts, credentials and profiles

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use super::{Page, SettingsService};
use crate::auth::password::{
    hash_password_blocking, validate_password_strength, verify_password_blocking,
};
use crate::auth::{Session, create_session_token};
use crate::config::{AdminConfig, AuthConfig};
use crate::data::{ApprovalStatus, Database, NewSystemLog, NewUser, Role, User, UserChanges};
use crate::error::AppError;

/// Self-service sign-up
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub bio: Option<String>,
}

/// Issued access token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStatistics {
    pub total_photos: i64,
    pub approved_photos: i64,
    pub pending_photos: i64,
    pub rejected_photos: i64,
    pub total_likes: i64,
    pub total_views: i64,
}

/// Admin-only changes on top of profile fields
#[derive(Debug, Clone, Default)]
pub struct AdminUserChanges {
    pub profile: UserChanges,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

fn validate_username(username: &str) -> Result<(), AppError> {
    let length = username.chars().count();
    if !(3..=50).contains(&length) {
        return Err(AppError::Validation(
            "username must be 3 to 50 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::Validation("email address is invalid".to_string())),
    }
}

/// User service
pub struct UserService {
    db: Arc<Database>,
    settings: Arc<SettingsService>,
    auth: AuthConfig,
}

impl UserService {
    pub fn new(db: Arc<Database>, settings: Arc<SettingsService>, auth: AuthConfig) -> Self {
        Self { db, settings, auth }
    }

    /// Create a student or photographer account
    ///
    /// # Errors
    /// `Validation` for an admin role, a taken username or email, or a
    /// password below the configured minimum length
    pub async fn register(&self, registration: Registration) -> Result<User, AppError> {
        let role = registration.role.unwrap_or(Role::Student);
        if role == Role::Admin {
            return Err(AppError::Validation(
                "Cannot register an admin account".to_string(),
            ));
        }

        let username = registration.username.trim().to_string();
        let email = registration.email.trim().to_string();
        validate_username(&username)?;
        validate_email(&email)?;
        validate_password_strength(
            &registration.password,
            self.settings.password_min_length().await?,
        )?;

        if self.db.username_taken(&username, None).await? {
            return Err(AppError::Validation("Username already exists".to_string()));
        }
        if self.db.email_taken(&email, None).await? {
            return Err(AppError::Validation("Email already registered".to_string()));
        }

        let password_hash = hash_password_blocking(registration.password).await?;
        let user = self
            .db
            .insert_user(&NewUser {
                username,
                email,
                password_hash,
                role,
                bio: registration.bio,
            })
            .await?;

        tracing::info!(user_id = user.id, role = role.as_str(), "User registered");
        Ok(user)
    }

    /// Check credentials by username or email
    ///
    /// # Errors
    /// `Unauthorized` for unknown users or wrong passwords, `Validation` for
    /// deactivated accounts
    pub async fn login(
        &self,
        login: &str,
        password: &str,
    ) -> Result<(User, IssuedToken), AppError> {
        let Some(user) = self.db.get_user_by_login(login.trim()).await? else {
            return Err(AppError::Unauthorized);
        };
        if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
            tracing::warn!(user_id = user.id, "Failed login");
            return Err(AppError::Unauthorized);
        }
        if !user.is_active {
            return Err(AppError::Validation("Account is disabled".to_string()));
        }

        let token = self.issue_token(&user)?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((user, token))
    }

    pub fn issue_token(&self, user: &User) -> Result<IssuedToken, AppError> {
        let session = Session::for_user(user, self.auth.token_ttl_seconds);
        Ok(IssuedToken {
            access_token: create_session_token(&session, &self.auth.session_secret)?,
            expires_in: session.expires_in(),
        })
    }

    pub async fn change_password(
        &self,
        user: &User,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        if !verify_password_blocking(old_password.to_string(), user.password_hash.clone()).await? {
            return Err(AppError::Validation("Old password is incorrect".to_string()));
        }
        validate_password_strength(new_password, self.settings.password_min_length().await?)?;

        let hash = hash_password_blocking(new_password.to_string()).await?;
        self.db.update_password_hash(user.id, &hash).await?;
        tracing::info!(user_id = user.id, "Password changed");
        Ok(())
    }

    /// Active user with the number of approved photos
    pub async fn public_profile(&self, id: i64) -> Result<(User, i64), AppError> {
        let user = self
            .db
            .get_user(id)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AppError::NotFound)?;
        let photos = self
            .db
            .count_user_photos(id, Some(ApprovalStatus::Approved))
            .await?;
        Ok((user, photos))
    }

    /// Update profile fields of `target_id`; callers may edit themselves,
    /// admins anyone
    pub async fn update_profile(
        &self,
        caller: &User,
        target_id: i64,
        changes: UserChanges,
    ) -> Result<User, AppError> {
        if caller.id != target_id && !caller.is_admin() {
            return Err(AppError::Forbidden);
        }
        let changes = self.check_profile_changes(target_id, changes).await?;

        self.db
            .update_user_profile(target_id, &changes)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Admin edit including role and active flag
    pub async fn admin_update(
        &self,
        admin: &User,
        target_id: i64,
        changes: AdminUserChanges,
    ) -> Result<User, AppError> {
        if !admin.is_admin() {
            return Err(AppError::Forbidden);
        }
        self.db.get_user(target_id).await?.ok_or(AppError::NotFound)?;

        let profile = self.check_profile_changes(target_id, changes.profile).await?;
        self.db.update_user_profile(target_id, &profile).await?;
        if let Some(role) = changes.role {
            self.db.set_user_role(target_id, role).await?;
        }
        if let Some(active) = changes.is_active {
            self.set_active(admin, target_id, active).await?;
        }

        self.db.get_user(target_id).await?.ok_or(AppError::NotFound)
    }

    /// Enable or disable an account
    pub async fn set_active(
        &self,
        admin: &User,
        target_id: i64,
        active: bool,
    ) -> Result<(), AppError> {
        if !admin.is_admin() {
            return Err(AppError::Forbidden);
        }
        if !active && admin.id == target_id {
            return Err(AppError::Validation(
                "You cannot deactivate your own account".to_string(),
            ));
        }
        if !self.db.set_user_active(target_id, active).await? {
            return Err(AppError::NotFound);
        }

        let action = if active { "activate_user" } else { "deactivate_user" };
        self.db
            .insert_system_log(
                &NewSystemLog::new(admin.id, action, "user", Some(target_id))
                    .with_details(json!({ "is_active": active })),
            )
            .await?;
        tracing::info!(user_id = target_id, admin_id = admin.id, active, "User status changed");
        Ok(())
    }

    pub async fn list(
        &self,
        role: Option<Role>,
        search: Option<&str>,
        page: Page,
    ) -> Result<(Vec<User>, i64), AppError> {
        self.db
            .list_users(role, search, false, page.limit(), page.offset())
            .await
    }

    /// Active photographers available for booking
    pub async fn photographers(&self, page: Page) -> Result<(Vec<User>, i64), AppError> {
        self.db
            .list_users(Some(Role::Photographer), None, true, page.limit(), page.offset())
            .await
    }

    pub async fn statistics(&self, user: &User) -> Result<UserStatistics, AppError> {
        let total_photos = self.db.count_user_photos(user.id, None).await?;
        let approved_photos = self
            .db
            .count_user_photos(user.id, Some(ApprovalStatus::Approved))
            .await?;
        let pending_photos = self
            .db
            .count_user_photos(user.id, Some(ApprovalStatus::Pending))
            .await?;
        let rejected_photos = self
            .db
            .count_user_photos(user.id, Some(ApprovalStatus::Rejected))
            .await?;
        let (total_likes, total_views) = self.db.user_engagement_totals(user.id).await?;

        Ok(UserStatistics {
            total_photos,
            approved_photos,
            pending_photos,
            rejected_photos,
            total_likes,
            total_views,
        })
    }

    /// Create the bootstrap admin, or bring its credentials in line with
    /// configuration
    pub async fn ensure_admin(&self, admin: &AdminConfig) -> Result<User, AppError> {
        let password_hash = hash_password_blocking(admin.password.clone()).await?;

        match self.db.get_user_by_username(&admin.username).await? {
            Some(existing) => {
                self.db
                    .sync_admin_credentials(existing.id, &admin.email, &password_hash)
                    .await?;
                tracing::info!(user_id = existing.id, "Admin credentials synced");
                self.db.get_user(existing.id).await?.ok_or(AppError::NotFound)
            }
            None => {
                let user = self
                    .db
                    .insert_user(&NewUser {
                        username: admin.username.clone(),
                        email: admin.email.clone(),
                        password_hash,
                        role: Role::Admin,
                        bio: None,
                    })
                    .await?;
                tracing::info!(
                    user_id = user.id,
                    username = %user.username,
                    "Admin account created"
                );
                Ok(user)
            }
        }
    }

    async fn check_profile_changes(
        &self,
        target_id: i64,
        mut changes: UserChanges,
    ) -> Result<UserChanges, AppError> {
        if let Some(username) = changes.username.as_mut() {
            *username = username.trim().to_string();
            validate_username(username)?;
            if self.db.username_taken(username, Some(target_id)).await? {
                return Err(AppError::Validation("Username already exists".to_string()));
            }
        }
        if let Some(email) = changes.email.as_mut() {
            *email = email.trim().to_string();
            validate_email(email)?;
            if self.db.email_taken(email, Some(target_id)).await? {
                return Err(AppError::Validation("Email already registered".to_string()));
            }
        }
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_length_bounds() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("abc").is_ok());
        assert!(validate_username(&"a".repeat(50)).is_ok());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn email_needs_both_sides_of_the_at() {
        assert!(validate_email("student@campus.edu").is_ok());
        assert!(validate_email("@campus.edu").is_err());
        assert!(validate_email("student@").is_err());
        assert!(validate_email("student").is_err());
    }
}
