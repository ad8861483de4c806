//! Dynamic settings
//!
//! Runtime-tunable values stored in the `configurations` table. Every key has
//! a built-in default that is seeded on first start and used whenever the
//! stored value is missing, inactive or malformed.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::data::{ConfigurationRow, Database, HeatWeights, NewSystemLog, Role};
use crate::error::AppError;

struct SettingDefault {
    key: &'static str,
    category: &'static str,
    description: &'static str,
    value: Value,
}

fn defaults() -> Vec<SettingDefault> {
    vec![
        SettingDefault {
            key: "daily_upload_limit",
            category: "upload",
            description: "Photos a user may upload per UTC day",
            value: json!({"value": 5, "enabled": true}),
        },
        SettingDefault {
            key: "max_file_size",
            category: "upload",
            description: "Largest accepted upload in bytes",
            value: json!({"value": 10_485_760, "enabled": true}),
        },
        SettingDefault {
            key: "allowed_extensions",
            category: "upload",
            description: "Accepted file extensions",
            value: json!({"value": ["jpg", "jpeg", "png", "webp"], "enabled": true}),
        },
        SettingDefault {
            key: "ranking_weights",
            category: "ranking",
            description: "Heat score weights per interaction type",
            value: json!({"like": 0.4, "view": 0.3, "favorite": 0.2, "vote": 0.1}),
        },
        SettingDefault {
            key: "competition_rules",
            category: "competition",
            description: "Defaults applied to new competitions",
            value: json!({
                "max_submissions_per_user": 3,
                "min_voting_period_hours": 24,
                "allow_late_submissions": false,
                "require_approval": true
            }),
        },
        SettingDefault {
            key: "role_permissions",
            category: "general",
            description: "Capabilities granted to each role",
            value: json!({
                "student": {
                    "can_upload": true,
                    "can_vote": true,
                    "can_comment": true,
                    "can_report": true
                },
                "photographer": {
                    "can_upload": true,
                    "can_vote": true,
                    "can_comment": true,
                    "can_review": true,
                    "can_manage_appointments": true
                },
                "admin": {
                    "can_upload": true,
                    "can_vote": true,
                    "can_manage_users": true,
                    "can_manage_competitions": true,
                    "can_manage_configs": true,
                    "can_view_analytics": true
                }
            }),
        },
        SettingDefault {
            key: "appointment_settings",
            category: "general",
            description: "Booking window and cancellation policy",
            value: json!({
                "advance_booking_days": 30,
                "max_daily_appointments": 5,
                "cancellation_hours": 24,
                "auto_confirm": false
            }),
        },
        SettingDefault {
            key: "image_processing",
            category: "general",
            description: "Thumbnail and tagging options",
            value: json!({
                "auto_generate_thumbnails": true,
                "thumbnail_size": 300,
                "enable_ai_tagging": true,
                "ai_confidence_threshold": 0.6
            }),
        },
        SettingDefault {
            key: "notification_settings",
            category: "general",
            description: "Notification channels",
            value: json!({
                "email_notifications": true,
                "push_notifications": false,
                "digest_frequency": "daily"
            }),
        },
        SettingDefault {
            key: "security_settings",
            category: "general",
            description: "Login and password policy",
            value: json!({
                "max_login_attempts": 5,
                "lockout_duration_minutes": 30,
                "password_min_length": 6,
                "require_email_verification": true
            }),
        },
    ]
}

fn default_value(key: &str) -> Option<Value> {
    defaults()
        .into_iter()
        .find(|setting| setting.key == key)
        .map(|setting| setting.value)
}

/// `{value, enabled}` shaped setting
#[derive(Debug, Clone, Deserialize)]
struct Toggle<T> {
    value: T,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompetitionRules {
    pub max_submissions_per_user: i64,
    pub min_voting_period_hours: i64,
    pub allow_late_submissions: bool,
    pub require_approval: bool,
}

impl Default for CompetitionRules {
    fn default() -> Self {
        Self {
            max_submissions_per_user: 3,
            min_voting_period_hours: 24,
            allow_late_submissions: false,
            require_approval: true,
        }
    }
}

/// Capabilities of one role; anything not listed is denied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RolePermissions {
    pub can_upload: bool,
    pub can_vote: bool,
    pub can_comment: bool,
    pub can_report: bool,
    pub can_review: bool,
    pub can_manage_appointments: bool,
    pub can_manage_users: bool,
    pub can_manage_competitions: bool,
    pub can_manage_configs: bool,
    pub can_view_analytics: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppointmentSettings {
    pub advance_booking_days: i64,
    pub max_daily_appointments: i64,
    pub cancellation_hours: i64,
    pub auto_confirm: bool,
}

impl Default for AppointmentSettings {
    fn default() -> Self {
        Self {
            advance_booking_days: 30,
            max_daily_appointments: 5,
            cancellation_hours: 24,
            auto_confirm: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImageProcessing {
    pub auto_generate_thumbnails: bool,
    pub thumbnail_size: u32,
    pub enable_ai_tagging: bool,
    pub ai_confidence_threshold: f64,
}

impl Default for ImageProcessing {
    fn default() -> Self {
        Self {
            auto_generate_thumbnails: true,
            thumbnail_size: 300,
            enable_ai_tagging: true,
            ai_confidence_threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
struct SecuritySettings {
    password_min_length: usize,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            password_min_length: 6,
        }
    }
}

/// Settings service
pub struct SettingsService {
    db: Arc<Database>,
}

impl SettingsService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert every default that is not stored yet
    ///
    /// # Returns
    /// Number of keys inserted
    pub async fn seed_defaults(&self) -> Result<usize, AppError> {
        let mut inserted = 0;
        for setting in defaults() {
            if self
                .db
                .insert_configuration_if_absent(
                    setting.key,
                    &setting.value,
                    setting.description,
                    setting.category,
                )
                .await?
            {
                inserted += 1;
            }
        }

        if inserted > 0 {
            tracing::info!(inserted, "Seeded default settings");
        }
        Ok(inserted)
    }

    pub async fn list(&self) -> Result<Vec<ConfigurationRow>, AppError> {
        self.db.list_configurations().await
    }

    /// Replace the value of a known key and record who changed it
    ///
    /// # Errors
    /// `Validation` for unknown keys, non-object values, or ranking weights
    /// that are negative or malformed
    pub async fn update(&self, admin_id: i64, key: &str, value: Value) -> Result<(), AppError> {
        let Some(default) = default_value(key) else {
            return Err(AppError::Validation(format!(
                "Unknown configuration key: {}",
                key
            )));
        };
        if !value.is_object() {
            return Err(AppError::Validation(format!(
                "Configuration value for {} must be an object",
                key
            )));
        }
        if key == "ranking_weights" {
            let weights: HeatWeights = serde_json::from_value(value.clone()).map_err(|_| {
                AppError::Validation(
                    "ranking_weights needs numeric like, view, favorite and vote".to_string(),
                )
            })?;
            if !weights.is_valid() {
                return Err(AppError::Validation(
                    "ranking weights must be non-negative".to_string(),
                ));
            }
        }

        let previous = self.db.get_configuration(key).await?;
        let old_value = previous
            .as_ref()
            .and_then(|row| serde_json::from_str::<Value>(&row.value).ok())
            .unwrap_or(default);

        if !self.db.update_configuration_value(key, &value).await? {
            let category = defaults()
                .into_iter()
                .find(|setting| setting.key == key)
                .map(|setting| setting.category)
                .unwrap_or("general");
            self.db
                .insert_configuration_if_absent(key, &value, "", category)
                .await?;
        }

        self.db
            .insert_system_log(
                &NewSystemLog::new(admin_id, "update_configuration", "configuration", None)
                    .with_details(json!({
                        "key": key,
                        "old_value": old_value,
                        "new_value": value,
                    })),
            )
            .await?;

        tracing::info!(key, admin_id, "Configuration updated");
        Ok(())
    }

    // =========================================================================
    // Typed getters
    // =========================================================================

    /// Daily upload cap, or `None` when the limit is disabled
    pub async fn daily_upload_limit(&self) -> Result<Option<i64>, AppError> {
        let limit = self
            .typed_or(
                "daily_upload_limit",
                Toggle {
                    value: 5i64,
                    enabled: true,
                },
            )
            .await?;
        Ok(limit.enabled.then_some(limit.value))
    }

    /// Largest accepted upload in bytes, or `None` when unlimited
    pub async fn max_file_size(&self) -> Result<Option<u64>, AppError> {
        let limit = self
            .typed_or(
                "max_file_size",
                Toggle {
                    value: 10_485_760u64,
                    enabled: true,
                },
            )
            .await?;
        Ok(limit.enabled.then_some(limit.value))
    }

    /// Lower-case extensions accepted for uploads
    pub async fn allowed_extensions(&self) -> Result<Vec<String>, AppError> {
        let fallback = || vec!["jpg", "jpeg", "png", "webp"];
        let extensions = self
            .typed_or(
                "allowed_extensions",
                Toggle::<Vec<String>> {
                    value: fallback().into_iter().map(String::from).collect(),
                    enabled: true,
                },
            )
            .await?;

        let list: Vec<String> = if extensions.enabled {
            extensions.value
        } else {
            fallback().into_iter().map(String::from).collect()
        };
        Ok(list.into_iter().map(|ext| ext.to_lowercase()).collect())
    }

    pub async fn heat_weights(&self) -> Result<HeatWeights, AppError> {
        let weights = self
            .typed_or("ranking_weights", HeatWeights::default())
            .await?;
        if weights.is_valid() {
            Ok(weights)
        } else {
            tracing::warn!("Stored ranking weights are invalid, using defaults");
            Ok(HeatWeights::default())
        }
    }

    pub async fn competition_rules(&self) -> Result<CompetitionRules, AppError> {
        self.typed_or("competition_rules", CompetitionRules::default())
            .await
    }

    pub async fn role_permissions(&self, role: Role) -> Result<RolePermissions, AppError> {
        let fallback: HashMap<String, RolePermissions> = default_value("role_permissions")
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();
        let mut permissions = self.typed_or("role_permissions", fallback).await?;
        Ok(permissions.remove(role.as_str()).unwrap_or_default())
    }

    pub async fn appointment_settings(&self) -> Result<AppointmentSettings, AppError> {
        self.typed_or("appointment_settings", AppointmentSettings::default())
            .await
    }

    pub async fn image_processing(&self) -> Result<ImageProcessing, AppError> {
        self.typed_or("image_processing", ImageProcessing::default())
            .await
    }

    pub async fn password_min_length(&self) -> Result<usize, AppError> {
        let security = self
            .typed_or("security_settings", SecuritySettings::default())
            .await?;
        Ok(security.password_min_length)
    }

    async fn typed_or<T: DeserializeOwned>(&self, key: &str, fallback: T) -> Result<T, AppError> {
        let Some(row) = self.db.get_configuration(key).await? else {
            return Ok(fallback);
        };
        if !row.is_active {
            return Ok(fallback);
        }

        match serde_json::from_str::<T>(&row.value) {
            Ok(value) => Ok(value),
            Err(error) => {
                tracing::warn!(key, error = %error, "Malformed setting, using default");
                Ok(fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NewUser;
    use tempfile::TempDir;

    async fn service() -> (SettingsService, Arc<Database>, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(Database::connect(&dir.path().join("settings.db")).await.unwrap());
        db.insert_user(&NewUser {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: "x".to_string(),
            role: Role::Admin,
            bio: None,
        })
        .await
        .unwrap();
        (SettingsService::new(db.clone()), db, dir)
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let (settings, _db, _dir) = service().await;
        assert_eq!(settings.seed_defaults().await.unwrap(), defaults().len());
        assert_eq!(settings.seed_defaults().await.unwrap(), 0);
        assert_eq!(settings.list().await.unwrap().len(), defaults().len());
    }

    #[tokio::test]
    async fn getters_fall_back_when_unseeded() {
        let (settings, _db, _dir) = service().await;
        assert_eq!(settings.daily_upload_limit().await.unwrap(), Some(5));
        assert_eq!(settings.heat_weights().await.unwrap(), HeatWeights::default());
        assert_eq!(settings.password_min_length().await.unwrap(), 6);
        assert!(
            settings
                .role_permissions(Role::Student)
                .await
                .unwrap()
                .can_upload
        );
        assert!(
            !settings
                .role_permissions(Role::Student)
                .await
                .unwrap()
                .can_manage_users
        );
    }

    #[tokio::test]
    async fn disabled_upload_limit_means_unlimited() {
        let (settings, _db, _dir) = service().await;
        settings.seed_defaults().await.unwrap();
        settings
            .update(1, "daily_upload_limit", json!({"value": 5, "enabled": false}))
            .await
            .unwrap();
        assert_eq!(settings.daily_upload_limit().await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_writes_an_audit_entry() {
        let (settings, db, _dir) = service().await;
        settings.seed_defaults().await.unwrap();
        settings
            .update(
                1,
                "ranking_weights",
                json!({"like": 1.0, "view": 0.5, "favorite": 2.0, "vote": 3.0}),
            )
            .await
            .unwrap();

        let weights = settings.heat_weights().await.unwrap();
        assert_eq!(weights.vote, 3.0);

        let (logs, total) = db
            .list_system_logs(Some("update_configuration"), 10, 0)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert!(logs[0].details.as_deref().unwrap().contains("ranking_weights"));
    }

    #[tokio::test]
    async fn update_rejects_bad_input() {
        let (settings, _db, _dir) = service().await;
        settings.seed_defaults().await.unwrap();

        for (key, value) in [
            ("no_such_key", json!({})),
            ("daily_upload_limit", json!(5)),
            (
                "ranking_weights",
                json!({"like": -1.0, "view": 0.3, "favorite": 0.2, "vote": 0.1}),
            ),
        ] {
            let error = settings.update(1, key, value).await.unwrap_err();
            assert!(matches!(error, AppError::Validation(_)), "{key}");
        }
    }
}
