//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

use crate::strategy::CacheStrategy;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub admin: AdminConfig,
    pub cache: CacheConfig,
    pub ranking: RankingConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8000)
    pub port: u16,
    /// Origins allowed by CORS
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Where uploaded media lives
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    R2,
}

/// Media storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for the local backend, served under `/media`
    pub local_dir: PathBuf,
    /// Prefix prepended to storage keys to form public URLs
    pub public_url: String,
    /// Cloudflare R2 credentials, required when `backend = "r2"`
    pub r2: Option<R2Config>,
}

/// Cloudflare R2 credentials
#[derive(Debug, Clone, Deserialize)]
pub struct R2Config {
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
}

/// Token signing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret (32+ bytes)
    pub session_secret: String,
    /// Access token lifetime in seconds (default: 1800)
    pub token_ttl_seconds: i64,
}

/// Bootstrap admin account
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,
    pub email: String,
    pub password: String,
}

fn default_admin_username() -> String {
    "admin".to_string()
}

/// Cache strategy engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Strategy used by `/api/rankings/photos` until switched
    pub default_strategy: CacheStrategy,
    /// Upper bound on cached entries across all strategies
    pub max_entries: u64,
    /// Write-behind flush interval in milliseconds
    pub write_behind_flush_ms: u64,
}

/// Heat-score maintenance
#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    /// Full recalculation interval; 0 disables the background task
    pub recalculate_interval_seconds: u64,
}

/// Upload transport limits
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum request body size in bytes
    pub max_body_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (CAMPUSPHOTO__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("server.cors_origins", vec!["http://localhost:3000"])?
            .set_default("database.path", "./data/campusphoto.db")?
            .set_default("storage.backend", "local")?
            .set_default("storage.local_dir", "./uploads")?
            .set_default("storage.public_url", "/media")?
            .set_default("auth.token_ttl_seconds", 1800)?
            .set_default("admin.username", "admin")?
            .set_default("admin.email", "admin@campusphoto.local")?
            .set_default("cache.default_strategy", "cache_aside")?
            .set_default("cache.max_entries", 10_000)?
            .set_default("cache.write_behind_flush_ms", 1000)?
            .set_default("ranking.recalculate_interval_seconds", 300)?
            .set_default("upload.max_body_bytes", 12 * 1024 * 1024)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("CAMPUSPHOTO")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Socket address string for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;
        const MIN_ADMIN_PASSWORD_CHARS: usize = 6;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.token_ttl_seconds <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.token_ttl_seconds must be greater than 0".to_string(),
            ));
        }

        if self.admin.password.chars().count() < MIN_ADMIN_PASSWORD_CHARS {
            return Err(crate::error::AppError::Config(format!(
                "admin.password must be at least {} characters",
                MIN_ADMIN_PASSWORD_CHARS
            )));
        }

        if !self.admin.email.contains('@') {
            return Err(crate::error::AppError::Config(
                "admin.email must be an email address".to_string(),
            ));
        }

        if self.cache.max_entries == 0 {
            return Err(crate::error::AppError::Config(
                "cache.max_entries must be greater than 0".to_string(),
            ));
        }

        if self.cache.write_behind_flush_ms == 0 {
            return Err(crate::error::AppError::Config(
                "cache.write_behind_flush_ms must be greater than 0".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::R2 && self.storage.r2.is_none() {
            return Err(crate::error::AppError::Config(
                "storage.r2 must be set when storage.backend is r2".to_string(),
            ));
        }

        for origin in &self.server.cors_origins {
            let parsed = url::Url::parse(origin).map_err(|e| {
                crate::error::AppError::Config(format!(
                    "server.cors_origins entry {} is not a URL: {}",
                    origin, e
                ))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(crate::error::AppError::Config(format!(
                    "server.cors_origins entry {} must use http or https",
                    origin
                )));
            }
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(crate::error::AppError::Config(
                "logging.format must be pretty or json".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/campusphoto-test.db"),
            },
            storage: StorageConfig {
                backend: StorageBackend::Local,
                local_dir: PathBuf::from("/tmp/campusphoto-uploads"),
                public_url: "/media".to_string(),
                r2: None,
            },
            auth: AuthConfig {
                session_secret: "x".repeat(32),
                token_ttl_seconds: 1800,
            },
            admin: AdminConfig {
                username: "admin".to_string(),
                email: "admin@example.com".to_string(),
                password: "admin123".to_string(),
            },
            cache: CacheConfig {
                default_strategy: CacheStrategy::CacheAside,
                max_entries: 10_000,
                write_behind_flush_ms: 1000,
            },
            ranking: RankingConfig {
                recalculate_interval_seconds: 300,
            },
            upload: UploadConfig {
                max_body_bytes: 12 * 1024 * 1024,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(valid_config().validate().is_ok());
        assert_eq!(valid_config().bind_address(), "127.0.0.1:8000");
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut config = valid_config();
        config.auth.session_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("session secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.session_secret")
        ));
    }

    #[test]
    fn validate_requires_r2_credentials_for_r2_backend() {
        let mut config = valid_config();
        config.storage.backend = StorageBackend::R2;

        let error = config
            .validate()
            .expect_err("r2 backend without credentials must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("storage.r2")
        ));
    }

    #[test]
    fn validate_rejects_weak_admin_password() {
        let mut config = valid_config();
        config.admin.password = "12345".to_string();

        let error = config.validate().expect_err("short admin password");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("admin.password")
        ));
    }

    #[test]
    fn validate_rejects_malformed_cors_origin() {
        let mut config = valid_config();
        config.server.cors_origins = vec!["localhost:3000".to_string()];

        let error = config.validate().expect_err("origin without scheme");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("server.cors_origins")
        ));
    }
}
