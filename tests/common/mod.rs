//! Common test utilities for E2E tests

#![allow(dead_code)]

use campusphoto::strategy::CacheStrategy;
use campusphoto::{AppState, config};
use serde_json::{Value, json};
use std::io::Cursor;
use std::sync::Once;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const TEST_PASSWORD: &str = "secret123";

static METRICS: Once = Once::new();

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        METRICS.call_once(campusphoto::metrics::init_metrics);

        // Create temporary directory for database and uploads
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let uploads = temp_dir.path().join("uploads");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
            database: config::DatabaseConfig { path: db_path },
            storage: config::StorageConfig {
                backend: config::StorageBackend::Local,
                local_dir: uploads,
                public_url: "/media".to_string(),
                r2: None,
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                token_ttl_seconds: 1800,
            },
            admin: config::AdminConfig {
                username: ADMIN_USERNAME.to_string(),
                email: "admin@test.example.com".to_string(),
                password: ADMIN_PASSWORD.to_string(),
            },
            cache: config::CacheConfig {
                default_strategy: CacheStrategy::CacheAside,
                max_entries: 1000,
                write_behind_flush_ms: 1000,
            },
            ranking: config::RankingConfig {
                recalculate_interval_seconds: 0,
            },
            upload: config::UploadConfig {
                max_body_bytes: 12 * 1024 * 1024,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Same router as the binary
        let app = campusphoto::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Log in and return the bearer token
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({"username": username, "password": password}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "login failed for {}", username);
        let body: Value = response.json().await.unwrap();
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Register a user with `role` and return (user id, token)
    pub async fn create_user(&self, username: &str, role: &str) -> (i64, String) {
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "username": username,
                "email": format!("{}@test.example.com", username),
                "password": TEST_PASSWORD,
                "role": role,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "register failed for {}", username);
        let body: Value = response.json().await.unwrap();
        let id = body["id"].as_i64().unwrap();
        (id, self.login(username, TEST_PASSWORD).await)
    }

    /// Upload a small generated PNG and return the created photo
    pub async fn upload_photo(&self, token: &str, title: &str) -> Value {
        let response = self.try_upload(token, title, "photo.png").await;
        assert_eq!(response.status(), 200, "upload failed");
        response.json().await.unwrap()
    }

    pub async fn try_upload(&self, token: &str, title: &str, file_name: &str) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(sample_png())
            .file_name(file_name.to_string())
            .mime_str("image/png")
            .unwrap();
        let form = reqwest::multipart::Form::new()
            .text("title", title.to_string())
            .part("file", part);

        self.client
            .post(self.url("/api/photos/upload"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    /// Approve a pending photo as admin
    pub async fn approve_photo(&self, admin_token: &str, photo_id: i64) -> Value {
        let response = self
            .client
            .put(self.url(&format!("/api/admin/photos/{}/approve", photo_id)))
            .bearer_auth(admin_token)
            .json(&json!({"approval_status": "approved"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "approval failed");
        response.json().await.unwrap()
    }

    /// Upload and approve in one step; returns the photo id
    pub async fn approved_photo(&self, owner_token: &str, admin_token: &str, title: &str) -> i64 {
        let photo = self.upload_photo(owner_token, title).await;
        let id = photo["id"].as_i64().unwrap();
        self.approve_photo(admin_token, id).await;
        id
    }
}

/// 64x48 gradient PNG
pub fn sample_png() -> Vec<u8> {
    let image = image::RgbImage::from_fn(64, 48, |x, y| {
        image::Rgb([(x * 4) as u8, (y * 5) as u8, 128])
    });
    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, image::ImageOutputFormat::Png)
        .unwrap();
    buffer.into_inner()
}
