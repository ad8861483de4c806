//! CampusPhoto - campus photography backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Auth, users, photos, rankings, competitions              │
//! │  - Appointments, admin, analytics, cache experiments        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Approval workflow, appointment state machine             │
//! │  - Heat scores, dynamic settings                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Strategy Engine + Data Layer                    │
//! │  - Six cache strategies over an in-process store            │
//! │  - SQLite (sqlx)                                            │
//! │  - Local or R2 media storage                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `strategy`: Cache strategy engine and write-behind queue
//! - `analysis`: Heuristic image analysis
//! - `data`: Database and strategy store
//! - `storage`: Media storage
//! - `auth`: Passwords, signed tokens and extractors
//! - `config`: Configuration management
//! - `error`: Error types

pub mod analysis;
pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;
pub mod strategy;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Dynamic settings stored in the `configurations` table
    pub settings: Arc<service::SettingsService>,

    /// Cache strategy engine
    pub engine: Arc<strategy::StrategyEngine>,

    /// Media storage (local directory or Cloudflare R2)
    pub storage: Arc<storage::MediaStorage>,

    pub users: Arc<service::UserService>,
    pub photos: Arc<service::PhotoService>,
    pub approvals: Arc<service::ApprovalService>,
    pub rankings: Arc<service::RankingService>,
    pub appointments: Arc<service::AppointmentService>,
    pub competitions: Arc<service::CompetitionService>,
    pub dashboard: Arc<service::DashboardService>,
    pub analytics: Arc<service::AnalyticsService>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Seed default settings
    /// 3. Build the strategy engine over the ranking service
    /// 4. Initialize media storage
    /// 5. Ensure the bootstrap admin exists
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = Arc::new(data::Database::connect(&config.database.path).await?);
        tracing::info!(path = %config.database.path.display(), "Database connected");

        // 2. Dynamic settings
        let settings = Arc::new(service::SettingsService::new(db.clone()));
        let seeded = settings.seed_defaults().await?;
        tracing::info!(seeded, "Default settings ensured");

        // 3. Strategy engine
        let rankings = Arc::new(service::RankingService::new(db.clone(), settings.clone()));
        let engine = Arc::new(strategy::StrategyEngine::new(
            rankings.clone(),
            config.cache.default_strategy,
            config.cache.max_entries,
        ));
        tracing::info!(
            strategy = %config.cache.default_strategy.as_str(),
            max_entries = config.cache.max_entries,
            "Strategy engine initialized"
        );

        // 4. Media storage
        let storage = Arc::new(storage::MediaStorage::new(&config.storage).await?);
        tracing::info!("Media storage initialized");

        let analyzer = Arc::new(analysis::ImageAnalyzer::new());

        let users = Arc::new(service::UserService::new(
            db.clone(),
            settings.clone(),
            config.auth.clone(),
        ));

        // 5. Bootstrap admin
        let admin = users.ensure_admin(&config.admin).await?;
        tracing::info!(user_id = admin.id, username = %admin.username, "Admin account ready");

        let photos = Arc::new(service::PhotoService::new(
            db.clone(),
            settings.clone(),
            storage.clone(),
            analyzer.clone(),
            engine.clone(),
        ));
        let approvals = Arc::new(service::ApprovalService::new(db.clone(), engine.clone()));
        let appointments = Arc::new(service::AppointmentService::new(
            db.clone(),
            settings.clone(),
        ));
        let competitions = Arc::new(service::CompetitionService::new(
            db.clone(),
            settings.clone(),
            engine.clone(),
        ));
        let dashboard = Arc::new(service::DashboardService::new(db.clone(), analyzer));
        let analytics = Arc::new(service::AnalyticsService::new(db.clone()));

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            settings,
            engine,
            storage,
            users,
            photos,
            approvals,
            rankings,
            appointments,
            competitions,
            dashboard,
            analytics,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit, middleware};
    use tower_http::{
        compression::CompressionLayer, limit::RequestBodyLimitLayer, services::ServeDir,
        trace::TraceLayer,
    };

    let cors_layer = build_cors_layer(&state.config.server);
    let body_limit = state.config.upload.max_body_bytes;

    let metrics = api::metrics_router::<AppState>().route_layer(
        middleware::from_fn_with_state(state.clone(), auth::require_auth),
    );

    let mut router = Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::api_router())
        .merge(metrics);

    if let Some(root) = state.storage.local_root() {
        router = router.nest_service("/media", ServeDir::new(root));
    }

    router
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::from_fn(api::metrics::track_http))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if server.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::error!(%error, %origin, "Skipping unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health_check() -> &'static str {
    "OK"
}
