//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{
    Counter, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("campusphoto_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "campusphoto_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Cache strategy metrics
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("campusphoto_cache_hits_total", "Total number of cache hits"),
        &["strategy"]
    ).expect("metric can be created");
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("campusphoto_cache_misses_total", "Total number of cache misses"),
        &["strategy"]
    ).expect("metric can be created");
    pub static ref CACHE_SETS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("campusphoto_cache_sets_total", "Total number of cache fills"),
        &["strategy"]
    ).expect("metric can be created");
    pub static ref CACHE_EVICTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("campusphoto_cache_evictions_total", "Total number of cache entries removed"),
        &["strategy"]
    ).expect("metric can be created");
    pub static ref CACHE_SIZE: IntGaugeVec = IntGaugeVec::new(
        Opts::new("campusphoto_cache_size", "Current number of items in cache"),
        &["cache_name"]
    ).expect("metric can be created");
    pub static ref WRITE_BEHIND_QUEUE_DEPTH: IntGauge = IntGauge::new(
        "campusphoto_write_behind_queue_depth",
        "Pending write-behind operations"
    ).expect("metric can be created");
    pub static ref WRITE_BEHIND_FLUSHED_TOTAL: IntCounter = IntCounter::new(
        "campusphoto_write_behind_flushed_total",
        "Write-behind operations persisted to the database"
    ).expect("metric can be created");

    // Storage Metrics
    pub static ref PHOTO_UPLOADS_TOTAL: IntCounter = IntCounter::new(
        "campusphoto_photo_uploads_total",
        "Total number of photo uploads"
    ).expect("metric can be created");
    pub static ref PHOTO_BYTES_UPLOADED: Counter = Counter::new(
        "campusphoto_photo_bytes_uploaded_total",
        "Total bytes of photos uploaded"
    ).expect("metric can be created");

    // Workflow Metrics
    pub static ref APPROVALS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("campusphoto_approvals_total", "Photo reviews by decision"),
        &["decision"]
    ).expect("metric can be created");
    pub static ref APPOINTMENT_TRANSITIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("campusphoto_appointment_transitions_total", "Appointment transitions by action"),
        &["action"]
    ).expect("metric can be created");
    pub static ref HEAT_RECALCULATIONS_TOTAL: IntCounter = IntCounter::new(
        "campusphoto_heat_recalculations_total",
        "Full heat-score recalculation runs"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("campusphoto_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(CACHE_HITS_TOTAL.clone()))
        .expect("CACHE_HITS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_MISSES_TOTAL.clone()))
        .expect("CACHE_MISSES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_SETS_TOTAL.clone()))
        .expect("CACHE_SETS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_EVICTIONS_TOTAL.clone()))
        .expect("CACHE_EVICTIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_SIZE.clone()))
        .expect("CACHE_SIZE can be registered");
    REGISTRY
        .register(Box::new(WRITE_BEHIND_QUEUE_DEPTH.clone()))
        .expect("WRITE_BEHIND_QUEUE_DEPTH can be registered");
    REGISTRY
        .register(Box::new(WRITE_BEHIND_FLUSHED_TOTAL.clone()))
        .expect("WRITE_BEHIND_FLUSHED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(PHOTO_UPLOADS_TOTAL.clone()))
        .expect("PHOTO_UPLOADS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(PHOTO_BYTES_UPLOADED.clone()))
        .expect("PHOTO_BYTES_UPLOADED can be registered");
    REGISTRY
        .register(Box::new(APPROVALS_TOTAL.clone()))
        .expect("APPROVALS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(APPOINTMENT_TRANSITIONS_TOTAL.clone()))
        .expect("APPOINTMENT_TRANSITIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(HEAT_RECALCULATIONS_TOTAL.clone()))
        .expect("HEAT_RECALCULATIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
