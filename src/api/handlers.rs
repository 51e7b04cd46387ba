//! HTTP API handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, http::Uri, response::IntoResponse, Json};
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::ErrorBody;
use crate::utils::iso_timestamp;

/// Name reported by the root endpoint.
pub const API_NAME: &str = "Cache Test POC API";

/// API version reported by the root endpoint.
pub const API_VERSION: &str = "1.0.0";

/// Description returned by `/cache-info`.
pub const CACHE_INFO_MESSAGE: &str =
    "Cette API démontre l'utilisation du cache Docker dans les merge groups";

/// Caching techniques the build pipeline relies on, in display order.
pub const CACHE_FEATURES: [&str; 4] = [
    "Docker layer caching",
    "Registry cache mounting",
    "Multi-stage builds optimisés",
    "Cache partagé entre builds",
];

/// Application state shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Configuration captured at startup.
    pub config: Arc<Config>,
    /// When the process started; uptime is measured from here.
    pub started_at: Instant,
}

impl AppState {
    /// Create new app state.
    pub fn new(config: Config, started_at: Instant) -> Self {
        Self {
            config: Arc::new(config),
            started_at,
        }
    }

    /// Seconds elapsed since `started_at`.
    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

/// Root endpoint response.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    /// Service name.
    pub message: &'static str,
    /// API version.
    pub version: &'static str,
    /// Time the response was built.
    pub timestamp: String,
    /// Deployment environment.
    pub environment: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "healthy".
    pub status: &'static str,
    /// Process uptime in seconds.
    pub uptime: f64,
    /// Time the response was built.
    pub timestamp: String,
}

/// Cache information response.
#[derive(Debug, Serialize)]
pub struct CacheInfoResponse {
    /// What the service demonstrates.
    pub message: &'static str,
    /// Caching techniques, in display order.
    pub features: [&'static str; 4],
    /// Build metadata.
    pub build_info: BuildInfo,
}

/// Build metadata injected by CI.
#[derive(Debug, Serialize)]
pub struct BuildInfo {
    /// When the image was built.
    pub build_time: String,
    /// Commit the image was built from.
    pub commit_sha: String,
    /// Branch the image was built from.
    pub branch: String,
}

/// Root handler - service name, version and environment.
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: API_NAME,
        version: API_VERSION,
        timestamp: iso_timestamp(),
        environment: state.config.node_env.clone(),
    })
}

/// Health check handler - always returns 200.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            uptime: state.uptime_secs(),
            timestamp: iso_timestamp(),
        }),
    )
}

/// Cache info handler - static description plus build metadata.
pub async fn cache_info(State(state): State<AppState>) -> Json<CacheInfoResponse> {
    let config = &state.config;
    Json(CacheInfoResponse {
        message: CACHE_INFO_MESSAGE,
        features: CACHE_FEATURES,
        build_info: BuildInfo {
            build_time: config.build_time.clone(),
            commit_sha: config.commit_sha.clone(),
            branch: config.branch.clone(),
        },
    })
}

/// Fallback for unknown paths and unsupported methods.
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    debug!(path = uri.path(), "no route matched");
    (StatusCode::NOT_FOUND, Json(ErrorBody::not_found(uri.path())))
}
