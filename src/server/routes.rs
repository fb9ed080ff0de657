/// API Routes definition

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::auth;
use super::handlers;
use super::websocket;
use crate::core::{PollerControl, Settings, SnapshotStore};
use crate::utils::{BUILD_DEFAULT_API_BASE_URL, DEFAULT_POINTS_PER_HOST, DEFAULT_POLL_INTERVAL_MS};

/// Static facts about the running poller, reported by /api/version
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub api_base_url: String,
    pub poll_interval: Duration,
    pub points_per_host: usize,
}

impl ServerInfo {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api_base_url: settings.api_base_url.clone(),
            poll_interval: settings.poll_interval,
            points_per_host: settings.points_per_host,
        }
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            api_base_url: BUILD_DEFAULT_API_BASE_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            points_per_host: DEFAULT_POINTS_PER_HOST,
        }
    }
}

/// Shared by every handler; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub store: SnapshotStore,
    pub control: PollerControl,
    /// Token required by protected routes; None leaves them open
    pub web_token: Option<String>,
    pub info: ServerInfo,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: SnapshotStore, control: PollerControl, web_token: Option<String>, info: ServerInfo) -> Self {
        Self {
            store,
            control,
            web_token: web_token.filter(|t| !t.trim().is_empty()),
            info,
            started_at: Utc::now(),
        }
    }
}

pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    // Protected routes (require authentication)
    let protected_routes = Router::new()
        .route("/api/refresh", post(handlers::trigger_refresh))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware));

    // Public routes (read-only, no auth required)
    let public_routes = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/version", get(handlers::get_version_info))
        .route("/api/snapshot", get(handlers::get_snapshot))
        .route("/api/containers", get(handlers::get_containers))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/metrics/:kind", get(handlers::get_metrics))
        .route("/api/graph", get(handlers::get_graph))
        .route("/ws/snapshot", get(websocket::ws_snapshot_handler));

    let mut app = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .fallback(handlers::not_found)
        .with_state(state)
        // Add tracing middleware
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        app = app.layer(CorsLayer::permissive());
    }

    app
}
