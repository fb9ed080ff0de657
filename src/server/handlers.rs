/// API request handlers
/// Every handler reads the latest published snapshot; none of them query Prometheus.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::listing::{
    filter_and_sort, ContainerFilter, SortDirection, SortField, SortSpec, StatsOverview, StatusFilter,
};
use crate::core::series::{hosts, pivot, ChartPoint, HostFilter};
use crate::core::topology::Topology;
use crate::core::{ContainerRecord, MetricKind, Sample, Snapshot};
use crate::utils::BUILD_MODE;

use super::routes::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(msg: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg),
        }
    }
}

/// Error reply in the same envelope as successful responses
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::error(self.message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn parse_param<T>(name: &str, raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: std::str::FromStr<Err = String>,
{
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e| ApiError::bad_request(format!("invalid `{}`: {}", name, e))),
        None => Ok(None),
    }
}

// ============================================================================
// Status Handlers
// ============================================================================

#[derive(Serialize)]
pub struct HealthInfo {
    status: String,
    tick: u64,
    last_update: Option<DateTime<Utc>>,
    uptime_seconds: i64,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<HealthInfo> {
    let snapshot = state.store.current();
    let status = if snapshot.is_empty() { "waiting" } else { "healthy" };

    Ok(Json(ApiResponse::ok(HealthInfo {
        status: status.to_string(),
        tick: snapshot.tick,
        last_update: snapshot.updated_at,
        uptime_seconds: Utc::now().signed_duration_since(state.started_at).num_seconds(),
    })))
}

#[derive(Serialize)]
pub struct VersionInfo {
    version: String,
    build_timestamp: String,
    build_mode: String,
    api_base_url: String,
    poll_interval_ms: u64,
    points_per_host: usize,
}

pub async fn get_version_info(State(state): State<AppState>) -> ApiResult<VersionInfo> {
    Ok(Json(ApiResponse::ok(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_timestamp: crate::cli::BUILD_TIMESTAMP.to_string(),
        build_mode: BUILD_MODE.to_string(),
        api_base_url: state.info.api_base_url.clone(),
        poll_interval_ms: state.info.poll_interval.as_millis() as u64,
        points_per_host: state.info.points_per_host,
    })))
}

// ============================================================================
// Snapshot Handlers
// ============================================================================

pub async fn get_snapshot(State(state): State<AppState>) -> ApiResult<Snapshot> {
    let snapshot = state.store.current();
    Ok(Json(ApiResponse::ok(Snapshot::clone(&snapshot))))
}

#[derive(Debug, Default, Deserialize)]
pub struct ContainersQuery {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    instance: Option<String>,
    #[serde(default)]
    sort: Option<String>,
    #[serde(default)]
    direction: Option<String>,
}

pub async fn get_containers(
    State(state): State<AppState>,
    Query(query): Query<ContainersQuery>,
) -> ApiResult<Vec<ContainerRecord>> {
    let status: StatusFilter = parse_param("status", query.status.as_deref())?.unwrap_or_default();
    let field: Option<SortField> = parse_param("sort", query.sort.as_deref())?;
    let direction: SortDirection = parse_param("direction", query.direction.as_deref())?.unwrap_or_default();

    let filter = ContainerFilter {
        status,
        instance: query.instance.filter(|i| !i.is_empty() && i != "all"),
    };
    let sort = SortSpec { field, direction };

    let snapshot = state.store.current();
    Ok(Json(ApiResponse::ok(filter_and_sort(&snapshot.containers, &filter, &sort))))
}

pub async fn get_stats(State(state): State<AppState>) -> ApiResult<StatsOverview> {
    let snapshot = state.store.current();
    Ok(Json(ApiResponse::ok(StatsOverview::from_containers(&snapshot.containers))))
}

#[derive(Serialize)]
pub struct MetricSeries {
    kind: MetricKind,
    unit: String,
    hosts: Vec<String>,
    samples: Vec<Sample>,
    points: Vec<ChartPoint>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    #[serde(default)]
    host: Option<String>,
}

pub async fn get_metrics(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<MetricSeries> {
    let kind: MetricKind = kind.parse().map_err(ApiError::not_found)?;
    let snapshot = state.store.current();

    let samples = HostFilter::from_option(query.host).apply(snapshot.window(kind));
    let points = pivot(&samples);

    Ok(Json(ApiResponse::ok(MetricSeries {
        kind,
        unit: kind.unit_suffix().trim().to_string(),
        hosts: hosts(&snapshot.memory, &snapshot.cpu),
        samples,
        points,
    })))
}

pub async fn get_graph(State(state): State<AppState>) -> ApiResult<Topology> {
    let snapshot = state.store.current();
    Ok(Json(ApiResponse::ok(Topology::build(&snapshot.containers))))
}

// ============================================================================
// Control Handlers
// ============================================================================

pub async fn trigger_refresh(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<String>>) {
    state.control.request_refresh();
    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::ok("refresh requested".to_string())),
    )
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("no such endpoint")
}
