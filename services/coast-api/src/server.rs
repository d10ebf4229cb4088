//! HTTP surface: series queries, the admin refresh trigger, and health.

use std::sync::Arc;

use assembly::{AssemblyError, DailySeries, RefreshResult};
use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use coast_common::{Location, RefreshWindow};
use serde::{Deserialize, Serialize};
use snapshot_core::{AirQualityClass, DailyMetricSnapshot, Metric};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::state::AppState;

const MAX_SERIES_DAYS: u32 = 30;
const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/locations", get(list_locations))
        .route("/api/locations/:location_id/summary", get(location_summary))
        .route("/admin/refresh", post(admin_refresh))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub locations: usize,
}

#[derive(Debug, Serialize)]
pub struct LocationsResponse {
    pub count: usize,
    pub locations: Vec<Location>,
}

/// One day of the series, as served to clients.
#[derive(Debug, Serialize)]
pub struct DayRow {
    pub date: NaiveDate,
    pub sst_celsius: Metric<f64>,
    pub turbidity_index: Metric<f64>,
    pub chlorophyll: Metric<f64>,
    pub no2_concentration: Metric<f64>,
    pub air_quality_class: Metric<AirQualityClass>,
    pub water_quality_index: Metric<f64>,
    pub waste_risk_percent: Metric<f64>,
}

impl From<&DailyMetricSnapshot> for DayRow {
    fn from(snap: &DailyMetricSnapshot) -> Self {
        Self {
            date: snap.date,
            sst_celsius: snap.sst_celsius,
            turbidity_index: snap.turbidity_index,
            chlorophyll: snap.chlorophyll,
            no2_concentration: snap.no2_concentration,
            air_quality_class: snap.air_quality_class,
            water_quality_index: snap.water_quality_index,
            waste_risk_percent: snap.waste_risk_percent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub location: Location,
    pub days: u32,
    pub series: Vec<DayRow>,
    pub averages: assembly::SeriesAverages,
    pub cache: RefreshWindow,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub as_of_day: NaiveDate,
    pub results: Vec<LocationRefreshEntry>,
}

/// Per-location outcome of an on-demand refresh pass. Failures are reported
/// inline so one location cannot hide the rest.
#[derive(Debug, Serialize)]
pub struct LocationRefreshEntry {
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LocationRefreshEntry {
    fn from_outcome(location: String, outcome: &Result<RefreshResult, AssemblyError>) -> Self {
        match outcome {
            Ok(result) => Self {
                location,
                created: Some(result.created),
                updated: Some(result.updated),
                error: None,
            },
            Err(e) => Self {
                location,
                created: None,
                updated: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "coast-api",
        locations: state.registry.len(),
    })
}

pub async fn list_locations(Extension(state): Extension<Arc<AppState>>) -> Json<LocationsResponse> {
    let locations: Vec<Location> = state.registry.iter().cloned().collect();
    Json(LocationsResponse {
        count: locations.len(),
        locations,
    })
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    7
}

/// Series query: N days ending "today" in the canonical timezone, cached per
/// aligned time window.
pub async fn location_summary(
    Extension(state): Extension<Arc<AppState>>,
    Path(location_id): Path<String>,
    Query(params): Query<SummaryParams>,
) -> Response {
    let location = match state.registry.get(&location_id) {
        Some(location) => location.clone(),
        None => {
            return error_response(
                StatusCode::NOT_FOUND,
                format!("unknown location: {location_id}"),
            )
        }
    };

    if params.days == 0 || params.days > MAX_SERIES_DAYS {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("days must be between 1 and {MAX_SERIES_DAYS}"),
        );
    }

    let now = Utc::now();
    let series: DailySeries =
        match state.cache.get("summary", &location_id, params.days, now) {
            Some(entry) => entry.value,
            None => {
                let anchor = state.tz.local_today(now);
                match state.builder.build(&location_id, params.days, anchor).await {
                    Ok(series) => {
                        state
                            .cache
                            .insert("summary", &location_id, params.days, now, series.clone());
                        series
                    }
                    Err(e) => return assembly_error_response(e),
                }
            }
        };

    let response = SummaryResponse {
        location,
        days: series.days,
        series: series.series.iter().map(DayRow::from).collect(),
        averages: series.averages,
        cache: state.tz.refresh_window(now),
    };

    Json(response).into_response()
}

/// Authenticated on-demand refresh: runs the same pass as the midnight loop
/// and reports per-location created/updated counts.
pub async fn admin_refresh(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let expected = match &state.admin_token {
        Some(token) if !token.is_empty() => token,
        _ => {
            // A missing secret is a deployment error, never silently open.
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "admin refresh is not configured",
            );
        }
    };

    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if presented != Some(expected.as_str()) {
        warn!("Rejected admin refresh with bad or missing token");
        return error_response(StatusCode::UNAUTHORIZED, "invalid admin token");
    }

    let as_of_day = state.tz.local_today(Utc::now());
    info!(as_of = %as_of_day, "Admin refresh triggered");

    let outcomes = state.scheduler.refresh_all(as_of_day).await;
    let results = outcomes
        .iter()
        .map(|(location, outcome)| LocationRefreshEntry::from_outcome(location.clone(), outcome))
        .collect();

    Json(RefreshResponse { as_of_day, results }).into_response()
}

fn assembly_error_response(err: AssemblyError) -> Response {
    match err {
        AssemblyError::UnknownLocation(id) => {
            error_response(StatusCode::NOT_FOUND, format!("unknown location: {id}"))
        }
        AssemblyError::InvalidDayCount(n) => {
            error_response(StatusCode::BAD_REQUEST, format!("invalid day count: {n}"))
        }
        AssemblyError::Store(e) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
