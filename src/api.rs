//! HTTP API handlers for Siaga.
//!
//! Status endpoints read the published snapshot and never trigger a refresh.
//! Before the first refresh cycle completes (and with nothing restored from
//! storage) the listing endpoints answer `503 Service Unavailable`.
//!
//! AI provider failures never surface as errors; the Gemini client turns them
//! into friendly fallback text. Only weather failures (`502`) and empty chat
//! messages (`400`) are rejected.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::aggregation::{StatusSummary, list_areas};
use crate::dashboard::{Dashboard, StatusSnapshot};
use crate::model::{
    AiReply, AnalyzeRequest, AreaDetailResponse, ChatRequest, FloodStatus, HistoryQuery,
    HistoryResponse, Location, PointWeatherResponse, StatusListResponse, StatusQuery,
    WeatherQuery,
};
use crate::storage::Storage;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub dashboard: Dashboard,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/status/summary", get(get_status_summary))
        .route("/areas/:name", get(get_area))
        .route("/areas/:name/history", get(get_area_history))
        .route("/districts", get(get_districts))
        .route("/weather", get(get_weather))
        .route("/analyze", post(post_analyze))
        .route("/chat", post(post_chat))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn published(state: &AppState) -> Result<Arc<StatusSnapshot>, StatusCode> {
    state.dashboard.snapshot().await.ok_or_else(|| {
        warn!("No flood statuses computed yet");
        StatusCode::SERVICE_UNAVAILABLE
    })
}

/// GET /status - Area statuses, most severe first.
///
/// # Query Parameters
///
/// - `district` (optional): Only areas in this district (case-insensitive)
/// - `status` (optional): Only areas at this level (AMAN, WASPADA, SIAGA, BANJIR)
///
/// # Response
///
/// ```json
/// {
///     "computed_at": "2025-01-15T07:10:00Z",
///     "areas": [
///         {
///             "name": "Kampung Melayu",
///             "district": "Jatinegara",
///             "base_risk": "Sangat Tinggi",
///             "duration_threshold": 1.0,
///             "location": { "lat": -6.226, "lon": 106.864 },
///             "status": "BANJIR",
///             "current_rain_duration": 2,
///             "is_raining_now": true,
///             "dependency_met": true
///         }
///     ]
/// }
/// ```
#[instrument(skip(state))]
pub async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusListResponse>, StatusCode> {
    let level = match query.status.as_deref() {
        Some(raw) => Some(FloodStatus::parse(raw).ok_or_else(|| {
            warn!(status = %raw, "Invalid status filter");
            StatusCode::BAD_REQUEST
        })?),
        None => None,
    };

    let snapshot = published(&state).await?;
    let areas = list_areas(
        state.dashboard.areas(),
        &snapshot.statuses,
        query.district.as_deref(),
        level,
    );

    info!(area_count = areas.len(), "Statuses queried");
    Ok(Json(StatusListResponse {
        computed_at: Some(snapshot.computed_at),
        areas,
    }))
}

/// GET /status/summary - Counts per level and the situation sentence.
#[instrument(skip(state))]
pub async fn get_status_summary(
    State(state): State<AppState>,
) -> Result<Json<StatusSummary>, StatusCode> {
    let snapshot = published(&state).await?;
    let summary = StatusSummary::new(
        state.dashboard.areas(),
        &snapshot.statuses,
        Some(snapshot.computed_at),
    );

    info!(
        banjir = summary.counts.banjir,
        siaga = summary.counts.siaga,
        "Status summary queried"
    );
    Ok(Json(summary))
}

/// GET /areas/:name - One area with its status and district forecast.
///
/// An area that has not been resolved yet reads as AMAN.
#[instrument(skip(state))]
pub async fn get_area(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<AreaDetailResponse>, StatusCode> {
    let area = state.dashboard.areas().area(&name).cloned().ok_or_else(|| {
        warn!(area = %name, "Unknown area");
        StatusCode::NOT_FOUND
    })?;

    let snapshot = state.dashboard.snapshot().await;
    let (status, forecast, computed_at) = match &snapshot {
        Some(s) => (
            s.status_of(&area.name),
            s.forecast_for(&area.district).to_vec(),
            Some(s.computed_at),
        ),
        None => (Default::default(), Vec::new(), None),
    };

    info!(area = %area.name, status = ?status.status, "Area queried");
    Ok(Json(AreaDetailResponse {
        area,
        status,
        forecast,
        computed_at,
    }))
}

/// GET /areas/:name/history - Stored statuses of one area, newest first.
///
/// # Query Parameters
///
/// - `limit` (optional): Maximum number of entries (default: 24)
#[instrument(skip(state))]
pub async fn get_area_history(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, StatusCode> {
    if state.dashboard.areas().lookup(&name).is_none() {
        warn!(area = %name, "Unknown area");
        return Err(StatusCode::NOT_FOUND);
    }

    match state.storage.area_history(&name, query.limit).await {
        Ok(entries) => {
            info!(area = %name, entry_count = entries.len(), "Area history queried");
            Ok(Json(HistoryResponse {
                area: name,
                entries,
            }))
        }
        Err(e) => {
            warn!(area = %name, error = %e, "Failed to load area history");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /districts - District names in dataset order.
pub async fn get_districts(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.dashboard.areas().districts().to_vec())
}

fn location_or_default(state: &AppState, lat: Option<f64>, lon: Option<f64>) -> Location {
    let fallback = state.dashboard.config().default_location;
    Location {
        lat: lat.unwrap_or(fallback.lat),
        lon: lon.unwrap_or(fallback.lon),
    }
}

/// GET /weather - Current weather and upcoming hours at a point.
///
/// Missing coordinates fall back to the configured default location.
#[instrument(skip(state))]
pub async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<PointWeatherResponse>, StatusCode> {
    let location = location_or_default(&state, query.lat, query.lon);

    match state.dashboard.point_weather(location).await {
        Ok(response) => {
            info!(lat = location.lat, lon = location.lon, "Point weather queried");
            Ok(Json(response))
        }
        Err(e) => {
            warn!(lat = location.lat, lon = location.lon, error = %e, "Failed to fetch weather");
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}

/// POST /analyze - AI flood-risk analysis for a point.
///
/// # Request Body
///
/// ```json
/// {
///     "lat": -6.225,
///     "lon": 106.9,
///     "name": "Rumah"
/// }
/// ```
///
/// All fields are optional.
#[instrument(skip_all)]
pub async fn post_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AiReply>, StatusCode> {
    let location = location_or_default(&state, request.lat, request.lon);

    match state.dashboard.analyze(location, &request.name).await {
        Ok(reply) => {
            info!(name = %request.name, "Flood analysis answered");
            Ok(Json(AiReply { reply }))
        }
        Err(e) => {
            warn!(error = %e, "Failed to fetch weather for analysis");
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}

/// POST /chat - Ask the assistant, with the current situation as context.
#[instrument(skip_all)]
pub async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<AiReply>, StatusCode> {
    let message = request.message.trim();
    if message.is_empty() {
        warn!("Empty chat message");
        return Err(StatusCode::BAD_REQUEST);
    }

    let reply = state.dashboard.chat(message).await;
    info!("Chat answered");
    Ok(Json(AiReply { reply }))
}
