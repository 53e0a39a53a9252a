//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        ConnectionCountResponse, DeviceParams, DirectConnectionParams, DirectConnectionResponse,
        HealthResponse, LongestPathResponse, MostRecentResponse, SignalDevicesResponse,
        SignalParams, StatusResponse, TrackResponse,
    },
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use proxtrace_core::{DeviceId, TrackerError, TrackingPayload};

/// Map a query-side error to a 500 response, logging the cause.
fn internal_error(context: &str, error: &TrackerError) -> Response {
    tracing::error!("{}: {}", context, error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": error.to_string() })),
    )
        .into_response()
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get graph status.
pub async fn status_handler(State(state): State<AppState>) -> Response {
    let session = state.session.read().await;

    let device_count = match session.device_count() {
        Ok(count) => count,
        Err(e) => return internal_error("Status query failed", &e),
    };
    let interaction_count = match session.interaction_count() {
        Ok(count) => count,
        Err(e) => return internal_error("Status query failed", &e),
    };

    (
        StatusCode::OK,
        Json(StatusResponse {
            device_count,
            interaction_count,
        }),
    )
        .into_response()
}

// =============================================================================
// TRACKING HANDLER
// =============================================================================

/// Ingest a tracking payload: device upserts first, then the
/// interaction. Rejections happen before any mutation; upserts already
/// applied when an interaction endpoint turns out to be unknown are
/// kept.
pub async fn track_handler(
    State(state): State<AppState>,
    Json(payload): Json<TrackingPayload>,
) -> Response {
    let mut session = state.session.write().await;

    match session.ingest(&payload) {
        Ok(()) => (StatusCode::OK, Json(TrackResponse::success())).into_response(),
        Err(
            e @ (TrackerError::Validation(_)
            | TrackerError::SelfInteraction(_)
            | TrackerError::UnknownDevice(_)),
        ) => (
            StatusCode::BAD_REQUEST,
            Json(TrackResponse::error(e.to_string())),
        )
            .into_response(),
        Err(e) => internal_error("Ingest failed", &e),
    }
}

// =============================================================================
// QUERY HANDLERS
// =============================================================================

/// Length of the longest all-Bluetooth path in the graph.
pub async fn bluetooth_connections_handler(State(state): State<AppState>) -> Response {
    let session = state.session.read().await;

    match session.longest_bluetooth_path() {
        Ok(result) => (StatusCode::OK, Json(LongestPathResponse { result })).into_response(),
        Err(e) => internal_error("Longest path query failed", &e),
    }
}

/// Edges with signal strength strictly above the threshold.
pub async fn strong_signal_handler(
    State(state): State<AppState>,
    Query(params): Query<SignalParams>,
) -> Response {
    let session = state.session.read().await;

    match session.devices_with_signal_above(params.signal_strength_dbm) {
        Ok(result) => (StatusCode::OK, Json(SignalDevicesResponse { result })).into_response(),
        Err(e) => internal_error("Signal query failed", &e),
    }
}

/// Direction-agnostic connection count for one device.
pub async fn device_connections_handler(
    State(state): State<AppState>,
    Query(params): Query<DeviceParams>,
) -> Response {
    let session = state.session.read().await;
    let device_id = DeviceId::new(&params.device_id);

    match session.connection_count(&device_id) {
        Ok(result) => (StatusCode::OK, Json(ConnectionCountResponse { result })).into_response(),
        Err(e) => internal_error("Connection count query failed", &e),
    }
}

/// Whether two devices share at least one edge, in either direction.
pub async fn direct_connection_handler(
    State(state): State<AppState>,
    Query(params): Query<DirectConnectionParams>,
) -> Response {
    let session = state.session.read().await;
    let from = DeviceId::new(&params.from_device_id);
    let to = DeviceId::new(&params.to_device_id);

    match session.is_directly_connected(&from, &to) {
        Ok(result) => (StatusCode::OK, Json(DirectConnectionResponse { result })).into_response(),
        Err(e) => internal_error("Direct connection query failed", &e),
    }
}

/// Most recent interaction for one device; `result` is null when the
/// device has no edges.
pub async fn most_recent_handler(
    State(state): State<AppState>,
    Query(params): Query<DeviceParams>,
) -> Response {
    let session = state.session.read().await;
    let device_id = DeviceId::new(&params.device_id);

    match session.most_recent_interaction(&device_id) {
        Ok(recent) => (
            StatusCode::OK,
            Json(MostRecentResponse {
                result: recent.map(Into::into),
            }),
        )
            .into_response(),
        Err(e) => internal_error("Most recent interaction query failed", &e),
    }
}
