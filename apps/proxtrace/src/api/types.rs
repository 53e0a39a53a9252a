//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Query responses wrap their payload in a `result` field; the tracking
//! endpoint reports `status` on success and `error` on rejection.

use proxtrace_core::{DeviceId, RecentInteraction, SignalReading};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Graph status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub device_count: usize,
    pub interaction_count: usize,
}

// =============================================================================
// TRACKING RESPONSE
// =============================================================================

/// Response for the tracking ingestion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrackResponse {
    pub fn success() -> Self {
        Self {
            status: Some("success".to_string()),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            status: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

/// Parameters for the strong-signal query.
#[derive(Debug, Clone, Deserialize)]
pub struct SignalParams {
    /// Strict lower bound in dBm; edges must be stronger than this.
    #[serde(default = "default_signal_threshold")]
    pub signal_strength_dbm: i64,
}

fn default_signal_threshold() -> i64 {
    -60
}

/// Parameters for single-device queries.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceParams {
    pub device_id: String,
}

/// Parameters for the direct-connection query.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectConnectionParams {
    pub from_device_id: String,
    pub to_device_id: String,
}

// =============================================================================
// QUERY RESPONSES
// =============================================================================

/// Longest all-Bluetooth path length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongestPathResponse {
    pub result: usize,
}

/// Edges stronger than the requested threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalDevicesResponse {
    pub result: Vec<SignalReading>,
}

/// Direction-agnostic connection count for one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionCountResponse {
    pub result: usize,
}

/// Whether two devices share at least one edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectConnectionResponse {
    pub result: bool,
}

/// Most recent interaction for one device, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MostRecentResponse {
    pub result: Option<MostRecentJson>,
}

/// JSON shape of a most-recent-interaction result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MostRecentJson {
    pub other_device_id: DeviceId,
    pub interaction_timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<RecentInteraction> for MostRecentJson {
    fn from(recent: RecentInteraction) -> Self {
        Self {
            other_device_id: recent.other_device_id,
            interaction_timestamp: recent.timestamp,
        }
    }
}
