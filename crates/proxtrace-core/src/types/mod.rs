//! # Core Type Definitions
//!
//! This module contains all core types for the proxtrace device graph:
//! - Device identity and attributes (`DeviceId`, `Device`, `Location`)
//! - Interaction edges (`Interaction`)
//! - Ingestion batch unit (`TrackingPayload`)
//! - Query result rows (`SignalReading`, `RecentInteraction`)
//! - Error types (`TrackerError`)
//!
//! ## Ordering Guarantees
//!
//! `DeviceId` implements `Ord` so adjacency structures can use
//! `BTreeMap`/`BTreeSet` for deterministic iteration order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// DEVICE IDENTITY
// =============================================================================

/// Unique identifier for a device, as reported by the tracking client.
///
/// Devices are upserted by id: re-submitting a device with the same id
/// overwrites all attribute fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    /// Create a new device id from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// DEVICE NODE
// =============================================================================

/// Last reported position of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude above sea level in meters.
    pub altitude_meters: f64,
    /// Horizontal accuracy of the fix in meters.
    pub accuracy_meters: f64,
}

/// A device node in the graph.
///
/// All attribute fields are replaced wholesale on upsert; there is no
/// partial patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub os: String,
    pub location: Location,
}

// =============================================================================
// INTERACTION EDGE
// =============================================================================

/// A directed, attributed edge representing one proximity event
/// between two devices.
///
/// The graph is a multigraph: every ingested interaction creates a new
/// edge instance, even between the same ordered pair of devices.
/// Direction matters for path queries; degree, adjacency, and
/// most-recent lookups treat edges as connecting the unordered pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub from_device: DeviceId,
    pub to_device: DeviceId,
    /// Sensing technology, e.g. "Bluetooth" or "WiFi".
    pub method: String,
    /// Empty for non-Bluetooth methods.
    #[serde(default)]
    pub bluetooth_version: Option<String>,
    pub signal_strength_dbm: i64,
    pub distance_meters: f64,
    pub duration_seconds: i64,
    /// ISO-8601 on the wire.
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// TRACKING PAYLOAD
// =============================================================================

/// The ingestion batch unit: zero-or-more devices and at most one
/// interaction.
///
/// Device upserts are applied before the interaction, so an edge may
/// reference a device introduced in the same payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrackingPayload {
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub interaction: Option<Interaction>,
}

// =============================================================================
// QUERY RESULT ROWS
// =============================================================================

/// One row of the signal-threshold scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalReading {
    pub device_from: DeviceId,
    pub device_to: DeviceId,
    pub signal_strength_dbm: i64,
}

/// Result of the most-recent-interaction lookup: the other endpoint of
/// the newest edge incident to the queried device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentInteraction {
    pub other_device_id: DeviceId,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the proxtrace core.
///
/// - No silent failures
/// - All errors are recoverable per-call; nothing here is fatal
/// - Absence of a matching path, edge, or record is NOT an error and
///   is represented as a zero/empty/`None` result instead
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The payload is structurally invalid (missing or oversized field).
    #[error("Invalid payload: {0}")]
    Validation(String),

    /// An interaction's endpoints are identical.
    #[error("Device cannot interact with itself: {0}")]
    SelfInteraction(DeviceId),

    /// An interaction references a device id not present in the store.
    #[error("Unknown device: {0}")]
    UnknownDevice(DeviceId),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred in a storage backend.
    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// TESTS
// =============================================================================
