//! # Session Module
//!
//! High-level surface combining a storage backend with the ingestion
//! service and the query engine.
//!
//! ## Storage Backends
//!
//! Session supports two storage backends:
//! - `InMemory`: Uses the in-memory `DeviceGraph` (fast, volatile
//!   unless explicitly saved)
//! - `Persistent`: Uses `RedbDeviceGraph` for disk-backed ACID storage
//!
//! The app layer shares one Session behind an async `RwLock`: writers
//! exclusive, readers shared, so every query sees a point-in-time
//! snapshot for its whole duration.

use crate::graph::{DeviceGraph, GraphStore};
use crate::ingestor::Ingestor;
use crate::query;
use crate::storage::RedbDeviceGraph;
use crate::types::{DeviceId, RecentInteraction, SignalReading, TrackerError, TrackingPayload};
use std::path::Path;

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory graph (fast, volatile).
    InMemory(DeviceGraph),
    /// Disk-backed graph using redb (ACID, persistent).
    Persistent(RedbDeviceGraph),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(DeviceGraph::new())
    }
}

// NOTE: StorageBackend does NOT implement Clone.
// RedbDeviceGraph (database handle) cannot be safely cloned.

/// A Session wraps a storage backend behind the ingest call and the
/// five query operations.
#[derive(Debug, Default)]
pub struct Session {
    backend: StorageBackend,
}

impl Session {
    /// Create a new empty session with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session wrapping an existing in-memory graph.
    #[must_use]
    pub fn with_graph(graph: DeviceGraph) -> Self {
        Self {
            backend: StorageBackend::InMemory(graph),
        }
    }

    /// Create a session backed by a redb database at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbDeviceGraph::open(path)?),
        })
    }

    /// Whether this session persists to disk on its own.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// The in-memory graph, if this session uses one.
    #[must_use]
    pub fn graph(&self) -> Option<&DeviceGraph> {
        match &self.backend {
            StorageBackend::InMemory(graph) => Some(graph),
            StorageBackend::Persistent(_) => None,
        }
    }

    fn store(&self) -> &dyn GraphStore {
        match &self.backend {
            StorageBackend::InMemory(graph) => graph,
            StorageBackend::Persistent(graph) => graph,
        }
    }

    fn store_mut(&mut self) -> &mut dyn GraphStore {
        match &mut self.backend {
            StorageBackend::InMemory(graph) => graph,
            StorageBackend::Persistent(graph) => graph,
        }
    }

    // =========================================================================
    // INGESTION
    // =========================================================================

    /// Validate and apply a tracking payload: device upserts first,
    /// then the interaction (if present).
    pub fn ingest(&mut self, payload: &TrackingPayload) -> Result<(), TrackerError> {
        Ingestor::ingest(self.store_mut(), payload)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Length of the longest shortest all-Bluetooth path; 0 when no
    /// pair of devices is connected by one.
    pub fn longest_bluetooth_path(&self) -> Result<usize, TrackerError> {
        query::longest_bluetooth_path(self.store())
    }

    /// Edges with `signal_strength_dbm` strictly above the threshold.
    pub fn devices_with_signal_above(
        &self,
        threshold: i64,
    ) -> Result<Vec<SignalReading>, TrackerError> {
        query::devices_with_signal_above(self.store(), threshold)
    }

    /// Direction-agnostic incident edge count; 0 for unknown ids.
    pub fn connection_count(&self, device_id: &DeviceId) -> Result<usize, TrackerError> {
        query::connection_count(self.store(), device_id)
    }

    /// True iff at least one edge links the pair in either direction.
    pub fn is_directly_connected(
        &self,
        a: &DeviceId,
        b: &DeviceId,
    ) -> Result<bool, TrackerError> {
        query::is_directly_connected(self.store(), a, b)
    }

    /// Newest incident edge as (other endpoint, timestamp); `None`
    /// when the device has no edges.
    pub fn most_recent_interaction(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<RecentInteraction>, TrackerError> {
        query::most_recent_interaction(self.store(), device_id)
    }

    // =========================================================================
    // METRICS & SNAPSHOTS
    // =========================================================================

    /// Total number of devices in the store.
    pub fn device_count(&self) -> Result<usize, TrackerError> {
        self.store().device_count()
    }

    /// Total number of interaction edges in the store.
    pub fn interaction_count(&self) -> Result<usize, TrackerError> {
        self.store().interaction_count()
    }

    /// Build an in-memory snapshot of the current graph, regardless of
    /// backend. Used by export and by the file backend's save path.
    pub fn export_graph_snapshot(&self) -> Result<DeviceGraph, TrackerError> {
        match &self.backend {
            StorageBackend::InMemory(graph) => Ok(graph.clone()),
            StorageBackend::Persistent(store) => {
                let mut graph = DeviceGraph::new();
                for device in store.devices()? {
                    graph.upsert_device(device)?;
                }
                for interaction in store.interactions()? {
                    graph.add_interaction(interaction)?;
                }
                Ok(graph)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Device, Interaction, Location};
    use chrono::{DateTime, Utc};

    fn device(id: &str) -> Device {
        Device {
            id: DeviceId::new(id),
            name: format!("{id}-name"),
            brand: "TestBrand".to_string(),
            model: "TestModel".to_string(),
            os: "TestOS 1.0".to_string(),
            location: Location {
                latitude: 0.0,
                longitude: 0.0,
                altitude_meters: 0.0,
                accuracy_meters: 1.0,
            },
        }
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn payload(devices: &[&str], edge: Option<(&str, &str, &str)>) -> TrackingPayload {
        TrackingPayload {
            devices: devices.iter().map(|id| device(id)).collect(),
            interaction: edge.map(|(from, to, method)| Interaction {
                from_device: DeviceId::new(from),
                to_device: DeviceId::new(to),
                method: method.to_string(),
                bluetooth_version: None,
                signal_strength_dbm: -50,
                distance_meters: 1.0,
                duration_seconds: 30,
                timestamp: ts("2024-05-01T12:00:00Z"),
            }),
        }
    }

    #[test]
    fn session_ingest_and_query_roundtrip() {
        let mut session = Session::new();
        session
            .ingest(&payload(&["a", "b"], Some(("a", "b", "Bluetooth"))))
            .expect("ingest");

        assert_eq!(session.device_count().expect("count"), 2);
        assert_eq!(session.interaction_count().expect("count"), 1);
        assert_eq!(session.longest_bluetooth_path().expect("query"), 1);
        assert!(
            session
                .is_directly_connected(&DeviceId::new("b"), &DeviceId::new("a"))
                .expect("query")
        );
    }

    #[test]
    fn snapshot_matches_in_memory_graph() {
        let mut session = Session::new();
        session
            .ingest(&payload(&["a", "b"], Some(("a", "b", "WiFi"))))
            .expect("ingest");

        let snapshot = session.export_graph_snapshot().expect("snapshot");
        assert_eq!(snapshot.device_count().expect("count"), 2);
        assert_eq!(snapshot.interaction_count().expect("count"), 1);
    }

    #[test]
    fn persistent_session_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("devices.redb");

        {
            let mut session = Session::with_redb(&db_path).expect("open");
            session
                .ingest(&payload(&["a", "b"], Some(("a", "b", "Bluetooth"))))
                .expect("ingest");
        }

        let session = Session::with_redb(&db_path).expect("reopen");
        assert!(session.is_persistent());
        assert_eq!(session.device_count().expect("count"), 2);
        assert_eq!(session.interaction_count().expect("count"), 1);
        assert_eq!(session.longest_bluetooth_path().expect("query"), 1);
    }
}
