//! # Graph Engine
//!
//! The device-interaction graph storage for proxtrace CORE.
//!
//! This module implements the `GraphStore` trait and the in-memory
//! `DeviceGraph`. Devices are keyed by id in a `BTreeMap`; interactions
//! live in an append-only edge log with per-device adjacency indices,
//! so degree/adjacency/path queries avoid full edge scans.

use crate::types::{Device, DeviceId, Interaction, TrackerError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// The GraphStore trait defines the primitives the ingestion service
/// and the query engine need.
///
/// All fallible operations return `Result<T, TrackerError>` to support
/// both in-memory and persistent storage backends uniformly. Read
/// operations return owned snapshots: a query that obtained its data
/// under a read lock never observes a later write.
pub trait GraphStore {
    /// Insert or fully replace a device record keyed by id.
    ///
    /// Re-submitting a device with the same id overwrites all
    /// attribute fields (merge-by-id, never a partial patch).
    fn upsert_device(&mut self, device: Device) -> Result<(), TrackerError>;

    /// Append a new directed edge instance.
    ///
    /// Interactions are never merged: two calls with identical
    /// endpoints produce two edges.
    ///
    /// Fails with `SelfInteraction` if the endpoints are identical and
    /// with `UnknownDevice` if either endpoint is absent from the
    /// store at call time.
    fn add_interaction(&mut self, interaction: Interaction) -> Result<(), TrackerError>;

    /// Lookup a device by id. Returns an owned record.
    fn device(&self, id: &DeviceId) -> Result<Option<Device>, TrackerError>;

    /// Check if a device exists in the graph.
    fn contains_device(&self, id: &DeviceId) -> Result<bool, TrackerError>;

    /// All devices, ordered by id.
    fn devices(&self) -> Result<Vec<Device>, TrackerError>;

    /// All interactions in insertion order.
    fn interactions(&self) -> Result<Vec<Interaction>, TrackerError>;

    /// Outgoing edges from a device (direction-sensitive; used by the
    /// path query). Empty for an unknown device.
    fn outgoing(&self, id: &DeviceId) -> Result<Vec<Interaction>, TrackerError>;

    /// Edges incident to a device in either direction, multi-edges
    /// included (used by degree, adjacency, and most-recent queries).
    /// Empty for an unknown device.
    fn incident(&self, id: &DeviceId) -> Result<Vec<Interaction>, TrackerError>;

    /// Get the total number of devices.
    fn device_count(&self) -> Result<usize, TrackerError>;

    /// Get the total number of interaction edges.
    fn interaction_count(&self) -> Result<usize, TrackerError>;
}

// =============================================================================
// IN-MEMORY GRAPH IMPLEMENTATION
// =============================================================================

/// The in-memory device graph.
///
/// Edges are stored once in an insertion-ordered log; the adjacency
/// maps hold indices into that log.
#[derive(Debug, Clone, Default)]
pub struct DeviceGraph {
    /// Device storage: DeviceId -> Device
    devices: BTreeMap<DeviceId, Device>,

    /// Append-only edge log, insertion order preserved.
    interactions: Vec<Interaction>,

    /// Outgoing adjacency: from_device -> indices into `interactions`
    outgoing: BTreeMap<DeviceId, Vec<usize>>,

    /// Incoming adjacency: to_device -> indices into `interactions`
    incoming: BTreeMap<DeviceId, Vec<usize>>,
}

impl DeviceGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the graph contains a device (internal, non-Result version).
    #[must_use]
    pub fn contains_device_internal(&self, id: &DeviceId) -> bool {
        self.devices.contains_key(id)
    }

    /// Iterate all devices in id order.
    pub fn devices_internal(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Iterate all interactions in insertion order.
    pub fn interactions_internal(&self) -> impl Iterator<Item = &Interaction> {
        self.interactions.iter()
    }

    /// Iterate outgoing edges (internal, iterator version for algorithms).
    pub fn outgoing_internal(&self, id: &DeviceId) -> impl Iterator<Item = &Interaction> {
        self.outgoing
            .get(id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.interactions[idx])
    }

    /// Iterate incident edges in either direction.
    ///
    /// Outgoing and incoming index lists never overlap because
    /// self-loops are rejected at insert time.
    pub fn incident_internal(&self, id: &DeviceId) -> impl Iterator<Item = &Interaction> {
        let out = self.outgoing.get(id).into_iter().flatten();
        let inc = self.incoming.get(id).into_iter().flatten();
        out.chain(inc).map(|&idx| &self.interactions[idx])
    }
}

impl GraphStore for DeviceGraph {
    fn upsert_device(&mut self, device: Device) -> Result<(), TrackerError> {
        if device.id.as_str().is_empty() {
            return Err(TrackerError::Validation("device id is empty".to_string()));
        }
        self.devices.insert(device.id.clone(), device);
        Ok(())
    }

    fn add_interaction(&mut self, interaction: Interaction) -> Result<(), TrackerError> {
        if interaction.from_device == interaction.to_device {
            return Err(TrackerError::SelfInteraction(interaction.from_device));
        }
        if !self.devices.contains_key(&interaction.from_device) {
            return Err(TrackerError::UnknownDevice(interaction.from_device));
        }
        if !self.devices.contains_key(&interaction.to_device) {
            return Err(TrackerError::UnknownDevice(interaction.to_device));
        }

        let idx = self.interactions.len();
        self.outgoing
            .entry(interaction.from_device.clone())
            .or_default()
            .push(idx);
        self.incoming
            .entry(interaction.to_device.clone())
            .or_default()
            .push(idx);
        self.interactions.push(interaction);
        Ok(())
    }

    fn device(&self, id: &DeviceId) -> Result<Option<Device>, TrackerError> {
        Ok(self.devices.get(id).cloned())
    }

    fn contains_device(&self, id: &DeviceId) -> Result<bool, TrackerError> {
        Ok(self.devices.contains_key(id))
    }

    fn devices(&self) -> Result<Vec<Device>, TrackerError> {
        Ok(self.devices.values().cloned().collect())
    }

    fn interactions(&self) -> Result<Vec<Interaction>, TrackerError> {
        Ok(self.interactions.clone())
    }

    fn outgoing(&self, id: &DeviceId) -> Result<Vec<Interaction>, TrackerError> {
        Ok(self.outgoing_internal(id).cloned().collect())
    }

    fn incident(&self, id: &DeviceId) -> Result<Vec<Interaction>, TrackerError> {
        Ok(self.incident_internal(id).cloned().collect())
    }

    fn device_count(&self) -> Result<usize, TrackerError> {
        Ok(self.devices.len())
    }

    fn interaction_count(&self) -> Result<usize, TrackerError> {
        Ok(self.interactions.len())
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Serializable representation of the graph for persistence.
///
/// The adjacency indices are derived state and are rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub devices: Vec<Device>,
    pub interactions: Vec<Interaction>,
}

impl From<&DeviceGraph> for SerializableGraph {
    fn from(graph: &DeviceGraph) -> Self {
        Self {
            devices: graph.devices.values().cloned().collect(),
            interactions: graph.interactions.clone(),
        }
    }
}

impl From<SerializableGraph> for DeviceGraph {
    fn from(sg: SerializableGraph) -> Self {
        let mut graph = DeviceGraph::new();
        for device in sg.devices {
            let _ = graph.upsert_device(device);
        }
        for interaction in sg.interactions {
            // Edges with dangling endpoints are dropped on load
            let _ = graph.add_interaction(interaction);
        }
        graph
    }
}

// =============================================================================
// TESTS
// =============================================================================
