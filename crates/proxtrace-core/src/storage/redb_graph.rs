//! # redb-backed Graph Storage
//!
//! A disk-backed device graph using the redb embedded database.
//!
//! Provides:
//! - ACID transactions per ingestion call
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//! - Zero configuration
//!
//! ## Integration with Session
//!
//! `RedbDeviceGraph` is the persistent storage backend for proxtrace
//! sessions. Unlike the in-memory `DeviceGraph`, data written here
//! survives process restarts.

use crate::graph::GraphStore;
use crate::types::{Device, DeviceId, Interaction, TrackerError};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::collections::BTreeSet;
use std::path::Path;

/// Table for devices: device id -> postcard-serialized Device
const DEVICES: TableDefinition<&str, &[u8]> = TableDefinition::new("devices");

/// Table for interactions: sequence number -> postcard-serialized
/// Interaction. The sequence is monotonically increasing, so key order
/// is insertion order.
const INTERACTIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("interactions");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

/// A disk-backed device graph using redb.
///
/// A small in-memory id set mirrors the device table so endpoint
/// existence checks never touch disk.
pub struct RedbDeviceGraph {
    /// The redb database handle.
    db: Database,
    /// In-memory mirror of known device ids for fast lookups.
    device_ids: BTreeSet<DeviceId>,
    /// Next interaction sequence number.
    next_interaction_id: u64,
}

impl std::fmt::Debug for RedbDeviceGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbDeviceGraph")
            .field("device_count", &self.device_ids.len())
            .field("next_interaction_id", &self.next_interaction_id)
            .finish_non_exhaustive()
    }
}

fn io_err(e: impl std::fmt::Display) -> TrackerError {
    TrackerError::Io(e.to_string())
}

fn codec_err(e: impl std::fmt::Display) -> TrackerError {
    TrackerError::Serialization(e.to_string())
}

impl RedbDeviceGraph {
    /// Open or create a graph database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(DEVICES).map_err(io_err)?;
            let _ = write_txn.open_table(INTERACTIONS).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        let read_txn = db.begin_read().map_err(io_err)?;

        let next_interaction_id = {
            let table = read_txn.open_table(METADATA).map_err(io_err)?;
            table
                .get("next_interaction_id")
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0)
        };

        let device_ids = {
            let table = read_txn.open_table(DEVICES).map_err(io_err)?;
            let mut ids = BTreeSet::new();
            for entry in table.iter().map_err(io_err)? {
                let (key, _) = entry.map_err(io_err)?;
                ids.insert(DeviceId::new(key.value()));
            }
            ids
        };

        Ok(Self {
            db,
            device_ids,
            next_interaction_id,
        })
    }

    /// Compact the database (optional optimization).
    pub fn compact(&mut self) -> Result<(), TrackerError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }

    fn decode_device(bytes: &[u8]) -> Result<Device, TrackerError> {
        postcard::from_bytes(bytes).map_err(codec_err)
    }

    fn decode_interaction(bytes: &[u8]) -> Result<Interaction, TrackerError> {
        postcard::from_bytes(bytes).map_err(codec_err)
    }
}

impl GraphStore for RedbDeviceGraph {
    fn upsert_device(&mut self, device: Device) -> Result<(), TrackerError> {
        if device.id.as_str().is_empty() {
            return Err(TrackerError::Validation("device id is empty".to_string()));
        }

        let encoded = postcard::to_stdvec(&device).map_err(codec_err)?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(DEVICES).map_err(io_err)?;
            table
                .insert(device.id.as_str(), encoded.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        self.device_ids.insert(device.id);
        Ok(())
    }

    fn add_interaction(&mut self, interaction: Interaction) -> Result<(), TrackerError> {
        if interaction.from_device == interaction.to_device {
            return Err(TrackerError::SelfInteraction(interaction.from_device));
        }
        if !self.device_ids.contains(&interaction.from_device) {
            return Err(TrackerError::UnknownDevice(interaction.from_device));
        }
        if !self.device_ids.contains(&interaction.to_device) {
            return Err(TrackerError::UnknownDevice(interaction.to_device));
        }

        let encoded = postcard::to_stdvec(&interaction).map_err(codec_err)?;
        let sequence = self.next_interaction_id;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(INTERACTIONS).map_err(io_err)?;
            table.insert(sequence, encoded.as_slice()).map_err(io_err)?;

            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            meta.insert("next_interaction_id", sequence.saturating_add(1))
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        self.next_interaction_id = sequence.saturating_add(1);
        Ok(())
    }

    fn device(&self, id: &DeviceId) -> Result<Option<Device>, TrackerError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(DEVICES).map_err(io_err)?;

        match table.get(id.as_str()).map_err(io_err)? {
            Some(guard) => Ok(Some(Self::decode_device(guard.value())?)),
            None => Ok(None),
        }
    }

    fn contains_device(&self, id: &DeviceId) -> Result<bool, TrackerError> {
        Ok(self.device_ids.contains(id))
    }

    fn devices(&self) -> Result<Vec<Device>, TrackerError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(DEVICES).map_err(io_err)?;

        let mut devices = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            devices.push(Self::decode_device(value.value())?);
        }
        Ok(devices)
    }

    fn interactions(&self) -> Result<Vec<Interaction>, TrackerError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(INTERACTIONS).map_err(io_err)?;

        let mut interactions = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            interactions.push(Self::decode_interaction(value.value())?);
        }
        Ok(interactions)
    }

    fn outgoing(&self, id: &DeviceId) -> Result<Vec<Interaction>, TrackerError> {
        Ok(self
            .interactions()?
            .into_iter()
            .filter(|edge| &edge.from_device == id)
            .collect())
    }

    fn incident(&self, id: &DeviceId) -> Result<Vec<Interaction>, TrackerError> {
        Ok(self
            .interactions()?
            .into_iter()
            .filter(|edge| &edge.from_device == id || &edge.to_device == id)
            .collect())
    }

    fn device_count(&self) -> Result<usize, TrackerError> {
        Ok(self.device_ids.len())
    }

    fn interaction_count(&self) -> Result<usize, TrackerError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(INTERACTIONS).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }
}

// =============================================================================
// TESTS
// =============================================================================
