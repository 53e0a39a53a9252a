//! # Persistence Format
//!
//! Binary snapshot serialization for proxtrace graphs.
//!
//! Format: Header (5 bytes) + postcard-serialized graph data.
//! - 4 bytes: Magic ("PTRK")
//! - 1 byte: Version
//!
//! ## Security
//!
//! Pre-deserialization validation prevents DoS from corrupted or
//! malicious snapshots:
//! - Maximum payload size limit (`MAX_PERSISTENCE_PAYLOAD_SIZE`)
//! - Header validation before payload parsing
//! - Graceful error handling for corrupted data

use crate::graph::{DeviceGraph, SerializableGraph};
use crate::types::TrackerError;
use crate::primitives;

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed payload size for the persistence format.
///
/// Validated BEFORE attempting deserialization to prevent
/// allocation-based DoS. 500 MB is a generous upper bound for an
/// encounter graph snapshot.
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: usize = 500 * 1024 * 1024; // 500 MB

/// Minimum valid snapshot size (header only).
const MIN_FILE_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The persistence header precedes all graph data.
#[derive(Debug, Clone, Copy)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Create a new header with the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(TrackerError::Serialization(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(TrackerError::Serialization(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    pub fn to_bytes(&self) -> [u8; 5] {
        let mut bytes = [0u8; 5];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TrackerError> {
        if bytes.len() < 5 {
            return Err(TrackerError::Serialization("Header too short".to_string()));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a graph to bytes (header + payload).
///
/// This is a pure transformation - no file I/O.
pub fn graph_to_bytes(graph: &DeviceGraph) -> Result<Vec<u8>, TrackerError> {
    let header = PersistenceHeader::new();
    let serializable = SerializableGraph::from(graph);

    let payload = postcard::to_stdvec(&serializable)
        .map_err(|e| TrackerError::Serialization(e.to_string()))?;

    let mut result = Vec::with_capacity(5 + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);

    Ok(result)
}

/// Deserialize a graph from bytes.
///
/// Validates minimum size, maximum payload size, and the header's
/// magic/version before attempting payload deserialization.
pub fn graph_from_bytes(bytes: &[u8]) -> Result<DeviceGraph, TrackerError> {
    if bytes.len() < MIN_FILE_SIZE {
        return Err(TrackerError::Serialization(
            "Data too short: minimum 5 bytes required".to_string(),
        ));
    }

    if bytes.len() > MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(TrackerError::Serialization(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = &bytes[5..];
    let serializable: SerializableGraph = postcard::from_bytes(payload).map_err(|e| {
        TrackerError::Serialization(format!("Failed to deserialize graph data: {}", e))
    })?;

    Ok(DeviceGraph::from(serializable))
}

// =============================================================================
// TESTS
// =============================================================================
