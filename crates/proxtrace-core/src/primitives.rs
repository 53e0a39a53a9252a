//! # Innate Primitives
//!
//! Hardcoded runtime constants for the proxtrace CORE.
//!
//! These limits are compiled into the binary and are immutable at
//! runtime. They bound every ingestion call so no payload can exhaust
//! memory or stall a traversal.

/// The method string that qualifies an edge for the all-Bluetooth path
/// query. Matching is exact and case-sensitive.
pub const BLUETOOTH_METHOD: &str = "Bluetooth";

/// Magic bytes for the proxtrace binary snapshot header.
///
/// - File Header = Magic Bytes ("PTRK") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"PTRK";

/// Current serialization format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for device id strings.
///
/// Ids longer than this are rejected by the Ingestor before any
/// mutation takes place.
pub const MAX_DEVICE_ID_LENGTH: usize = 256;

/// Maximum length for device/interaction attribute strings
/// (name, brand, model, os, method, bluetooth_version).
pub const MAX_FIELD_LENGTH: usize = 1024;

/// Maximum number of devices in a single tracking payload.
///
/// Larger batches are rejected to prevent DoS.
pub const MAX_BATCH_DEVICES: usize = 10_000;
