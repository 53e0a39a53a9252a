//! # proxtrace-core
//!
//! The device-interaction graph engine for proxtrace - THE LOGIC.
//!
//! This crate records proximity encounters between mobile devices
//! (Bluetooth/Wi-Fi co-location events) as a directed, timestamped
//! multigraph and answers structural queries over it: longest
//! all-Bluetooth path, high-signal links, per-device degree,
//! direct-adjacency checks, and most-recent-interaction lookup.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is the ONLY place where graph state exists (stateful)
//! - Has NO async, NO network dependencies (pure Rust)
//! - Never fails on absence: a missing path, edge, or record is a
//!   zero/empty/`None` result, not an error
//! - Rejects structurally invalid input (self-interactions, dangling
//!   edge endpoints) before any mutation takes effect

// =============================================================================
// MODULES
// =============================================================================

pub mod formats;
pub mod graph;
pub mod ingestor;
pub mod primitives;
pub mod query;
pub mod session;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Device, DeviceId, Interaction, Location, RecentInteraction, SignalReading, TrackerError,
    TrackingPayload,
};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use graph::{DeviceGraph, GraphStore, SerializableGraph};
pub use ingestor::Ingestor;
pub use query::{
    connection_count, devices_with_signal_above, is_directly_connected, longest_bluetooth_path,
    most_recent_interaction,
};
pub use session::{Session, StorageBackend};
pub use storage::RedbDeviceGraph;

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{PersistenceHeader, graph_from_bytes, graph_to_bytes};
