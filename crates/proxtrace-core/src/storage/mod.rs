//! # Storage Module
//!
//! Persistent storage backends for the device graph.

mod redb_graph;

pub use redb_graph::RedbDeviceGraph;
