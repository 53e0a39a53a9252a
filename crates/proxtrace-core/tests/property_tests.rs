//! # Property-Based Tests
//!
//! Verification tests using proptest.
//!
//! These tests ensure determinism and correctness invariants of the
//! graph store and the query engine.

use chrono::{DateTime, Utc};
use proxtrace_core::{
    Device, DeviceGraph, DeviceId, GraphStore, Interaction, Location, connection_count,
    devices_with_signal_above, is_directly_connected, longest_bluetooth_path,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

// =============================================================================
// STRATEGIES
// =============================================================================

/// Small fixed pool of device ids so generated edges usually connect.
const ID_POOL: [&str; 10] = ["d0", "d1", "d2", "d3", "d4", "d5", "d6", "d7", "d8", "d9"];

fn device(id: &str) -> Device {
    Device {
        id: DeviceId::new(id),
        name: format!("{id}-name"),
        brand: "PropBrand".to_string(),
        model: "PropModel".to_string(),
        os: "PropOS 1.0".to_string(),
        location: Location {
            latitude: 0.0,
            longitude: 0.0,
            altitude_meters: 0.0,
            accuracy_meters: 1.0,
        },
    }
}

fn ts(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).expect("valid epoch seconds")
}

/// A generated edge: endpoints as pool indices (guaranteed distinct),
/// signal strength, Bluetooth flag, and a timestamp.
#[derive(Debug, Clone)]
struct EdgeInput {
    from: usize,
    to: usize,
    signal_dbm: i64,
    bluetooth: bool,
    ts_seconds: i64,
}

fn edge_input() -> impl Strategy<Value = EdgeInput> {
    (
        0usize..ID_POOL.len(),
        1usize..ID_POOL.len(),
        -100i64..0,
        any::<bool>(),
        0i64..2_000_000_000,
    )
        .prop_map(|(from, offset, signal_dbm, bluetooth, ts_seconds)| EdgeInput {
            from,
            to: (from + offset) % ID_POOL.len(),
            signal_dbm,
            bluetooth,
            ts_seconds,
        })
}

fn build_graph(edges: &[EdgeInput]) -> DeviceGraph {
    let mut graph = DeviceGraph::new();
    for id in ID_POOL {
        graph.upsert_device(device(id)).expect("upsert");
    }
    for e in edges {
        graph
            .add_interaction(Interaction {
                from_device: DeviceId::new(ID_POOL[e.from]),
                to_device: DeviceId::new(ID_POOL[e.to]),
                method: if e.bluetooth { "Bluetooth" } else { "WiFi" }.to_string(),
                bluetooth_version: e.bluetooth.then(|| "5.0".to_string()),
                signal_strength_dbm: e.signal_dbm,
                distance_meters: 1.0,
                duration_seconds: 10,
                timestamp: ts(e.ts_seconds),
            })
            .expect("add interaction");
    }
    graph
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Upserting the same ids repeatedly never inflates the device count.
    #[test]
    fn upsert_is_idempotent(indices in vec(0usize..ID_POOL.len(), 1..50)) {
        let mut graph = DeviceGraph::new();
        for &i in &indices {
            graph.upsert_device(device(ID_POOL[i])).expect("upsert");
        }
        for &i in &indices {
            graph.upsert_device(device(ID_POOL[i])).expect("upsert");
        }

        let unique = indices.iter().collect::<BTreeSet<_>>().len();
        prop_assert_eq!(graph.device_count().expect("count"), unique);
    }

    /// Connection count equals a brute-force scan over all edges.
    #[test]
    fn connection_count_matches_brute_force(edges in vec(edge_input(), 0..40)) {
        let graph = build_graph(&edges);
        let all = graph.interactions().expect("edges");

        for id in ID_POOL {
            let device_id = DeviceId::new(id);
            let expected = all
                .iter()
                .filter(|e| e.from_device == device_id || e.to_device == device_id)
                .count();
            prop_assert_eq!(
                connection_count(&graph, &device_id).expect("query"),
                expected
            );
        }
    }

    /// Direct connectivity is symmetric for every pair of devices.
    #[test]
    fn direct_connection_is_symmetric(edges in vec(edge_input(), 0..40)) {
        let graph = build_graph(&edges);

        for a in ID_POOL {
            for b in ID_POOL {
                let ab = is_directly_connected(&graph, &DeviceId::new(a), &DeviceId::new(b))
                    .expect("query");
                let ba = is_directly_connected(&graph, &DeviceId::new(b), &DeviceId::new(a))
                    .expect("query");
                prop_assert_eq!(ab, ba);
            }
        }
    }

    /// Signal filter returns exactly the edges strictly above the
    /// threshold, in insertion order.
    #[test]
    fn signal_filter_matches_brute_force(
        edges in vec(edge_input(), 0..40),
        threshold in -100i64..0
    ) {
        let graph = build_graph(&edges);
        let readings = devices_with_signal_above(&graph, threshold).expect("query");

        let expected: Vec<(DeviceId, DeviceId, i64)> = graph
            .interactions()
            .expect("edges")
            .into_iter()
            .filter(|e| e.signal_strength_dbm > threshold)
            .map(|e| (e.from_device, e.to_device, e.signal_strength_dbm))
            .collect();

        prop_assert_eq!(readings.len(), expected.len());
        for (reading, (from, to, signal)) in readings.iter().zip(&expected) {
            prop_assert_eq!(&reading.device_from, from);
            prop_assert_eq!(&reading.device_to, to);
            prop_assert_eq!(reading.signal_strength_dbm, *signal);
        }
    }

    /// Longest Bluetooth path is deterministic and bounded by the
    /// number of devices minus one.
    #[test]
    fn longest_path_deterministic_and_bounded(edges in vec(edge_input(), 0..40)) {
        let graph1 = build_graph(&edges);
        let graph2 = build_graph(&edges);

        let result1 = longest_bluetooth_path(&graph1).expect("query");
        let result2 = longest_bluetooth_path(&graph2).expect("query");

        prop_assert_eq!(result1, result2);
        prop_assert!(result1 < ID_POOL.len());

        // No Bluetooth edges at all means no path.
        if !edges.iter().any(|e| e.bluetooth) {
            prop_assert_eq!(result1, 0);
        }
    }
}
