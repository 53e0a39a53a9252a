//! # Query Engine
//!
//! The five read-only operations over a `GraphStore`.
//!
//! Every operation works on a snapshot obtained from the store, so a
//! query never observes a write that commits after it started (the app
//! layer holds a read lock for the duration of a call). Absence is a
//! normal outcome: no operation here fails on "not found".

use crate::graph::GraphStore;
use crate::primitives::BLUETOOTH_METHOD;
use crate::types::{DeviceId, RecentInteraction, SignalReading, TrackerError};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// LONGEST ALL-BLUETOOTH PATH
// =============================================================================

/// Length (edge count) of the longest shortest all-Bluetooth path over
/// all ordered pairs of distinct devices.
///
/// The path follows edge direction and every edge on it must have
/// `method == "Bluetooth"`. Pairs with no all-Bluetooth path are
/// excluded from the candidate set; returns 0 when no pair qualifies.
///
/// Implemented as one BFS per source restricted to Bluetooth edges,
/// taking the maximum eccentricity found: O(n * (n + m)) rather than
/// per-pair enumeration. Parallel edges collapse into one adjacency
/// entry, which cannot change any shortest-path length.
pub fn longest_bluetooth_path<G: GraphStore + ?Sized>(graph: &G) -> Result<usize, TrackerError> {
    let mut adjacency: BTreeMap<DeviceId, BTreeSet<DeviceId>> = BTreeMap::new();
    for edge in graph.interactions()? {
        if edge.method == BLUETOOTH_METHOD {
            adjacency
                .entry(edge.from_device)
                .or_default()
                .insert(edge.to_device);
        }
    }

    let mut longest = 0usize;

    // Only devices with an outgoing Bluetooth edge can start a path.
    for source in adjacency.keys() {
        let mut dist: BTreeMap<&DeviceId, usize> = BTreeMap::new();
        let mut queue: VecDeque<&DeviceId> = VecDeque::new();

        dist.insert(source, 0);
        queue.push_back(source);

        while let Some(current) = queue.pop_front() {
            let current_dist = dist[current];
            longest = longest.max(current_dist);

            if let Some(neighbors) = adjacency.get(current) {
                for neighbor in neighbors {
                    if !dist.contains_key(neighbor) {
                        dist.insert(neighbor, current_dist + 1);
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    Ok(longest)
}

// =============================================================================
// SIGNAL-STRENGTH FILTER
// =============================================================================

/// Every directed edge whose `signal_strength_dbm` is strictly above
/// the threshold, regardless of method, in insertion order.
///
/// Returns an empty sequence (not an error) when none match.
pub fn devices_with_signal_above<G: GraphStore + ?Sized>(
    graph: &G,
    threshold: i64,
) -> Result<Vec<SignalReading>, TrackerError> {
    Ok(graph
        .interactions()?
        .into_iter()
        .filter(|edge| edge.signal_strength_dbm > threshold)
        .map(|edge| SignalReading {
            device_from: edge.from_device,
            device_to: edge.to_device,
            signal_strength_dbm: edge.signal_strength_dbm,
        })
        .collect())
}

// =============================================================================
// DEGREE COUNT
// =============================================================================

/// Count of edges incident to a device in either direction
/// (in-degree + out-degree, multi-edges each counted separately).
///
/// Returns 0 for a device with no edges and 0 for an unknown device id
/// (the permissive read behavior of the original service).
pub fn connection_count<G: GraphStore + ?Sized>(
    graph: &G,
    device_id: &DeviceId,
) -> Result<usize, TrackerError> {
    Ok(graph.incident(device_id)?.len())
}

// =============================================================================
// DIRECT CONNECTION CHECK
// =============================================================================

/// True iff at least one edge exists between `a` and `b` in either
/// direction. Symmetric by construction even though edges are directed.
pub fn is_directly_connected<G: GraphStore + ?Sized>(
    graph: &G,
    a: &DeviceId,
    b: &DeviceId,
) -> Result<bool, TrackerError> {
    Ok(graph
        .incident(a)?
        .iter()
        .any(|edge| &edge.from_device == b || &edge.to_device == b))
}

// =============================================================================
// MOST RECENT INTERACTION
// =============================================================================

/// The newest edge incident to a device in either direction, as the id
/// of the other endpoint plus the timestamp.
///
/// Equal timestamps resolve deterministically to the lowest
/// other-device id. Returns `None` when the device has no edges
/// (including when the device id is unknown).
pub fn most_recent_interaction<G: GraphStore + ?Sized>(
    graph: &G,
    device_id: &DeviceId,
) -> Result<Option<RecentInteraction>, TrackerError> {
    let mut best: Option<RecentInteraction> = None;

    for edge in graph.incident(device_id)? {
        let other = if &edge.from_device == device_id {
            edge.to_device
        } else {
            edge.from_device
        };
        let candidate = RecentInteraction {
            other_device_id: other,
            timestamp: edge.timestamp,
        };

        best = match best {
            None => Some(candidate),
            Some(current) => {
                if candidate.timestamp > current.timestamp
                    || (candidate.timestamp == current.timestamp
                        && candidate.other_device_id < current.other_device_id)
                {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }

    Ok(best)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DeviceGraph;
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

    fn edge(from: &str, to: &str, method: &str, signal: i64, timestamp: &str) -> Interaction {
        Interaction {
            from_device: DeviceId::new(from),
            to_device: DeviceId::new(to),
            method: method.to_string(),
            bluetooth_version: (method == "Bluetooth").then(|| "5.0".to_string()),
            signal_strength_dbm: signal,
            distance_meters: 2.0,
            duration_seconds: 30,
            timestamp: ts(timestamp),
        }
    }

    fn graph_with(devices: &[&str], edges: Vec<Interaction>) -> DeviceGraph {
        let mut graph = DeviceGraph::new();
        for id in devices {
            graph.upsert_device(device(id)).expect("upsert");
        }
        for e in edges {
            graph.add_interaction(e).expect("add");
        }
        graph
    }

    // -------------------------------------------------------------------------
    // longest_bluetooth_path
    // -------------------------------------------------------------------------

    #[test]
    fn bluetooth_path_stops_at_non_bluetooth_edge() {
        // A->B (BT), B->C (BT), C->D (WiFi): the WiFi edge breaks
        // eligibility, so the answer is 2 (A->B->C), not 3.
        let graph = graph_with(
            &["a", "b", "c", "d"],
            vec![
                edge("a", "b", "Bluetooth", -50, "2024-05-01T10:00:00Z"),
                edge("b", "c", "Bluetooth", -50, "2024-05-01T10:01:00Z"),
                edge("c", "d", "WiFi", -50, "2024-05-01T10:02:00Z"),
            ],
        );
        assert_eq!(longest_bluetooth_path(&graph).expect("query"), 2);
    }

    #[test]
    fn bluetooth_path_empty_graph_returns_zero() {
        let graph = DeviceGraph::new();
        assert_eq!(longest_bluetooth_path(&graph).expect("query"), 0);
    }

    #[test]
    fn bluetooth_path_no_bluetooth_edges_returns_zero() {
        let graph = graph_with(
            &["a", "b"],
            vec![edge("a", "b", "WiFi", -50, "2024-05-01T10:00:00Z")],
        );
        assert_eq!(longest_bluetooth_path(&graph).expect("query"), 0);
    }

    #[test]
    fn bluetooth_path_follows_edge_direction() {
        // b->a and b->c: no directed path between a and c, longest is 1.
        let graph = graph_with(
            &["a", "b", "c"],
            vec![
                edge("b", "a", "Bluetooth", -50, "2024-05-01T10:00:00Z"),
                edge("b", "c", "Bluetooth", -50, "2024-05-01T10:01:00Z"),
            ],
        );
        assert_eq!(longest_bluetooth_path(&graph).expect("query"), 1);
    }

    #[test]
    fn bluetooth_path_uses_shortest_path_per_pair() {
        // a->b->c->d with a shortcut a->c. The shortcut makes
        // dist(a,d) = 2, so no pair is further than 2 apart.
        let graph = graph_with(
            &["a", "b", "c", "d"],
            vec![
                edge("a", "b", "Bluetooth", -50, "2024-05-01T10:00:00Z"),
                edge("b", "c", "Bluetooth", -50, "2024-05-01T10:01:00Z"),
                edge("c", "d", "Bluetooth", -50, "2024-05-01T10:02:00Z"),
                edge("a", "c", "Bluetooth", -50, "2024-05-01T10:03:00Z"),
            ],
        );
        assert_eq!(longest_bluetooth_path(&graph).expect("query"), 2);
    }

    #[test]
    fn bluetooth_path_handles_cycles() {
        let graph = graph_with(
            &["a", "b", "c"],
            vec![
                edge("a", "b", "Bluetooth", -50, "2024-05-01T10:00:00Z"),
                edge("b", "c", "Bluetooth", -50, "2024-05-01T10:01:00Z"),
                edge("c", "a", "Bluetooth", -50, "2024-05-01T10:02:00Z"),
            ],
        );
        // Any pair of distinct devices is at distance 1 or 2.
        assert_eq!(longest_bluetooth_path(&graph).expect("query"), 2);
    }

    #[test]
    fn bluetooth_path_parallel_edges_count_once() {
        let graph = graph_with(
            &["a", "b"],
            vec![
                edge("a", "b", "Bluetooth", -50, "2024-05-01T10:00:00Z"),
                edge("a", "b", "Bluetooth", -60, "2024-05-01T10:05:00Z"),
            ],
        );
        assert_eq!(longest_bluetooth_path(&graph).expect("query"), 1);
    }

    // -------------------------------------------------------------------------
    // devices_with_signal_above
    // -------------------------------------------------------------------------

    #[test]
    fn signal_filter_strict_inequality() {
        let graph = graph_with(
            &["a", "b", "c"],
            vec![
                edge("a", "b", "Bluetooth", -50, "2024-05-01T10:00:00Z"),
                edge("b", "c", "WiFi", -70, "2024-05-01T10:01:00Z"),
                edge("c", "a", "Bluetooth", -40, "2024-05-01T10:02:00Z"),
                edge("a", "c", "Bluetooth", -60, "2024-05-01T10:03:00Z"),
            ],
        );
        let readings = devices_with_signal_above(&graph, -60).expect("query");
        let signals: Vec<_> = readings.iter().map(|r| r.signal_strength_dbm).collect();
        // -60 itself excluded (strict), -70 excluded, insertion order kept
        assert_eq!(signals, vec![-50, -40]);
    }

    #[test]
    fn signal_filter_ignores_method() {
        let graph = graph_with(
            &["a", "b"],
            vec![edge("a", "b", "WiFi", -30, "2024-05-01T10:00:00Z")],
        );
        let readings = devices_with_signal_above(&graph, -60).expect("query");
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].device_from, DeviceId::new("a"));
        assert_eq!(readings[0].device_to, DeviceId::new("b"));
    }

    #[test]
    fn signal_filter_no_matches_is_empty() {
        let graph = graph_with(
            &["a", "b"],
            vec![edge("a", "b", "Bluetooth", -90, "2024-05-01T10:00:00Z")],
        );
        assert!(devices_with_signal_above(&graph, -60).expect("query").is_empty());
    }

    // -------------------------------------------------------------------------
    // connection_count
    // -------------------------------------------------------------------------

    #[test]
    fn connection_count_sums_both_directions_and_multiedges() {
        let graph = graph_with(
            &["a", "b", "c"],
            vec![
                edge("a", "b", "Bluetooth", -50, "2024-05-01T10:00:00Z"),
                edge("a", "b", "Bluetooth", -55, "2024-05-01T10:01:00Z"),
                edge("c", "a", "WiFi", -60, "2024-05-01T10:02:00Z"),
            ],
        );
        assert_eq!(connection_count(&graph, &DeviceId::new("a")).expect("query"), 3);
        assert_eq!(connection_count(&graph, &DeviceId::new("b")).expect("query"), 2);
        assert_eq!(connection_count(&graph, &DeviceId::new("c")).expect("query"), 1);
    }

    #[test]
    fn connection_count_unknown_device_is_zero() {
        let graph = DeviceGraph::new();
        assert_eq!(
            connection_count(&graph, &DeviceId::new("ghost")).expect("query"),
            0
        );
    }

    // -------------------------------------------------------------------------
    // is_directly_connected
    // -------------------------------------------------------------------------

    #[test]
    fn direct_connection_is_symmetric() {
        let graph = graph_with(
            &["a", "b", "c"],
            vec![edge("a", "b", "Bluetooth", -50, "2024-05-01T10:00:00Z")],
        );
        let a = DeviceId::new("a");
        let b = DeviceId::new("b");
        let c = DeviceId::new("c");

        assert!(is_directly_connected(&graph, &a, &b).expect("query"));
        assert!(is_directly_connected(&graph, &b, &a).expect("query"));
        assert!(!is_directly_connected(&graph, &a, &c).expect("query"));
        assert!(!is_directly_connected(&graph, &c, &a).expect("query"));
    }

    #[test]
    fn direct_connection_ignores_transitive_links() {
        let graph = graph_with(
            &["a", "b", "c"],
            vec![
                edge("a", "b", "Bluetooth", -50, "2024-05-01T10:00:00Z"),
                edge("b", "c", "Bluetooth", -50, "2024-05-01T10:01:00Z"),
            ],
        );
        assert!(
            !is_directly_connected(&graph, &DeviceId::new("a"), &DeviceId::new("c"))
                .expect("query")
        );
    }

    // -------------------------------------------------------------------------
    // most_recent_interaction
    // -------------------------------------------------------------------------

    #[test]
    fn most_recent_picks_maximum_timestamp() {
        let graph = graph_with(
            &["x", "a", "b", "c"],
            vec![
                edge("x", "a", "Bluetooth", -50, "2024-05-01T10:00:00Z"),
                edge("b", "x", "WiFi", -60, "2024-05-01T12:00:00Z"),
                edge("x", "c", "Bluetooth", -55, "2024-05-01T11:00:00Z"),
            ],
        );
        let recent = most_recent_interaction(&graph, &DeviceId::new("x"))
            .expect("query")
            .expect("present");
        assert_eq!(recent.other_device_id, DeviceId::new("b"));
        assert_eq!(
            recent.timestamp,
            ts("2024-05-01T12:00:00Z")
        );
    }

    #[test]
    fn most_recent_tie_breaks_on_lowest_other_id() {
        let graph = graph_with(
            &["x", "m", "k"],
            vec![
                edge("x", "m", "Bluetooth", -50, "2024-05-01T10:00:00Z"),
                edge("x", "k", "Bluetooth", -50, "2024-05-01T10:00:00Z"),
            ],
        );
        let recent = most_recent_interaction(&graph, &DeviceId::new("x"))
            .expect("query")
            .expect("present");
        assert_eq!(recent.other_device_id, DeviceId::new("k"));
    }

    #[test]
    fn most_recent_none_for_isolated_or_unknown_device() {
        let graph = graph_with(&["lonely"], vec![]);
        assert!(
            most_recent_interaction(&graph, &DeviceId::new("lonely"))
                .expect("query")
                .is_none()
        );
        assert!(
            most_recent_interaction(&graph, &DeviceId::new("ghost"))
                .expect("query")
                .is_none()
        );
    }
}
