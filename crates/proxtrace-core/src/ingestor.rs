//! # Ingestor Module
//!
//! Payload validation and ingestion protocol for the proxtrace CORE.
//!
//! - Validate tracking payloads before any graph mutation
//! - Reject malformed input and self-interactions at the boundary
//! - Apply all device upserts first, then the interaction, so an edge
//!   may reference a device introduced in the same payload

use crate::graph::GraphStore;
use crate::primitives::{MAX_BATCH_DEVICES, MAX_DEVICE_ID_LENGTH, MAX_FIELD_LENGTH};
use crate::types::{Device, Interaction, TrackerError, TrackingPayload};

/// The Ingestor handles payload validation and graph ingestion.
pub struct Ingestor;

impl Ingestor {
    /// Validate a tracking payload.
    ///
    /// A payload is valid if:
    /// - It carries at most `MAX_BATCH_DEVICES` devices
    /// - Every device has a non-empty id within length limits and
    ///   attribute fields within length limits
    /// - Any interaction has distinct endpoints and a non-empty method
    ///
    /// Returns `TrackerError::Validation` or
    /// `TrackerError::SelfInteraction` if validation fails. No
    /// mutation happens until the whole payload has passed.
    pub fn validate(payload: &TrackingPayload) -> Result<(), TrackerError> {
        if payload.devices.len() > MAX_BATCH_DEVICES {
            return Err(TrackerError::Validation(format!(
                "payload carries {} devices, maximum is {}",
                payload.devices.len(),
                MAX_BATCH_DEVICES
            )));
        }

        for device in &payload.devices {
            Self::validate_device(device)?;
        }

        if let Some(interaction) = &payload.interaction {
            Self::validate_interaction(interaction)?;
        }

        Ok(())
    }

    fn validate_device(device: &Device) -> Result<(), TrackerError> {
        if device.id.as_str().is_empty() {
            return Err(TrackerError::Validation("device id is empty".to_string()));
        }
        if device.id.as_str().len() > MAX_DEVICE_ID_LENGTH {
            return Err(TrackerError::Validation(format!(
                "device id length {} exceeds maximum {}",
                device.id.as_str().len(),
                MAX_DEVICE_ID_LENGTH
            )));
        }

        for (field, value) in [
            ("name", &device.name),
            ("brand", &device.brand),
            ("model", &device.model),
            ("os", &device.os),
        ] {
            if value.len() > MAX_FIELD_LENGTH {
                return Err(TrackerError::Validation(format!(
                    "device {field} length {} exceeds maximum {}",
                    value.len(),
                    MAX_FIELD_LENGTH
                )));
            }
        }

        Ok(())
    }

    fn validate_interaction(interaction: &Interaction) -> Result<(), TrackerError> {
        if interaction.from_device.as_str().is_empty() || interaction.to_device.as_str().is_empty()
        {
            return Err(TrackerError::Validation(
                "interaction endpoint id is empty".to_string(),
            ));
        }
        if interaction.from_device == interaction.to_device {
            return Err(TrackerError::SelfInteraction(
                interaction.from_device.clone(),
            ));
        }
        if interaction.method.is_empty() {
            return Err(TrackerError::Validation(
                "interaction method is empty".to_string(),
            ));
        }
        if interaction.method.len() > MAX_FIELD_LENGTH {
            return Err(TrackerError::Validation(format!(
                "interaction method length {} exceeds maximum {}",
                interaction.method.len(),
                MAX_FIELD_LENGTH
            )));
        }
        Ok(())
    }

    /// Ingest a tracking payload into any graph store.
    ///
    /// Works with both the in-memory `DeviceGraph` and the persistent
    /// `RedbDeviceGraph`. Device upserts are applied in payload order
    /// before the interaction.
    ///
    /// Partial-batch semantics: upserts already applied are NOT rolled
    /// back when the interaction is rejected by the store. Upserts are
    /// idempotent, so re-submission of the same payload is safe.
    pub fn ingest<G: GraphStore + ?Sized>(
        graph: &mut G,
        payload: &TrackingPayload,
    ) -> Result<(), TrackerError> {
        Self::validate(payload)?;

        for device in &payload.devices {
            graph.upsert_device(device.clone())?;
        }

        if let Some(interaction) = &payload.interaction {
            graph.add_interaction(interaction.clone())?;
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DeviceGraph;
    use crate::types::{DeviceId, Location};
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

    fn interaction(from: &str, to: &str) -> Interaction {
        Interaction {
            from_device: DeviceId::new(from),
            to_device: DeviceId::new(to),
            method: "Bluetooth".to_string(),
            bluetooth_version: Some("5.1".to_string()),
            signal_strength_dbm: -55,
            distance_meters: 1.0,
            duration_seconds: 45,
            timestamp: ts("2024-05-01T12:00:00Z"),
        }
    }

    #[test]
    fn validate_rejects_self_interaction() {
        let payload = TrackingPayload {
            devices: vec![device("d1")],
            interaction: Some(interaction("d1", "d1")),
        };
        assert!(matches!(
            Ingestor::validate(&payload),
            Err(TrackerError::SelfInteraction(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_method() {
        let mut edge = interaction("d1", "d2");
        edge.method = String::new();
        let payload = TrackingPayload {
            devices: vec![],
            interaction: Some(edge),
        };
        assert!(matches!(
            Ingestor::validate(&payload),
            Err(TrackerError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_oversized_device_id() {
        let payload = TrackingPayload {
            devices: vec![device(&"x".repeat(257))],
            interaction: None,
        };
        assert!(matches!(
            Ingestor::validate(&payload),
            Err(TrackerError::Validation(_))
        ));
    }

    #[test]
    fn self_interaction_stores_nothing() {
        let mut graph = DeviceGraph::new();
        let payload = TrackingPayload {
            devices: vec![device("d1")],
            interaction: Some(interaction("d1", "d1")),
        };

        assert!(Ingestor::ingest(&mut graph, &payload).is_err());
        // Validation runs before any mutation: even the device upsert
        // is withheld.
        assert_eq!(graph.device_count().expect("count"), 0);
        assert_eq!(graph.interaction_count().expect("count"), 0);
    }

    #[test]
    fn interaction_resolves_devices_from_same_payload() {
        let mut graph = DeviceGraph::new();
        let payload = TrackingPayload {
            devices: vec![device("d1"), device("d2")],
            interaction: Some(interaction("d1", "d2")),
        };

        Ingestor::ingest(&mut graph, &payload).expect("ingest");
        assert_eq!(graph.device_count().expect("count"), 2);
        assert_eq!(graph.interaction_count().expect("count"), 1);
    }

    #[test]
    fn unknown_endpoint_keeps_applied_upserts() {
        let mut graph = DeviceGraph::new();
        let payload = TrackingPayload {
            devices: vec![device("d1")],
            interaction: Some(interaction("d1", "never-seen")),
        };

        let result = Ingestor::ingest(&mut graph, &payload);
        assert!(matches!(result, Err(TrackerError::UnknownDevice(_))));

        // The device upsert survives; re-submission is safe.
        assert_eq!(graph.device_count().expect("count"), 1);
        assert_eq!(graph.interaction_count().expect("count"), 0);
    }

    #[test]
    fn ingest_devices_only_payload() {
        let mut graph = DeviceGraph::new();
        let payload = TrackingPayload {
            devices: vec![device("d1"), device("d2"), device("d3")],
            interaction: None,
        };

        Ingestor::ingest(&mut graph, &payload).expect("ingest");
        assert_eq!(graph.device_count().expect("count"), 3);
        assert_eq!(graph.interaction_count().expect("count"), 0);
    }

    #[test]
    fn reingesting_same_payload_is_idempotent_for_devices() {
        let mut graph = DeviceGraph::new();
        let payload = TrackingPayload {
            devices: vec![device("d1"), device("d2")],
            interaction: None,
        };

        Ingestor::ingest(&mut graph, &payload).expect("ingest");
        Ingestor::ingest(&mut graph, &payload).expect("ingest");
        assert_eq!(graph.device_count().expect("count"), 2);
    }
}
