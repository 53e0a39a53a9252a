//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use proxtrace_core::{
    DeviceGraph, DeviceId, SerializableGraph, Session, TrackerError, TrackingPayload,
    graph_from_bytes, graph_to_bytes,
    primitives::MAX_BATCH_DEVICES,
};
use std::path::PathBuf;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for ingestion (100 MB).
const MAX_INGEST_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum file size for import (500 MB).
///
/// Import files can be larger since they contain binary graph data.
const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &PathBuf, max_size: u64) -> Result<(), TrackerError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| TrackerError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(TrackerError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate file path: canonicalize to resolve symlinks and "..",
/// ensure the path exists and is a regular file.
fn validate_file_path(path: &std::path::Path) -> Result<PathBuf, TrackerError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| TrackerError::Io(format!("Invalid file path '{}': {}", path.display(), e)))?;

    if !canonical.is_file() {
        return Err(TrackerError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate output path: the parent directory must exist.
fn validate_output_path(path: &std::path::Path) -> Result<PathBuf, TrackerError> {
    let parent = path.parent().unwrap_or(std::path::Path::new("."));

    let canonical_parent = parent.canonicalize().map_err(|e| {
        TrackerError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(TrackerError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| TrackerError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    db_path: &PathBuf,
    backend: &str,
    host: &str,
    port: u16,
) -> Result<(), TrackerError> {
    let session = load_or_create_session(db_path, backend)?;

    println!("Proxtrace Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", backend);
    println!("  Database: {:?}", db_path);
    println!();
    println!("Endpoints:");
    println!("  POST /api/phone_tracker            - Ingest a tracking payload");
    println!("  GET  /api/bluetooth_connections    - Longest Bluetooth path");
    println!("  GET  /api/strong_signal_devices    - Edges above a signal threshold");
    println!("  GET  /api/device_connections       - Connection count for a device");
    println!("  GET  /api/direct_connection        - Whether two devices share an edge");
    println!("  GET  /api/most_recent_interaction  - Newest edge for a device");
    println!("  GET  /status                       - Graph status");
    println!("  GET  /health                       - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, session).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show graph status.
pub fn cmd_status(db_path: &PathBuf, backend: &str, json_mode: bool) -> Result<(), TrackerError> {
    let session = load_or_create_session(db_path, backend)?;

    let device_count = session.device_count()?;
    let interaction_count = session.interaction_count()?;

    if json_mode {
        let output = serde_json::json!({
            "database": db_path.to_string_lossy(),
            "backend": backend,
            "device_count": device_count,
            "interaction_count": interaction_count,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Proxtrace Graph Status");
    println!("======================");
    println!("Database: {:?}", db_path);
    println!("Backend:  {}", backend);
    println!();
    println!("Devices:      {}", device_count);
    println!("Interactions: {}", interaction_count);

    Ok(())
}

// =============================================================================
// INGEST COMMAND
// =============================================================================

/// Ingest tracking payloads from a JSON file.
///
/// Accepts either a single payload object or an array of payloads.
pub fn cmd_ingest(db_path: &PathBuf, backend: &str, file: &PathBuf) -> Result<(), TrackerError> {
    tracing::info!("Ingesting from {:?}", file);

    let mut session = load_or_create_session(db_path, backend)?;

    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_INGEST_FILE_SIZE)?;

    let contents = std::fs::read(&validated_path)
        .map_err(|e| TrackerError::Io(format!("Read file: {}", e)))?;

    let payloads: Vec<TrackingPayload> = match serde_json::from_slice::<Vec<TrackingPayload>>(
        &contents,
    ) {
        Ok(list) => list,
        Err(_) => {
            let single: TrackingPayload = serde_json::from_slice(&contents).map_err(|e| {
                TrackerError::Serialization(format!("Could not parse payload file: {}", e))
            })?;
            vec![single]
        }
    };

    if payloads.len() > MAX_BATCH_DEVICES {
        return Err(TrackerError::Serialization(format!(
            "Payload count {} exceeds maximum allowed {}",
            payloads.len(),
            MAX_BATCH_DEVICES
        )));
    }

    let count = payloads.len();
    for payload in &payloads {
        session.ingest(payload)?;
    }

    save_session(&session, db_path)?;

    println!("Ingested {} payloads", count);
    println!(
        "Graph now has {} devices, {} interactions",
        session.device_count()?,
        session.interaction_count()?
    );

    Ok(())
}

// =============================================================================
// QUERY COMMAND
// =============================================================================

/// Execute a query.
#[allow(clippy::too_many_arguments)]
pub fn cmd_query(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    query_type: &str,
    device: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    threshold: i64,
) -> Result<(), TrackerError> {
    let session = load_or_create_session(db_path, backend)?;

    let missing = |arg: &str| TrackerError::Validation(format!("Missing argument: --{}", arg));

    match query_type {
        "longest-path" => {
            let length = session.longest_bluetooth_path()?;
            if json_mode {
                println!("{}", serde_json::json!({ "result": length }));
            } else {
                println!("Longest Bluetooth path: {} hops", length);
            }
        }

        "signal" => {
            let readings = session.devices_with_signal_above(threshold)?;
            if json_mode {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({ "result": readings }))
                        .unwrap_or_default()
                );
            } else {
                println!("Edges with signal above {} dBm:", threshold);
                for reading in &readings {
                    println!(
                        "  {} -> {} ({} dBm)",
                        reading.device_from, reading.device_to, reading.signal_strength_dbm
                    );
                }
                println!("Total: {}", readings.len());
            }
        }

        "degree" => {
            let device_id = DeviceId::new(device.ok_or_else(|| missing("device"))?);
            let count = session.connection_count(&device_id)?;
            if json_mode {
                println!("{}", serde_json::json!({ "result": count }));
            } else {
                println!("Device {} has {} connections", device_id, count);
            }
        }

        "direct" => {
            let from_id = DeviceId::new(from.ok_or_else(|| missing("from"))?);
            let to_id = DeviceId::new(to.ok_or_else(|| missing("to"))?);
            let connected = session.is_directly_connected(&from_id, &to_id)?;
            if json_mode {
                println!("{}", serde_json::json!({ "result": connected }));
            } else if connected {
                println!("{} and {} are directly connected", from_id, to_id);
            } else {
                println!("{} and {} are not directly connected", from_id, to_id);
            }
        }

        "recent" => {
            let device_id = DeviceId::new(device.ok_or_else(|| missing("device"))?);
            match session.most_recent_interaction(&device_id)? {
                Some(recent) => {
                    if json_mode {
                        println!(
                            "{}",
                            serde_json::json!({
                                "result": {
                                    "other_device_id": recent.other_device_id,
                                    "interaction_timestamp": recent.timestamp,
                                }
                            })
                        );
                    } else {
                        println!(
                            "Most recent interaction for {}: {} at {}",
                            device_id,
                            recent.other_device_id,
                            recent.timestamp.to_rfc3339()
                        );
                    }
                }
                None => {
                    if json_mode {
                        println!("{}", serde_json::json!({ "result": null }));
                    } else {
                        println!("Device {} has no interactions", device_id);
                    }
                }
            }
        }

        _ => {
            return Err(TrackerError::Validation(format!(
                "Unknown query type: {}. Use: longest-path, signal, degree, direct, recent",
                query_type
            )));
        }
    }

    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export graph to a file.
///
/// Works with both in-memory and persistent backends by building a
/// graph snapshot first.
pub fn cmd_export(
    db_path: &PathBuf,
    backend: &str,
    output: &std::path::Path,
    format: &str,
) -> Result<(), TrackerError> {
    let validated_output = validate_output_path(output)?;

    let session = load_or_create_session(db_path, backend)?;
    let graph = session.export_graph_snapshot()?;

    let data = match format {
        "snapshot" => graph_to_bytes(&graph)?,
        "json" => {
            let serializable = SerializableGraph::from(&graph);
            serde_json::to_vec_pretty(&serializable)
                .map_err(|e| TrackerError::Serialization(e.to_string()))?
        }
        _ => {
            return Err(TrackerError::Serialization(format!(
                "Unknown format: {}. Use: snapshot, json",
                format
            )));
        }
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| TrackerError::Io(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);

    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Import graph from a snapshot file.
pub fn cmd_import(
    db_path: &PathBuf,
    backend: &str,
    input: &std::path::Path,
) -> Result<(), TrackerError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| TrackerError::Io(format!("Read file: {}", e)))?;

    let graph = graph_from_bytes(&data)?;
    let session = Session::with_graph(graph);

    if backend == "redb" {
        return Err(TrackerError::Serialization(
            "Import to redb not yet supported. Use file backend.".to_string(),
        ));
    }

    save_session(&session, db_path)?;

    println!(
        "Imported graph: {} devices, {} interactions",
        session.device_count()?,
        session.interaction_count()?
    );

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize new database.
pub fn cmd_init(db_path: &PathBuf, backend: &str, force: bool) -> Result<(), TrackerError> {
    if db_path.exists() && !force {
        return Err(TrackerError::Serialization(
            "Database already exists. Use --force to overwrite.".to_string(),
        ));
    }

    match backend {
        "redb" => {
            let _session = Session::with_redb(db_path)?;
            println!("Initialized new redb database at {:?}", db_path);
        }
        _ => {
            let session = Session::new();
            save_session(&session, db_path)?;
            println!("Initialized new file database at {:?}", db_path);
        }
    }

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load or create a session from a database path with specified backend.
pub fn load_or_create_session(db_path: &PathBuf, backend: &str) -> Result<Session, TrackerError> {
    match backend {
        "redb" => Session::with_redb(db_path),
        _ => {
            if db_path.exists() {
                let data = std::fs::read(db_path)
                    .map_err(|e| TrackerError::Io(format!("Read db: {}", e)))?;

                // Try binary snapshot format first
                if let Ok(graph) = graph_from_bytes(&data) {
                    return Ok(Session::with_graph(graph));
                }

                // Try JSON format
                if let Ok(serializable) = serde_json::from_slice::<SerializableGraph>(&data) {
                    return Ok(Session::with_graph(DeviceGraph::from(serializable)));
                }

                Err(TrackerError::Serialization(
                    "Could not parse database file".to_string(),
                ))
            } else {
                Ok(Session::new())
            }
        }
    }
}

/// Save a session to a database path.
pub fn save_session(session: &Session, db_path: &PathBuf) -> Result<(), TrackerError> {
    if session.is_persistent() {
        // Redb backend - already persisted, nothing to do
        Ok(())
    } else {
        let graph = session
            .graph()
            .ok_or_else(|| TrackerError::Serialization("No graph available".to_string()))?;
        let data = graph_to_bytes(graph)?;
        std::fs::write(db_path, &data)
            .map_err(|e| TrackerError::Io(format!("Write db: {}", e)))?;
        Ok(())
    }
}
