//! # Proxtrace CLI Module
//!
//! This module implements the CLI interface for proxtrace.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show graph status
//! - `ingest` - Ingest tracking payloads from a file
//! - `query` - Execute a query on the graph
//! - `export` - Export graph to file
//! - `import` - Import graph from file
//! - `init` - Initialize new database

mod commands;

use clap::{Parser, Subcommand};
use proxtrace_core::TrackerError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Proxtrace - Device Proximity Tracker
///
/// An encounter graph of devices and their proximity interactions,
/// with reachability and signal queries over it.
#[derive(Parser, Debug)]
#[command(name = "proxtrace")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the graph database
    #[arg(short = 'D', long, global = true, default_value = "proxtrace.db")]
    pub database: PathBuf,

    /// Storage backend: "file" (snapshot file) or "redb" (ACID database)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "5000")]
        port: u16,
    },

    /// Show graph status
    Status,

    /// Ingest tracking payloads from a JSON file
    Ingest {
        /// Path to the input file (one payload or an array of payloads)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Execute a query on the graph
    Query {
        /// Query type (longest-path, signal, degree, direct, recent)
        #[arg(short = 't', long)]
        query_type: String,

        /// Device id (for degree and recent queries)
        #[arg(long)]
        device: Option<String>,

        /// Source device id (for direct queries)
        #[arg(long)]
        from: Option<String>,

        /// Target device id (for direct queries)
        #[arg(long)]
        to: Option<String>,

        /// Signal strength threshold in dBm (for signal queries)
        #[arg(long, default_value = "-60", allow_hyphen_values = true)]
        threshold: i64,
    },

    /// Export graph to a file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (snapshot, json)
        #[arg(short = 't', long, default_value = "snapshot")]
        format: String,
    },

    /// Import graph from a snapshot file (file backend only)
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), TrackerError> {
    let backend = cli.backend.as_str();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            cmd_server(&cli.database, backend, &host, port).await
        }
        Some(Commands::Status) => cmd_status(&cli.database, backend, json_mode),
        Some(Commands::Ingest { file }) => cmd_ingest(&cli.database, backend, &file),
        Some(Commands::Query {
            query_type,
            device,
            from,
            to,
            threshold,
        }) => cmd_query(
            &cli.database,
            backend,
            json_mode,
            &query_type,
            device.as_deref(),
            from.as_deref(),
            to.as_deref(),
            threshold,
        ),
        Some(Commands::Export { output, format }) => {
            cmd_export(&cli.database, backend, &output, &format)
        }
        Some(Commands::Import { input }) => cmd_import(&cli.database, backend, &input),
        Some(Commands::Init { force }) => cmd_init(&cli.database, backend, force),
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.database, backend, json_mode)
        }
    }
}
