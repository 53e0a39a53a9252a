//! # Proxtrace - Device Proximity Tracker
//!
//! The main binary for the proxtrace encounter graph.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for graph operations
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │              apps/proxtrace (THE BINARY)          │
//! │                                                   │
//! │   ┌─────────────┐         ┌─────────────┐        │
//! │   │   CLI       │         │   HTTP API  │        │
//! │   │  (clap)     │         │   (axum)    │        │
//! │   └──────┬──────┘         └──────┬──────┘        │
//! │          │                       │                │
//! │          └───────────┬───────────┘                │
//! │                      ▼                            │
//! │            ┌──────────────────┐                   │
//! │            │  proxtrace-core  │                   │
//! │            │   (THE LOGIC)    │                   │
//! │            └──────────────────┘                   │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! proxtrace server --host 0.0.0.0 --port 5000
//!
//! # CLI operations
//! proxtrace status
//! proxtrace ingest -f payloads.json
//! proxtrace query -t longest-path
//! proxtrace query -t recent --device phone-1
//! ```

use clap::Parser;
use proxtrace::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — PROXTRACE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("PROXTRACE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "proxtrace=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the proxtrace startup banner.
fn print_banner() {
    println!(
        r#"
  ██████╗ ██████╗  ██████╗ ██╗  ██╗████████╗██████╗  █████╗  ██████╗███████╗
  ██╔══██╗██╔══██╗██╔═══██╗╚██╗██╔╝╚══██╔══╝██╔══██╗██╔══██╗██╔════╝██╔════╝
  ██████╔╝██████╔╝██║   ██║ ╚███╔╝    ██║   ██████╔╝███████║██║     █████╗
  ██╔═══╝ ██╔══██╗██║   ██║ ██╔██╗    ██║   ██╔══██╗██╔══██║██║     ██╔══╝
  ██║     ██║  ██║╚██████╔╝██╔╝ ██╗   ██║   ██║  ██║██║  ██║╚██████╗███████╗
  ╚═╝     ╚═╝  ╚═╝ ╚═════╝ ╚═╝  ╚═╝   ╚═╝   ╚═╝  ╚═╝╚═╝  ╚═╝ ╚═════╝╚══════╝

  Device Proximity Tracker v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
