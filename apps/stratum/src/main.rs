//! # Stratum - Metadata Lifecycle Engine
//!
//! The main binary for the Stratum metadata repository.
//!
//! This application provides the CLI interface for element lifecycle,
//! classification, duplicate stewardship, and external-identifier
//! correlation over the deterministic engine in stratum-core.
//!
//! ## Usage
//!
//! ```bash
//! # Initialize a repository
//! stratum init
//!
//! # CLI operations
//! stratum status
//! stratum create --guid db-1 --type Asset --property displayName=orders
//! stratum search --type Asset --contains displayName=orders
//! stratum delete db-1 --cascade
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Initialize tracing; STRATUM_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("STRATUM_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stratum=info".into());

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

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
