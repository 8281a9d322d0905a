//! # Stratum CLI Module
//!
//! This module implements the CLI interface for Stratum.
//!
//! ## Available Commands
//!
//! - `init` - Initialize a new repository database
//! - `status` - Show repository status
//! - `create` - Create a metadata element
//! - `get` - Retrieve an element, optionally at an instant
//! - `search` - Paged search over elements
//! - `delete` - Delete an element, optionally cascading
//! - `classify` - Attach a classification to an element
//! - `link-duplicates` - Link two elements as peer duplicates
//! - `correlate` - Manage external identifier correlations

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stratum_core::StratumError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Stratum - Metadata Lifecycle Engine
///
/// Versioned, time-scoped, ownership-scoped metadata elements with
/// classifications, relationships, duplicate stewardship, and external
/// identifier correlation.
#[derive(Parser, Debug)]
#[command(name = "stratum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the repository database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (ACID database) or "memory" (ephemeral)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "stratum.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long = "json", global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty repository database
    Init {
        /// Force initialization even if the database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Show repository status
    Status,

    /// Create a metadata element
    Create {
        /// Guid of the new element
        #[arg(short, long)]
        guid: String,

        /// Element type name
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Properties as name=value pairs (repeatable)
        #[arg(short, long = "property")]
        properties: Vec<String>,

        /// Anchor the element to an existing element
        #[arg(long)]
        anchor: Option<String>,

        /// Broader scope of the anchoring
        #[arg(long)]
        anchor_scope: Option<String>,

        /// Make the element its own anchor
        #[arg(long)]
        own_anchor: bool,
    },

    /// Retrieve an element
    Get {
        /// Guid of the element
        guid: String,

        /// Effectivity instant in epoch milliseconds (default: any time)
        #[arg(long)]
        at: Option<i64>,
    },

    /// Paged search over elements
    Search {
        /// Restrict to an element type
        #[arg(short = 't', long = "type")]
        type_name: Option<String>,

        /// Exact-match conditions as name=value pairs (repeatable)
        #[arg(short, long = "property")]
        properties: Vec<String>,

        /// Substring conditions as name=needle pairs (repeatable)
        #[arg(long = "contains")]
        contains: Vec<String>,

        /// Require a classification of this name
        #[arg(long)]
        classification: Option<String>,

        /// Effectivity instant in epoch milliseconds
        #[arg(long)]
        at: Option<i64>,

        /// Zero-based result offset
        #[arg(long, default_value = "0")]
        start: usize,

        /// Page size (0 selects the configured default)
        #[arg(long, default_value = "0")]
        page_size: usize,
    },

    /// Delete an element
    Delete {
        /// Guid of the element
        guid: String,

        /// Also delete everything anchored to the element
        #[arg(long)]
        cascade: bool,
    },

    /// Attach a classification to an element
    Classify {
        /// Guid of the element
        guid: String,

        /// Classification name
        #[arg(short, long)]
        name: String,

        /// Classification properties as name=value pairs (repeatable)
        #[arg(short, long = "property")]
        properties: Vec<String>,
    },

    /// Link two elements as peer duplicates
    LinkDuplicates {
        /// Guid of the first element
        element1: String,

        /// Guid of the second element
        element2: String,

        /// Steward-assigned review status code
        #[arg(long, default_value = "0")]
        status: i64,

        /// Who asserted the duplication
        #[arg(long)]
        steward: Option<String>,

        /// Stamp both elements as known duplicates
        #[arg(long)]
        known: bool,
    },

    /// Manage external identifier correlations
    Correlate {
        #[command(subcommand)]
        action: CorrelateAction,
    },
}

/// Correlation subcommands.
#[derive(Subcommand, Debug)]
pub enum CorrelateAction {
    /// Correlate an element with an external identifier
    Add {
        /// Guid of the external system's scope
        #[arg(long)]
        scope: String,

        /// Guid of the element
        #[arg(long)]
        element: String,

        /// The identifier in the external system
        #[arg(long)]
        identifier: String,

        /// Type name on the external side
        #[arg(long)]
        external_type: Option<String>,

        /// Type name of the element side
        #[arg(long, default_value = "Referenceable")]
        open_type: String,
    },

    /// Advance the last-synchronized checkpoint to now
    Confirm {
        #[arg(long)]
        scope: String,
        #[arg(long)]
        element: String,
        #[arg(long)]
        identifier: String,
    },

    /// Remove the correlation record
    Remove {
        #[arg(long)]
        scope: String,
        #[arg(long)]
        element: String,
        #[arg(long)]
        identifier: String,
    },

    /// Check that the identifier is correlated to the element
    Validate {
        #[arg(long)]
        scope: String,
        #[arg(long)]
        element: String,
        #[arg(long)]
        identifier: String,

        /// Effectivity instant in epoch milliseconds
        #[arg(long)]
        at: Option<i64>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), StratumError> {
    let config = AppConfig::load(&cli.config)?;
    let database = cli
        .database
        .or_else(|| config.database.clone())
        .unwrap_or_else(|| PathBuf::from("stratum.redb"));
    let backend = cli.backend.as_str();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&database, backend, force),
        Some(Commands::Status) => cmd_status(&database, backend, json_mode),
        Some(Commands::Create {
            guid,
            type_name,
            properties,
            anchor,
            anchor_scope,
            own_anchor,
        }) => cmd_create(
            &database,
            backend,
            json_mode,
            &guid,
            &type_name,
            &properties,
            anchor.as_deref(),
            anchor_scope.as_deref(),
            own_anchor,
        ),
        Some(Commands::Get { guid, at }) => cmd_get(&database, backend, json_mode, &guid, at),
        Some(Commands::Search {
            type_name,
            properties,
            contains,
            classification,
            at,
            start,
            page_size,
        }) => cmd_search(
            &database,
            backend,
            json_mode,
            &config,
            type_name.as_deref(),
            &properties,
            &contains,
            classification.as_deref(),
            at,
            start,
            page_size,
        ),
        Some(Commands::Delete { guid, cascade }) => {
            cmd_delete(&database, backend, json_mode, &guid, cascade)
        }
        Some(Commands::Classify {
            guid,
            name,
            properties,
        }) => cmd_classify(&database, backend, json_mode, &guid, &name, &properties),
        Some(Commands::LinkDuplicates {
            element1,
            element2,
            status,
            steward,
            known,
        }) => cmd_link_duplicates(
            &database,
            backend,
            json_mode,
            &element1,
            &element2,
            status,
            steward.as_deref(),
            known,
        ),
        Some(Commands::Correlate { action }) => {
            cmd_correlate(&database, backend, json_mode, action)
        }
        None => {
            // No subcommand - show status by default
            cmd_status(&database, backend, json_mode)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_output_flag_parses() {
        let cli = Cli::try_parse_from(["stratum", "--json", "status"]).expect("parse");
        assert!(cli.json_mode);

        let cli = Cli::try_parse_from(["stratum", "status"]).expect("parse");
        assert!(!cli.json_mode);
    }
}
