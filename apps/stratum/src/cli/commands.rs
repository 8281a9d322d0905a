//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! The engine carries no clock, so every command advances the context to
//! the wall-clock instant of the invocation before mutating.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use stratum_core::{
    Classification, DuplicateProperties, EffectivityWindow, ElementProperties,
    ExternalIdentifierProperties, GovernanceContext, Guid, NewElementSpec,
    ProvisioningCapability, PropertyCondition, PropertyValue, RemediationCapability, SearchSpec,
    StratumError, Timestamp, VerificationCapability,
};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Optional `stratum.toml` configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Default database path when no `--database` flag is given.
    pub database: Option<PathBuf>,
    /// Default search page size.
    pub page_size: Option<usize>,
}

impl AppConfig {
    /// Load the configuration file; a missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self, StratumError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StratumError::IoError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|e| {
            StratumError::InvalidParameter(format!(
                "malformed config '{}': {e}",
                path.display()
            ))
        })
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Wall-clock instant of the invocation, as epoch milliseconds.
fn system_now() -> Timestamp {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    Timestamp::new(i64::try_from(millis).unwrap_or(i64::MAX))
}

fn open_context(database: &Path, backend: &str) -> Result<GovernanceContext, StratumError> {
    let mut context = match backend {
        "memory" => GovernanceContext::in_memory(),
        "redb" => GovernanceContext::open(database)?,
        other => {
            return Err(StratumError::InvalidParameter(format!(
                "unknown backend '{other}' (expected 'redb' or 'memory')"
            )));
        }
    };
    context.advance_to(system_now());
    Ok(context)
}

/// Parse `name=value` pairs into typed properties. Integers and booleans
/// are recognized; everything else is text.
fn parse_properties(pairs: &[String]) -> Result<ElementProperties, StratumError> {
    let mut properties = ElementProperties::new();
    for pair in pairs {
        let (name, value) = split_pair(pair)?;
        let value = if let Ok(integer) = value.parse::<i64>() {
            PropertyValue::Integer(integer)
        } else if let Ok(flag) = value.parse::<bool>() {
            PropertyValue::Boolean(flag)
        } else {
            PropertyValue::Text(value.to_string())
        };
        properties.insert(name.to_string(), value);
    }
    Ok(properties)
}

fn split_pair(pair: &str) -> Result<(&str, &str), StratumError> {
    pair.split_once('=').ok_or_else(|| {
        StratumError::InvalidParameter(format!("expected name=value, got '{pair}'"))
    })
}

fn print_json<T: serde::Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty repository database.
pub fn cmd_init(database: &Path, backend: &str, force: bool) -> Result<(), StratumError> {
    if backend == "memory" {
        return Err(StratumError::InvalidParameter(
            "the memory backend needs no initialization".to_string(),
        ));
    }
    if database.exists() && !force {
        return Err(StratumError::InvalidParameter(format!(
            "database '{}' already exists (use --force to re-initialize)",
            database.display()
        )));
    }
    if database.exists() {
        std::fs::remove_file(database).map_err(|e| {
            StratumError::IoError(format!("cannot remove '{}': {e}", database.display()))
        })?;
    }

    let context = open_context(database, backend)?;
    tracing::info!(database = %database.display(), "repository initialized");
    println!("Initialized empty repository at {:?}", database);
    println!("Elements: {}", context.element_count()?);
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show repository status.
pub fn cmd_status(database: &Path, backend: &str, json_mode: bool) -> Result<(), StratumError> {
    let context = open_context(database, backend)?;
    let element_count = context.element_count()?;
    let relationship_count = context.relationship_count()?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": database.to_string_lossy(),
            "backend": backend,
            "element_count": element_count,
            "relationship_count": relationship_count,
        }));
        return Ok(());
    }

    println!("Stratum Repository Status");
    println!("=========================");
    println!("Database: {:?}", database);
    println!("Backend:  {}", backend);
    println!();
    println!("Elements:      {}", element_count);
    println!("Relationships: {}", relationship_count);
    Ok(())
}

// =============================================================================
// CREATE COMMAND
// =============================================================================

/// Create a metadata element.
pub fn cmd_create(
    database: &Path,
    backend: &str,
    json_mode: bool,
    guid: &str,
    type_name: &str,
    properties: &[String],
    anchor: Option<&str>,
    anchor_scope: Option<&str>,
    own_anchor: bool,
) -> Result<(), StratumError> {
    let mut context = open_context(database, backend)?;

    let mut spec = NewElementSpec::new(
        Guid::new(guid),
        type_name,
        parse_properties(properties)?,
    );
    spec.anchor_guid = anchor.map(Guid::new);
    spec.anchor_scope_guid = anchor_scope.map(Guid::new);
    spec.is_own_anchor = own_anchor;

    let created = context.create_element(spec)?;
    tracing::info!(guid = %created, type_name, "element created");

    if json_mode {
        print_json(&serde_json::json!({ "guid": created.as_str() }));
    } else {
        println!("Created {} '{}'", type_name, created);
    }
    Ok(())
}

// =============================================================================
// GET COMMAND
// =============================================================================

/// Retrieve an element, optionally at an effectivity instant.
pub fn cmd_get(
    database: &Path,
    backend: &str,
    json_mode: bool,
    guid: &str,
    at: Option<i64>,
) -> Result<(), StratumError> {
    let context = open_context(database, backend)?;
    let guid = Guid::new(guid);
    let element = context
        .get_element(&guid, at.map(Timestamp::new))?
        .ok_or_else(|| StratumError::ElementNotFound(guid))?;

    if json_mode {
        print_json(&element);
        return Ok(());
    }

    println!("{} ({})", element.guid, element.type_name);
    println!("Status: {:?}", element.status);
    for (name, value) in &element.properties {
        println!("  {name} = {value:?}");
    }
    for classification in &element.classifications {
        println!("  [{}]", classification.name);
    }
    Ok(())
}

// =============================================================================
// SEARCH COMMAND
// =============================================================================

/// Paged search over elements.
pub fn cmd_search(
    database: &Path,
    backend: &str,
    json_mode: bool,
    config: &AppConfig,
    type_name: Option<&str>,
    properties: &[String],
    contains: &[String],
    classification: Option<&str>,
    at: Option<i64>,
    start: usize,
    page_size: usize,
) -> Result<(), StratumError> {
    let context = open_context(database, backend)?;

    let mut spec = SearchSpec {
        type_name: type_name.map(str::to_string),
        classification: classification.map(str::to_string),
        effective_at: at.map(Timestamp::new),
        start,
        page_size: if page_size == 0 {
            config.page_size.unwrap_or(0)
        } else {
            page_size
        },
        ..SearchSpec::default()
    };
    for (name, value) in parse_properties(properties)? {
        spec.conditions.push(PropertyCondition::equals(name, value));
    }
    for pair in contains {
        let (name, needle) = split_pair(pair)?;
        spec.conditions.push(PropertyCondition::contains(name, needle));
    }

    let results = context.find_elements(&spec)?;

    if json_mode {
        print_json(&results);
        return Ok(());
    }

    println!("{} element(s)", results.len());
    for element in &results {
        let display_name = element
            .properties
            .get("displayName")
            .and_then(PropertyValue::as_text)
            .unwrap_or("-");
        println!("  {}  {}  {}", element.guid, element.type_name, display_name);
    }
    Ok(())
}

// =============================================================================
// DELETE COMMAND
// =============================================================================

/// Delete an element, optionally cascading over its anchored closure.
pub fn cmd_delete(
    database: &Path,
    backend: &str,
    json_mode: bool,
    guid: &str,
    cascade: bool,
) -> Result<(), StratumError> {
    let mut context = open_context(database, backend)?;
    let removed = context.delete_element(&Guid::new(guid), cascade)?;
    tracing::info!(guid, removed = removed.len(), "element deleted");

    if json_mode {
        let guids: Vec<&str> = removed.iter().map(Guid::as_str).collect();
        print_json(&serde_json::json!({ "removed": guids }));
    } else {
        println!("Removed {} element(s)", removed.len());
        for removed_guid in &removed {
            println!("  {removed_guid}");
        }
    }
    Ok(())
}

// =============================================================================
// CLASSIFY COMMAND
// =============================================================================

/// Attach a classification to an element.
pub fn cmd_classify(
    database: &Path,
    backend: &str,
    json_mode: bool,
    guid: &str,
    name: &str,
    properties: &[String],
) -> Result<(), StratumError> {
    let mut context = open_context(database, backend)?;
    context.classify_element(
        &Guid::new(guid),
        Classification::new(name, parse_properties(properties)?),
    )?;

    if json_mode {
        print_json(&serde_json::json!({ "guid": guid, "classification": name }));
    } else {
        println!("Classified '{guid}' as {name}");
    }
    Ok(())
}

// =============================================================================
// DUPLICATE COMMANDS
// =============================================================================

/// Link two elements as peer duplicates.
pub fn cmd_link_duplicates(
    database: &Path,
    backend: &str,
    json_mode: bool,
    element1: &str,
    element2: &str,
    status: i64,
    steward: Option<&str>,
    known: bool,
) -> Result<(), StratumError> {
    let mut context = open_context(database, backend)?;
    let link = context.link_peer_duplicates(
        &Guid::new(element1),
        &Guid::new(element2),
        &DuplicateProperties {
            status_identifier: status,
            steward: steward.map(str::to_string),
            source: None,
            notes: None,
        },
        known,
    )?;

    if json_mode {
        print_json(&serde_json::json!({ "link": link.as_str() }));
    } else {
        println!("Linked '{element1}' and '{element2}' via {link}");
    }
    Ok(())
}

// =============================================================================
// CORRELATION COMMANDS
// =============================================================================

/// Manage external identifier correlations.
pub fn cmd_correlate(
    database: &Path,
    backend: &str,
    json_mode: bool,
    action: super::CorrelateAction,
) -> Result<(), StratumError> {
    let mut context = open_context(database, backend)?;

    match action {
        super::CorrelateAction::Add {
            scope,
            element,
            identifier,
            external_type,
            open_type,
        } => {
            context.add_external_identifier(
                &Guid::new(scope),
                &Guid::new(element.as_str()),
                &ExternalIdentifierProperties {
                    identifier: identifier.clone(),
                    external_type_name: external_type,
                    open_type_name: open_type,
                    mapping_properties: ElementProperties::new(),
                },
                EffectivityWindow::unbounded(),
            )?;
            if json_mode {
                print_json(&serde_json::json!({ "element": element, "identifier": identifier }));
            } else {
                println!("Correlated '{element}' with '{identifier}'");
            }
        }
        super::CorrelateAction::Confirm {
            scope,
            element,
            identifier,
        } => {
            context.confirm_synchronization(
                &Guid::new(scope),
                &Guid::new(element.as_str()),
                &identifier,
            )?;
            if json_mode {
                print_json(&serde_json::json!({
                    "element": element,
                    "identifier": identifier,
                    "synchronized_at": context.now().millis(),
                }));
            } else {
                println!("Confirmed synchronization of '{identifier}'");
            }
        }
        super::CorrelateAction::Remove {
            scope,
            element,
            identifier,
        } => {
            context.remove_external_identifier(
                &Guid::new(scope),
                &Guid::new(element.as_str()),
                &identifier,
            )?;
            if json_mode {
                print_json(&serde_json::json!({ "element": element, "removed": identifier }));
            } else {
                println!("Removed correlation '{identifier}'");
            }
        }
        super::CorrelateAction::Validate {
            scope,
            element,
            identifier,
            at,
        } => {
            let valid = context.validate_external_identifier(
                &Guid::new(scope),
                &Guid::new(element.as_str()),
                &identifier,
                at.map(Timestamp::new),
            )?;
            if json_mode {
                print_json(&serde_json::json!({ "identifier": identifier, "valid": valid }));
            } else if valid {
                println!("'{identifier}' is correlated to '{element}'");
            } else {
                println!("'{identifier}' is NOT correlated to '{element}'");
            }
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_pairs_are_typed() {
        let properties = parse_properties(&[
            "displayName=orders".to_string(),
            "rows=42".to_string(),
            "archived=true".to_string(),
        ])
        .expect("parse");

        assert_eq!(
            properties.get("displayName"),
            Some(&PropertyValue::Text("orders".to_string()))
        );
        assert_eq!(properties.get("rows"), Some(&PropertyValue::Integer(42)));
        assert_eq!(
            properties.get("archived"),
            Some(&PropertyValue::Boolean(true))
        );
    }

    #[test]
    fn malformed_pair_rejected() {
        let result = parse_properties(&["no-equals-sign".to_string()]);
        assert!(matches!(result, Err(StratumError::InvalidParameter(_))));
    }

    #[test]
    fn missing_config_is_default() {
        let config = AppConfig::load(Path::new("/nonexistent/stratum.toml")).expect("load");
        assert!(config.database.is_none());
        assert!(config.page_size.is_none());
    }

    #[test]
    fn config_round_trip() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("stratum.toml");
        std::fs::write(&path, "database = \"repo.redb\"\npage_size = 25\n").expect("write");

        let config = AppConfig::load(&path).expect("load");
        assert_eq!(config.database, Some(PathBuf::from("repo.redb")));
        assert_eq!(config.page_size, Some(25));
    }

    #[test]
    fn create_and_get_through_cli_layer() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let database = dir.path().join("stratum.redb");

        cmd_create(
            &database,
            "redb",
            false,
            "db-1",
            "Asset",
            &["displayName=orders".to_string()],
            None,
            None,
            true,
        )
        .expect("create");

        cmd_get(&database, "redb", false, "db-1", None).expect("get");
        cmd_status(&database, "redb", true).expect("status");
    }
}
