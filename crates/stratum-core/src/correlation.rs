//! # External Identifier Correlation
//!
//! Mapping between open-metadata elements and identifiers meaningful to
//! external systems, with synchronization checkpoints.
//!
//! A correlation is keyed by (external scope, element, external
//! identifier). The "last confirmed synchronized" checkpoint supports
//! optimistic conflict detection between the two systems: bidirectional
//! sync callers advance it after each push and compare on their next
//! read. Conflict detection itself is the caller's responsibility; this
//! store only records the checkpoint.
//!
//! Removing a correlation never touches the open-metadata element itself.

use crate::effectivity::EffectivityWindow;
use crate::primitives::MAX_EXTERNAL_IDENTIFIER_LENGTH;
use crate::repository::RepositoryStore;
use crate::types::{ElementProperties, Guid, StratumError, Timestamp};
use serde::{Deserialize, Serialize};

// =============================================================================
// CORRELATION RECORDS
// =============================================================================

/// Key of a correlation record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorrelationKey {
    /// Guid of the external system's scope (e.g. its software capability).
    pub scope: Guid,
    /// Guid of the open-metadata element.
    pub element: Guid,
    /// The identifier as the external system knows it.
    pub identifier: String,
}

impl CorrelationKey {
    #[must_use]
    pub fn new(scope: Guid, element: Guid, identifier: impl Into<String>) -> Self {
        Self {
            scope,
            element,
            identifier: identifier.into(),
        }
    }
}

/// Caller-facing description of an external identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExternalIdentifierProperties {
    /// The identifier in the external system.
    pub identifier: String,
    /// Type name of the instance on the external side, if known.
    pub external_type_name: Option<String>,
    /// Type name of the open-metadata element side.
    pub open_type_name: String,
    /// Additional mapping detail (e.g. the external system's key fields).
    pub mapping_properties: ElementProperties,
}

/// A stored correlation record.
///
/// Multiple records may exist for the same key as long as their
/// effectivity windows do not overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    pub key: CorrelationKey,
    pub open_type_name: String,
    pub external_type_name: Option<String>,
    pub mapping_properties: ElementProperties,
    pub effectivity: EffectivityWindow,
    /// Last confirmed synchronization checkpoint.
    pub last_synchronized: Option<Timestamp>,
}

// =============================================================================
// CORRELATION ENGINE
// =============================================================================

/// The correlation operations of the engine, stateless over any
/// [`RepositoryStore`].
pub struct CorrelationEngine;

impl CorrelationEngine {
    /// Create a correlation for (scope, element, identifier).
    ///
    /// Fails with `DuplicateCorrelation` if a record already exists for
    /// the same key with an overlapping effectivity window. Fails with
    /// `ElementNotFound` if the element is absent; validation happens
    /// before any mutation.
    pub fn add_external_identifier(
        store: &mut impl RepositoryStore,
        scope: &Guid,
        element: &Guid,
        properties: &ExternalIdentifierProperties,
        effectivity: EffectivityWindow,
    ) -> Result<(), StratumError> {
        validate_identifier(&properties.identifier)?;
        if store.element(element)?.is_none() {
            return Err(StratumError::ElementNotFound(element.clone()));
        }

        let key = CorrelationKey::new(scope.clone(), element.clone(), &properties.identifier);
        let existing = store.correlations_for_key(&key)?;
        if existing.iter().any(|c| c.effectivity.overlaps(&effectivity)) {
            return Err(StratumError::DuplicateCorrelation {
                external_identifier: properties.identifier.clone(),
            });
        }

        store.insert_correlation(Correlation {
            key,
            open_type_name: properties.open_type_name.clone(),
            external_type_name: properties.external_type_name.clone(),
            mapping_properties: properties.mapping_properties.clone(),
            effectivity,
            last_synchronized: None,
        })
    }

    /// Property-level update of an existing correlation.
    ///
    /// Applies to every record for the key (windows differ, identity does
    /// not). Fails with `CorrelationNotFound` if no record exists.
    pub fn update_external_identifier(
        store: &mut impl RepositoryStore,
        scope: &Guid,
        element: &Guid,
        properties: &ExternalIdentifierProperties,
    ) -> Result<(), StratumError> {
        validate_identifier(&properties.identifier)?;
        let key = CorrelationKey::new(scope.clone(), element.clone(), &properties.identifier);

        let mut records = store.correlations_for_key(&key)?;
        if records.is_empty() {
            return Err(StratumError::CorrelationNotFound {
                external_identifier: properties.identifier.clone(),
            });
        }
        for record in &mut records {
            record.open_type_name = properties.open_type_name.clone();
            record.external_type_name = properties.external_type_name.clone();
            record.mapping_properties = properties.mapping_properties.clone();
        }
        store.replace_correlations(&key, records)
    }

    /// Delete the correlation record(s) for the key.
    ///
    /// Never touches the open-metadata element itself. Fails with
    /// `CorrelationNotFound` if nothing is stored for the key.
    pub fn remove_external_identifier(
        store: &mut impl RepositoryStore,
        scope: &Guid,
        element: &Guid,
        identifier: &str,
    ) -> Result<(), StratumError> {
        let key = CorrelationKey::new(scope.clone(), element.clone(), identifier);
        let removed = store.remove_correlations(&key)?;
        if removed == 0 {
            return Err(StratumError::CorrelationNotFound {
                external_identifier: identifier.to_string(),
            });
        }
        Ok(())
    }

    /// Advance the "last confirmed synchronized" checkpoint to `now`.
    ///
    /// `now` is caller-supplied; the CORE never reads a clock.
    pub fn confirm_synchronization(
        store: &mut impl RepositoryStore,
        scope: &Guid,
        element: &Guid,
        identifier: &str,
        now: Timestamp,
    ) -> Result<(), StratumError> {
        let key = CorrelationKey::new(scope.clone(), element.clone(), identifier);

        let mut records = store.correlations_for_key(&key)?;
        if records.is_empty() {
            return Err(StratumError::CorrelationNotFound {
                external_identifier: identifier.to_string(),
            });
        }
        for record in &mut records {
            record.last_synchronized = Some(now);
        }
        store.replace_correlations(&key, records)
    }

    /// Read-only check that the identifier is correlated to the element
    /// at the given instant.
    ///
    /// Prevents cross-wiring two systems' identifiers to the wrong
    /// element: a sync caller validates before acting on a mapping.
    pub fn validate_external_identifier(
        store: &impl RepositoryStore,
        scope: &Guid,
        element: &Guid,
        identifier: &str,
        at: Option<Timestamp>,
    ) -> Result<bool, StratumError> {
        let key = CorrelationKey::new(scope.clone(), element.clone(), identifier);
        let records = store.correlations_for_key(&key)?;
        Ok(records.iter().any(|c| c.effectivity.is_effective(at)))
    }
}

fn validate_identifier(identifier: &str) -> Result<(), StratumError> {
    if identifier.is_empty() {
        return Err(StratumError::InvalidParameter(
            "external identifier must not be empty".to_string(),
        ));
    }
    if identifier.len() > MAX_EXTERNAL_IDENTIFIER_LENGTH {
        return Err(StratumError::InvalidParameter(format!(
            "external identifier exceeds {MAX_EXTERNAL_IDENTIFIER_LENGTH} bytes"
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
