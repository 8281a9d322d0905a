//! # Duplicate Resolution
//!
//! Peer duplicate links and consolidation.
//!
//! Two elements describing the same real-world thing are linked as peer
//! duplicates; a steward later consolidates a duplicate set into one
//! surviving element. Link relationships are engine-created with
//! deterministically derived guids, so re-linking the same pair updates
//! the existing record instead of creating a second one.

use crate::primitives::{
    CONSOLIDATED_DUPLICATE_CLASSIFICATION, CONSOLIDATED_DUPLICATE_LINK,
    KNOWN_DUPLICATE_CLASSIFICATION, PEER_DUPLICATE_LINK, PROP_NOTES, PROP_SOURCE,
    PROP_STATUS_IDENTIFIER, PROP_STEWARD,
};
use crate::repository::RepositoryStore;
use crate::types::{
    Classification, ElementProperties, Guid, PropertyValue, Relationship, StratumError,
};

// =============================================================================
// DUPLICATE PROPERTIES
// =============================================================================

/// Stewardship detail carried on duplicate links and the
/// `KnownDuplicate` classification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DuplicateProperties {
    /// Steward-assigned review status code.
    pub status_identifier: i64,
    /// Who asserted the duplication.
    pub steward: Option<String>,
    /// Where the assertion came from.
    pub source: Option<String>,
    /// Free-form stewardship notes.
    pub notes: Option<String>,
}

impl DuplicateProperties {
    fn to_properties(&self) -> ElementProperties {
        let mut properties = ElementProperties::new();
        properties.insert(
            PROP_STATUS_IDENTIFIER.to_string(),
            PropertyValue::Integer(self.status_identifier),
        );
        if let Some(steward) = &self.steward {
            properties.insert(
                PROP_STEWARD.to_string(),
                PropertyValue::Text(steward.clone()),
            );
        }
        if let Some(source) = &self.source {
            properties.insert(PROP_SOURCE.to_string(), PropertyValue::Text(source.clone()));
        }
        if let Some(notes) = &self.notes {
            properties.insert(PROP_NOTES.to_string(), PropertyValue::Text(notes.clone()));
        }
        properties
    }
}

// =============================================================================
// DUPLICATE ENGINE
// =============================================================================

/// Duplicate-resolution operations, stateless over any
/// [`RepositoryStore`].
pub struct DuplicateEngine;

impl DuplicateEngine {
    /// Link two elements as peer duplicates.
    ///
    /// Idempotent per unordered pair: re-linking updates the existing
    /// relationship's properties instead of creating a second link. With
    /// `set_known_duplicate`, both ends gain the `KnownDuplicate`
    /// classification if absent; an already-attached classification is
    /// left untouched.
    ///
    /// Returns the guid of the link relationship.
    pub fn link_peer_duplicates(
        store: &mut impl RepositoryStore,
        element1: &Guid,
        element2: &Guid,
        properties: &DuplicateProperties,
        set_known_duplicate: bool,
    ) -> Result<Guid, StratumError> {
        if element1 == element2 {
            return Err(StratumError::InvalidParameter(
                "an element cannot be its own peer duplicate".to_string(),
            ));
        }
        for end in [element1, element2] {
            if store.element(end)?.is_none() {
                return Err(StratumError::ElementNotFound(end.clone()));
            }
        }

        // Unordered pair: normalize end order so both orderings address
        // the same relationship.
        let (low, high) = if element1 <= element2 {
            (element1, element2)
        } else {
            (element2, element1)
        };
        let link_guid = Guid::derived(PEER_DUPLICATE_LINK, low, high);

        if store.relationship(&link_guid)?.is_some() {
            store.update_relationship_properties(&link_guid, properties.to_properties(), true)?;
        } else {
            store.create_relationship(Relationship::new(
                link_guid.clone(),
                PEER_DUPLICATE_LINK,
                low.clone(),
                high.clone(),
                properties.to_properties(),
            ))?;
        }

        if set_known_duplicate {
            for end in [element1, element2] {
                Self::stamp_classification(store, end, KNOWN_DUPLICATE_CLASSIFICATION, properties)?;
            }
        }
        Ok(link_guid)
    }

    /// Link each source duplicate to the consolidated survivor.
    ///
    /// The caller has already judged the set duplicates; membership is
    /// not re-validated here. The survivor gains the
    /// `ConsolidatedDuplicate` classification if absent. Re-consolidating
    /// a source updates the existing link. Returns the link guids in
    /// source order.
    pub fn link_consolidated_duplicate(
        store: &mut impl RepositoryStore,
        survivor: &Guid,
        sources: &[Guid],
        properties: &DuplicateProperties,
    ) -> Result<Vec<Guid>, StratumError> {
        if sources.is_empty() {
            return Err(StratumError::InvalidParameter(
                "consolidation requires at least one source element".to_string(),
            ));
        }
        if sources.contains(survivor) {
            return Err(StratumError::InvalidParameter(
                "survivor cannot be one of its own sources".to_string(),
            ));
        }
        if store.element(survivor)?.is_none() {
            return Err(StratumError::ElementNotFound(survivor.clone()));
        }
        for source in sources {
            if store.element(source)?.is_none() {
                return Err(StratumError::ElementNotFound(source.clone()));
            }
        }

        let mut links = Vec::with_capacity(sources.len());
        for source in sources {
            let link_guid = Guid::derived(CONSOLIDATED_DUPLICATE_LINK, source, survivor);
            if store.relationship(&link_guid)?.is_some() {
                store.update_relationship_properties(
                    &link_guid,
                    properties.to_properties(),
                    true,
                )?;
            } else {
                store.create_relationship(Relationship::new(
                    link_guid.clone(),
                    CONSOLIDATED_DUPLICATE_LINK,
                    source.clone(),
                    survivor.clone(),
                    properties.to_properties(),
                ))?;
            }
            links.push(link_guid);
        }
        Self::stamp_classification(
            store,
            survivor,
            CONSOLIDATED_DUPLICATE_CLASSIFICATION,
            properties,
        )?;
        Ok(links)
    }

    fn stamp_classification(
        store: &mut impl RepositoryStore,
        guid: &Guid,
        name: &str,
        properties: &DuplicateProperties,
    ) -> Result<(), StratumError> {
        let element = store
            .element(guid)?
            .ok_or_else(|| StratumError::ElementNotFound(guid.clone()))?;
        if element.is_classified(name, None) {
            return Ok(());
        }
        store.attach_classification(guid, Classification::new(name, properties.to_properties()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
