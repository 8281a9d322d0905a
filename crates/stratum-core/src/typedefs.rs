//! # Type Registry
//!
//! Known element, classification, and relationship type definitions.
//!
//! A type definition fixes which property names a record may carry, and
//! for relationships which element types may occupy each end. The
//! registry answers:
//! - `InvalidParameter` checks before any mutation (unknown type, property
//!   name outside the definition)
//! - `InvalidFilterType` checks when a watchdog subscription lists type
//!   names of interest
//!
//! The builtin registry covers the well-known types the engine itself
//! creates; deployments register further types at startup.

use crate::primitives::{
    ANCHORS_CLASSIFICATION, CONSOLIDATED_DUPLICATE_CLASSIFICATION, CONSOLIDATED_DUPLICATE_LINK,
    KNOWN_DUPLICATE_CLASSIFICATION, MAX_PROPERTY_NAME_LENGTH, MAX_PROPERTY_VALUE_LENGTH,
    MAX_TYPE_NAME_LENGTH, PEER_DUPLICATE_LINK, PROP_ANCHOR_GUID, PROP_ANCHOR_SCOPE_GUID,
    PROP_NOTES, PROP_SOURCE, PROP_STATUS_IDENTIFIER, PROP_STEWARD,
};
use crate::types::{ElementProperties, PropertyValue, StratumError};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// TYPE DEFINITIONS
// =============================================================================

/// Which property names a record of some type may carry.
///
/// `Open` places no constraint beyond the innate length limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertySchema {
    /// Any property name is allowed.
    Open,
    /// Only the listed property names are allowed.
    Closed(BTreeSet<String>),
}

impl PropertySchema {
    /// Build a closed schema from a name list.
    #[must_use]
    pub fn closed(names: &[&str]) -> Self {
        Self::Closed(names.iter().map(|s| (*s).to_string()).collect())
    }

    fn allows(&self, name: &str) -> bool {
        match self {
            Self::Open => true,
            Self::Closed(names) => names.contains(name),
        }
    }
}

/// Definition of an element type.
#[derive(Debug, Clone)]
pub struct ElementTypeDef {
    pub name: String,
    pub properties: PropertySchema,
}

/// Definition of a classification type.
#[derive(Debug, Clone)]
pub struct ClassificationTypeDef {
    pub name: String,
    pub properties: PropertySchema,
}

/// Definition of a relationship type.
///
/// `None` end constraints accept any element type on that end.
#[derive(Debug, Clone)]
pub struct RelationshipTypeDef {
    pub name: String,
    pub end1_types: Option<BTreeSet<String>>,
    pub end2_types: Option<BTreeSet<String>>,
    pub properties: PropertySchema,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Registry of known type definitions.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    elements: BTreeMap<String, ElementTypeDef>,
    classifications: BTreeMap<String, ClassificationTypeDef>,
    relationships: BTreeMap<String, RelationshipTypeDef>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the builtin registry with the types the engine itself uses.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register_element_type(ElementTypeDef {
            name: "Referenceable".to_string(),
            properties: PropertySchema::Open,
        });
        registry.register_element_type(ElementTypeDef {
            name: "Asset".to_string(),
            properties: PropertySchema::closed(&[
                "qualifiedName",
                "displayName",
                "description",
                "owner",
            ]),
        });
        registry.register_element_type(ElementTypeDef {
            name: "Collection".to_string(),
            properties: PropertySchema::closed(&["qualifiedName", "displayName", "description"]),
        });
        registry.register_element_type(ElementTypeDef {
            name: "GlossaryTerm".to_string(),
            properties: PropertySchema::closed(&[
                "qualifiedName",
                "displayName",
                "summary",
                "description",
            ]),
        });

        registry.register_classification_type(ClassificationTypeDef {
            name: ANCHORS_CLASSIFICATION.to_string(),
            properties: PropertySchema::closed(&[PROP_ANCHOR_GUID, PROP_ANCHOR_SCOPE_GUID]),
        });
        registry.register_classification_type(ClassificationTypeDef {
            name: KNOWN_DUPLICATE_CLASSIFICATION.to_string(),
            properties: PropertySchema::closed(&[
                PROP_STATUS_IDENTIFIER,
                PROP_STEWARD,
                PROP_SOURCE,
                PROP_NOTES,
            ]),
        });
        registry.register_classification_type(ClassificationTypeDef {
            name: "Confidentiality".to_string(),
            properties: PropertySchema::closed(&["level", PROP_STEWARD, PROP_SOURCE]),
        });

        let duplicate_properties = PropertySchema::closed(&[
            PROP_STATUS_IDENTIFIER,
            PROP_STEWARD,
            PROP_SOURCE,
            PROP_NOTES,
        ]);
        registry.register_classification_type(ClassificationTypeDef {
            name: CONSOLIDATED_DUPLICATE_CLASSIFICATION.to_string(),
            properties: duplicate_properties.clone(),
        });
        registry.register_relationship_type(RelationshipTypeDef {
            name: PEER_DUPLICATE_LINK.to_string(),
            end1_types: None,
            end2_types: None,
            properties: duplicate_properties.clone(),
        });
        registry.register_relationship_type(RelationshipTypeDef {
            name: CONSOLIDATED_DUPLICATE_LINK.to_string(),
            end1_types: None,
            end2_types: None,
            properties: duplicate_properties,
        });
        registry.register_relationship_type(RelationshipTypeDef {
            name: "CollectionMembership".to_string(),
            end1_types: Some(std::iter::once("Collection".to_string()).collect()),
            end2_types: None,
            properties: PropertySchema::Open,
        });
        registry.register_relationship_type(RelationshipTypeDef {
            name: "SemanticAssignment".to_string(),
            end1_types: None,
            end2_types: Some(std::iter::once("GlossaryTerm".to_string()).collect()),
            properties: PropertySchema::Open,
        });

        registry
    }

    /// Register (or replace) an element type definition.
    pub fn register_element_type(&mut self, def: ElementTypeDef) {
        self.elements.insert(def.name.clone(), def);
    }

    /// Register (or replace) a classification type definition.
    pub fn register_classification_type(&mut self, def: ClassificationTypeDef) {
        self.classifications.insert(def.name.clone(), def);
    }

    /// Register (or replace) a relationship type definition.
    pub fn register_relationship_type(&mut self, def: RelationshipTypeDef) {
        self.relationships.insert(def.name.clone(), def);
    }

    /// Is this name a recognized element, classification, or relationship
    /// type? Used by the watchdog filter.
    #[must_use]
    pub fn is_known_type_name(&self, name: &str) -> bool {
        self.elements.contains_key(name)
            || self.classifications.contains_key(name)
            || self.relationships.contains_key(name)
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Validate an element's type name and property set before mutation.
    pub fn validate_element(
        &self,
        type_name: &str,
        properties: &ElementProperties,
    ) -> Result<(), StratumError> {
        validate_type_name(type_name)?;
        let def = self.elements.get(type_name).ok_or_else(|| {
            StratumError::InvalidParameter(format!("unknown element type '{type_name}'"))
        })?;
        validate_properties(type_name, &def.properties, properties)
    }

    /// Validate a classification name and property set before attach.
    pub fn validate_classification(
        &self,
        name: &str,
        properties: &ElementProperties,
    ) -> Result<(), StratumError> {
        validate_type_name(name)?;
        let def = self.classifications.get(name).ok_or_else(|| {
            StratumError::InvalidParameter(format!("unknown classification '{name}'"))
        })?;
        validate_properties(name, &def.properties, properties)
    }

    /// Validate a relationship's type name, end element types, and
    /// property set before create.
    pub fn validate_relationship(
        &self,
        type_name: &str,
        end1_type: &str,
        end2_type: &str,
        properties: &ElementProperties,
    ) -> Result<(), StratumError> {
        validate_type_name(type_name)?;
        let def = self.relationships.get(type_name).ok_or_else(|| {
            StratumError::InvalidParameter(format!("unknown relationship type '{type_name}'"))
        })?;

        if let Some(allowed) = &def.end1_types
            && !allowed.contains(end1_type)
        {
            return Err(StratumError::InvalidParameter(format!(
                "element type '{end1_type}' cannot occupy end 1 of '{type_name}'"
            )));
        }
        if let Some(allowed) = &def.end2_types
            && !allowed.contains(end2_type)
        {
            return Err(StratumError::InvalidParameter(format!(
                "element type '{end2_type}' cannot occupy end 2 of '{type_name}'"
            )));
        }

        validate_properties(type_name, &def.properties, properties)
    }
}

// =============================================================================
// VALIDATION HELPERS
// =============================================================================

fn validate_type_name(name: &str) -> Result<(), StratumError> {
    if name.is_empty() {
        return Err(StratumError::InvalidParameter(
            "type name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_TYPE_NAME_LENGTH {
        return Err(StratumError::InvalidParameter(format!(
            "type name exceeds {MAX_TYPE_NAME_LENGTH} bytes"
        )));
    }
    Ok(())
}

fn validate_properties(
    type_name: &str,
    schema: &PropertySchema,
    properties: &ElementProperties,
) -> Result<(), StratumError> {
    for (name, value) in properties {
        if name.is_empty() || name.len() > MAX_PROPERTY_NAME_LENGTH {
            return Err(StratumError::InvalidParameter(format!(
                "invalid property name length for '{name}'"
            )));
        }
        if let PropertyValue::Text(text) = value
            && text.len() > MAX_PROPERTY_VALUE_LENGTH
        {
            return Err(StratumError::InvalidParameter(format!(
                "property '{name}' exceeds {MAX_PROPERTY_VALUE_LENGTH} bytes"
            )));
        }
        if !schema.allows(name) {
            return Err(StratumError::InvalidParameter(format!(
                "property '{name}' is not defined for type '{type_name}'"
            )));
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
