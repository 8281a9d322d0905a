//! # Core Type Definitions
//!
//! This module contains all core types for the Stratum metadata engine:
//! - Identifiers and instants (`Guid`, `Timestamp`)
//! - The versioned record model (`MetadataElement`, `Classification`,
//!   `Relationship`)
//! - Typed property values (`PropertyValue`, `ElementProperties`)
//! - Error types (`StratumError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Carry no ambient clock; every instant is caller-supplied

use crate::effectivity::EffectivityWindow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS & INSTANTS
// =============================================================================

/// Opaque unique identifier for a metadata element, relationship, or scope.
///
/// Guids are caller-supplied or deterministically derived; the CORE never
/// generates random identifiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Guid(pub String);

impl Guid {
    /// Create a new guid from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Derive a deterministic guid from a label and two ordered parts.
    ///
    /// Used for relationships the CORE creates itself (duplicate links),
    /// so repeated calls with the same inputs address the same record.
    #[must_use]
    pub fn derived(label: &str, a: &Guid, b: &Guid) -> Self {
        Self(format!("{label}:{}:{}", a.0, b.0))
    }

    /// Get the guid as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An instant in time, as integer milliseconds since the Unix epoch.
///
/// Uses i64 to stay within integer arithmetic; the CORE never reads a
/// clock, so every Timestamp enters through an operation argument.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Create a new timestamp with the given epoch-millisecond value.
    #[must_use]
    pub const fn new(millis: i64) -> Self {
        Self(millis)
    }

    /// Get the raw epoch-millisecond value.
    #[must_use]
    pub const fn millis(self) -> i64 {
        self.0
    }
}

// =============================================================================
// PROPERTY VALUES
// =============================================================================

/// A typed property value.
///
/// Integer-only numerics keep the CORE deterministic; no floats.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyValue {
    /// UTF-8 text.
    Text(String),
    /// Signed 64-bit integer.
    Integer(i64),
    /// Boolean flag.
    Boolean(bool),
    /// Reference to another element by guid.
    GuidRef(Guid),
}

impl PropertyValue {
    /// View a text value as a string slice, if this is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// View a guid reference, if this is one.
    #[must_use]
    pub fn as_guid(&self) -> Option<&Guid> {
        match self {
            Self::GuidRef(g) => Some(g),
            _ => None,
        }
    }
}

/// Named property set. BTreeMap for deterministic iteration order.
pub type ElementProperties = BTreeMap<String, PropertyValue>;

// =============================================================================
// LIFECYCLE STATUS & ORIGIN
// =============================================================================

/// Enumerated lifecycle state of a metadata element.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum ElementStatus {
    /// Incomplete; not yet visible to consumers by default.
    Draft,
    /// Proposed for activation, awaiting approval.
    Proposed,
    /// Live and visible.
    #[default]
    Active,
    /// Superseded; retained for reference.
    Deprecated,
    /// Soft-deleted; awaiting purge by the backend.
    Deleted,
}

/// Where the authoritative copy of an element lives.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum OriginCategory {
    /// Mastered by this repository.
    #[default]
    LocalCohort,
    /// Mastered by an external system and mirrored here.
    ExternalSource,
    /// Loaded from a content pack archive.
    ContentPack,
}

/// Origin of an element: category plus the home collection, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ElementOrigin {
    pub category: OriginCategory,
    pub home_collection_id: Option<Guid>,
    pub home_collection_name: Option<String>,
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// A named, typed property bag attached to exactly one element.
///
/// At most one classification of a given name may be attached to an
/// element with an overlapping effectivity window; the repository store
/// enforces this on attach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// The classification name (also its type name).
    pub name: String,
    /// Properties allowed by the classification's type definition.
    pub properties: ElementProperties,
    /// Independent visibility window.
    pub effectivity: EffectivityWindow,
}

impl Classification {
    /// Create a classification with unbounded effectivity.
    #[must_use]
    pub fn new(name: impl Into<String>, properties: ElementProperties) -> Self {
        Self {
            name: name.into(),
            properties,
            effectivity: EffectivityWindow::unbounded(),
        }
    }

    /// Create a classification with an explicit effectivity window.
    #[must_use]
    pub fn with_effectivity(
        name: impl Into<String>,
        properties: ElementProperties,
        effectivity: EffectivityWindow,
    ) -> Self {
        Self {
            name: name.into(),
            properties,
            effectivity,
        }
    }
}

// =============================================================================
// METADATA ELEMENT
// =============================================================================

/// A versioned, typed metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataElement {
    /// Opaque unique identifier.
    pub guid: Guid,
    /// Type name; fixes which property names are allowed.
    pub type_name: String,
    /// Lifecycle state.
    pub status: ElementStatus,
    /// Visibility window.
    pub effectivity: EffectivityWindow,
    /// Named property set constrained by `type_name`.
    pub properties: ElementProperties,
    /// Where the authoritative copy lives.
    pub origin: ElementOrigin,
    /// Attached classifications, kept sorted by name.
    pub classifications: Vec<Classification>,
}

impl MetadataElement {
    /// Create a new active element with unbounded effectivity and no
    /// classifications.
    #[must_use]
    pub fn new(guid: Guid, type_name: impl Into<String>, properties: ElementProperties) -> Self {
        Self {
            guid,
            type_name: type_name.into(),
            status: ElementStatus::Active,
            effectivity: EffectivityWindow::unbounded(),
            properties,
            origin: ElementOrigin::default(),
            classifications: Vec::new(),
        }
    }

    /// Find an attached classification by name.
    ///
    /// Windows for the same name never overlap, so when `at` is given the
    /// match is unique; without an instant the first attached wins.
    #[must_use]
    pub fn classification(&self, name: &str, at: Option<Timestamp>) -> Option<&Classification> {
        self.classifications
            .iter()
            .find(|c| c.name == name && c.effectivity.is_effective(at))
    }

    /// Check whether the element carries a classification of the given
    /// name effective at the given instant.
    #[must_use]
    pub fn is_classified(&self, name: &str, at: Option<Timestamp>) -> bool {
        self.classification(name, at).is_some()
    }
}

// =============================================================================
// RELATIONSHIP
// =============================================================================

/// A directed, typed link between two element guids.
///
/// The relationship type name constrains which element types may occupy
/// each end; the type registry validates this on create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Opaque unique identifier of the relationship itself.
    pub guid: Guid,
    /// Relationship type name.
    pub type_name: String,
    /// Guid of the element at end 1.
    pub end1: Guid,
    /// Guid of the element at end 2.
    pub end2: Guid,
    /// Relationship properties.
    pub properties: ElementProperties,
    /// Visibility window.
    pub effectivity: EffectivityWindow,
}

impl Relationship {
    /// Create a relationship with unbounded effectivity.
    #[must_use]
    pub fn new(
        guid: Guid,
        type_name: impl Into<String>,
        end1: Guid,
        end2: Guid,
        properties: ElementProperties,
    ) -> Self {
        Self {
            guid,
            type_name: type_name.into(),
            end1,
            end2,
            properties,
            effectivity: EffectivityWindow::unbounded(),
        }
    }

    /// Check whether the relationship touches the given element.
    #[must_use]
    pub fn involves(&self, guid: &Guid) -> bool {
        &self.end1 == guid || &self.end2 == guid
    }

    /// Given one end's guid, return the other end, if this relationship
    /// involves the given element at all.
    #[must_use]
    pub fn other_end(&self, guid: &Guid) -> Option<&Guid> {
        if &self.end1 == guid {
            Some(&self.end2)
        } else if &self.end2 == guid {
            Some(&self.end1)
        } else {
            None
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors reported by the Stratum engine.
///
/// - No silent failures
/// - Every error is reported synchronously to the immediate caller
/// - The CORE performs no automatic retries; retry policy belongs to the
///   caller
#[derive(Debug, Error)]
pub enum StratumError {
    /// Malformed, missing, or unknown identifier, type name, or property.
    /// Always detected before any mutation; never partially applied.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Caller lacks rights for the requested operation. Surfaced from the
    /// backend as-is, never retried.
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Backend unreachable or internal backend error.
    #[error("Property server failure: {0}")]
    PropertyServerFailure(String),

    /// The requested element was not found.
    #[error("Element not found: {0}")]
    ElementNotFound(Guid),

    /// The requested relationship was not found.
    #[error("Relationship not found: {0}")]
    RelationshipNotFound(Guid),

    /// Non-cascading delete attempted on an anchor with live dependents.
    /// Recoverable: re-issue with cascade enabled.
    #[error("Element {anchor} has {dependents} dependent element(s); delete with cascade enabled")]
    DependentElementsExist { anchor: Guid, dependents: usize },

    /// Correlation already present for (scope, element, identifier) with an
    /// overlapping effectivity window.
    #[error("Duplicate correlation for external identifier '{external_identifier}'")]
    DuplicateCorrelation { external_identifier: String },

    /// Correlation record absent for (scope, element, identifier).
    #[error("No correlation for external identifier '{external_identifier}'")]
    CorrelationNotFound { external_identifier: String },

    /// Watchdog registration referenced an unrecognized type name.
    #[error("Unrecognized type name in watchdog filter: {0}")]
    InvalidFilterType(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred in the storage layer.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_guid_is_deterministic() {
        let a = Guid::new("a");
        let b = Guid::new("b");
        assert_eq!(Guid::derived("link", &a, &b), Guid::derived("link", &a, &b));
        assert_ne!(Guid::derived("link", &a, &b), Guid::derived("link", &b, &a));
    }

    #[test]
    fn element_classification_lookup() {
        let mut element = MetadataElement::new(Guid::new("e1"), "Asset", ElementProperties::new());
        element
            .classifications
            .push(Classification::new("KnownDuplicate", ElementProperties::new()));

        assert!(element.is_classified("KnownDuplicate", None));
        assert!(!element.is_classified("Anchors", None));
    }

    #[test]
    fn relationship_other_end() {
        let rel = Relationship::new(
            Guid::new("r1"),
            "PeerDuplicateLink",
            Guid::new("a"),
            Guid::new("b"),
            ElementProperties::new(),
        );

        assert_eq!(rel.other_end(&Guid::new("a")), Some(&Guid::new("b")));
        assert_eq!(rel.other_end(&Guid::new("b")), Some(&Guid::new("a")));
        assert_eq!(rel.other_end(&Guid::new("c")), None);
    }

    #[test]
    fn property_value_accessors() {
        assert_eq!(PropertyValue::Text("x".into()).as_text(), Some("x"));
        assert_eq!(PropertyValue::Integer(1).as_text(), None);
        assert_eq!(
            PropertyValue::GuidRef(Guid::new("g")).as_guid(),
            Some(&Guid::new("g"))
        );
    }
}
