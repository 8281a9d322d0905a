//! # Innate Primitives
//!
//! Hardcoded runtime constants for the Stratum CORE.
//!
//! Stratum starts with zero data but fixed rules. These primitives are
//! compiled into the binary and are immutable at runtime.

// =============================================================================
// WELL-KNOWN TYPE AND CLASSIFICATION NAMES
// =============================================================================

/// Classification that records which element anchors a subordinate element.
///
/// An element carrying this classification is deleted when its anchor is
/// deleted with cascade enabled.
pub const ANCHORS_CLASSIFICATION: &str = "Anchors";

/// Property inside the `Anchors` classification naming the anchor element.
pub const PROP_ANCHOR_GUID: &str = "anchorGuid";

/// Property inside the `Anchors` classification naming the broader scope.
pub const PROP_ANCHOR_SCOPE_GUID: &str = "anchorScopeGuid";

/// Classification marking an element as a known duplicate of a peer.
pub const KNOWN_DUPLICATE_CLASSIFICATION: &str = "KnownDuplicate";

/// Relationship type linking two peer duplicate elements.
pub const PEER_DUPLICATE_LINK: &str = "PeerDuplicateLink";

/// Relationship type linking a source duplicate to its consolidated survivor.
pub const CONSOLIDATED_DUPLICATE_LINK: &str = "ConsolidatedDuplicateLink";

/// Classification marking the surviving element of a consolidation.
pub const CONSOLIDATED_DUPLICATE_CLASSIFICATION: &str = "ConsolidatedDuplicate";

/// Properties carried by duplicate link relationships.
pub const PROP_STATUS_IDENTIFIER: &str = "statusIdentifier";
pub const PROP_STEWARD: &str = "steward";
pub const PROP_SOURCE: &str = "source";
pub const PROP_NOTES: &str = "notes";

// =============================================================================
// QUERY BOUNDS
// =============================================================================

/// Default page size for paged searches when the caller supplies zero.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Maximum page size for paged searches.
///
/// All queries must be computationally bounded. Callers re-issue
/// bounded-size requests to continue; there is no streaming.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Maximum depth of the anchored-to transitive closure.
///
/// Bounds cascade-delete computation in pathological anchor chains.
pub const MAX_CASCADE_DEPTH: usize = 100;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for property names.
///
/// Names longer than this are rejected before any mutation.
pub const MAX_PROPERTY_NAME_LENGTH: usize = 256;

/// Maximum length for text property values (64KB).
///
/// This prevents memory exhaustion from malformed input.
pub const MAX_PROPERTY_VALUE_LENGTH: usize = 65536;

/// Maximum length for type names and classification names.
pub const MAX_TYPE_NAME_LENGTH: usize = 256;

/// Maximum length for external identifiers in correlation records.
pub const MAX_EXTERNAL_IDENTIFIER_LENGTH: usize = 4096;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_are_consistent() {
        assert!(DEFAULT_PAGE_SIZE <= MAX_PAGE_SIZE);
    }

    #[test]
    fn anchors_classification_name() {
        assert_eq!(ANCHORS_CLASSIFICATION, "Anchors");
    }
}
