//! # Anchoring Resolver
//!
//! Ownership scoping and cascade delete.
//!
//! An element is its own anchor, anchored to another element, or
//! unanchored. Anchoring is recorded as the `Anchors` classification on
//! the subordinate element; the anchor element itself carries no record
//! of its dependents, so dependents are found by the store's anchored-to
//! index query.
//!
//! Deleting an anchor owns the delete scope of everything transitively
//! anchored to it. Deleting a non-anchor element never cascades.

use crate::primitives::{
    ANCHORS_CLASSIFICATION, MAX_CASCADE_DEPTH, PROP_ANCHOR_GUID, PROP_ANCHOR_SCOPE_GUID,
};
use crate::repository::RepositoryStore;
use crate::types::{
    Classification, ElementProperties, Guid, MetadataElement, PropertyValue, StratumError,
};
use std::collections::BTreeSet;

// =============================================================================
// ANCHOR RESOLUTION
// =============================================================================

/// The resolved anchoring of an element: the anchor guid and the broader
/// scope guid, either of which may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnchorResolution {
    pub anchor_guid: Option<Guid>,
    pub anchor_scope_guid: Option<Guid>,
}

/// Anchoring and cascade-delete operations, stateless over any
/// [`RepositoryStore`].
pub struct AnchorResolver;

impl AnchorResolver {
    /// Resolve the anchoring of a new element from the caller's request.
    ///
    /// Precedence: own-anchor beats an explicit anchor beats an `Anchors`
    /// classification supplied in the initial classification list.
    /// Contradictory simultaneous sources are rejected before any
    /// mutation. When the request names an anchor without a scope, the
    /// scope is inherited from the anchor's own anchoring.
    pub fn resolve_anchor(
        store: &impl RepositoryStore,
        element_guid: &Guid,
        is_own_anchor: bool,
        explicit_anchor: Option<&Guid>,
        explicit_scope: Option<&Guid>,
        classifications: &[Classification],
    ) -> Result<AnchorResolution, StratumError> {
        let classified_anchor = classifications
            .iter()
            .find(|c| c.name == ANCHORS_CLASSIFICATION)
            .and_then(|c| c.properties.get(PROP_ANCHOR_GUID))
            .and_then(PropertyValue::as_guid);

        if is_own_anchor {
            if explicit_anchor.is_some_and(|a| a != element_guid) {
                return Err(StratumError::InvalidParameter(
                    "element cannot be its own anchor and anchored elsewhere".to_string(),
                ));
            }
            if classified_anchor.is_some_and(|a| a != element_guid) {
                return Err(StratumError::InvalidParameter(
                    "own-anchor request contradicts supplied anchoring classification".to_string(),
                ));
            }
            return Ok(AnchorResolution {
                anchor_guid: Some(element_guid.clone()),
                anchor_scope_guid: explicit_scope.cloned(),
            });
        }

        let anchor = match (explicit_anchor, classified_anchor) {
            (Some(explicit), Some(classified)) if explicit != classified => {
                return Err(StratumError::InvalidParameter(format!(
                    "explicit anchor '{explicit}' contradicts classified anchor '{classified}'"
                )));
            }
            (Some(explicit), _) => Some(explicit.clone()),
            (None, classified) => classified.cloned(),
        };

        let Some(anchor) = anchor else {
            return Ok(AnchorResolution::default());
        };
        if &anchor == element_guid {
            return Err(StratumError::InvalidParameter(
                "anchored element must name a distinct anchor or be its own anchor".to_string(),
            ));
        }
        let anchor_element = store
            .element(&anchor)?
            .ok_or_else(|| StratumError::ElementNotFound(anchor.clone()))?;

        let scope = match explicit_scope {
            Some(scope) => Some(scope.clone()),
            None => inherited_scope(&anchor_element),
        };

        Ok(AnchorResolution {
            anchor_guid: Some(anchor),
            anchor_scope_guid: scope,
        })
    }

    /// Build the `Anchors` classification carrying a resolution.
    ///
    /// Returns `None` for an unanchored resolution.
    #[must_use]
    pub fn anchors_classification(resolution: &AnchorResolution) -> Option<Classification> {
        let anchor = resolution.anchor_guid.as_ref()?;
        let mut properties = ElementProperties::new();
        properties.insert(
            PROP_ANCHOR_GUID.to_string(),
            PropertyValue::GuidRef(anchor.clone()),
        );
        if let Some(scope) = &resolution.anchor_scope_guid {
            properties.insert(
                PROP_ANCHOR_SCOPE_GUID.to_string(),
                PropertyValue::GuidRef(scope.clone()),
            );
        }
        Some(Classification::new(ANCHORS_CLASSIFICATION, properties))
    }

    // =========================================================================
    // CASCADE DELETE
    // =========================================================================

    /// The bounded transitive closure of elements anchored to `anchor`,
    /// excluding the anchor itself, in discovery order (breadth-first,
    /// guid order within a level).
    ///
    /// Depth is capped at `MAX_CASCADE_DEPTH`; a deeper chain is a
    /// malformed anchor graph and is rejected rather than walked forever.
    pub fn cascade_targets(
        store: &impl RepositoryStore,
        anchor: &Guid,
    ) -> Result<Vec<Guid>, StratumError> {
        let mut seen: BTreeSet<Guid> = BTreeSet::new();
        seen.insert(anchor.clone());
        let mut ordered = Vec::new();
        let mut frontier = vec![anchor.clone()];

        for _ in 0..MAX_CASCADE_DEPTH {
            if frontier.is_empty() {
                return Ok(ordered);
            }
            let mut next = Vec::new();
            for current in frontier {
                for dependent in store.anchored_to(&current)? {
                    if seen.insert(dependent.clone()) {
                        ordered.push(dependent.clone());
                        next.push(dependent);
                    }
                }
            }
            frontier = next;
        }
        if frontier.is_empty() {
            Ok(ordered)
        } else {
            Err(StratumError::InvalidParameter(format!(
                "anchor chain below '{anchor}' exceeds depth {MAX_CASCADE_DEPTH}"
            )))
        }
    }

    /// Delete an element, honoring the cascade policy.
    ///
    /// With `cascaded_delete`, the element and its full anchored closure
    /// are removed, dependents first. Without it, an anchor with live
    /// dependents fails with `DependentElementsExist` and nothing is
    /// mutated. A non-anchor element deletes without cascading either
    /// way; relationships referencing any removed element go with it.
    ///
    /// Returns the removed guids in removal order.
    pub fn delete_element(
        store: &mut impl RepositoryStore,
        guid: &Guid,
        cascaded_delete: bool,
    ) -> Result<Vec<Guid>, StratumError> {
        if store.element(guid)?.is_none() {
            return Err(StratumError::ElementNotFound(guid.clone()));
        }

        let targets = Self::cascade_targets(store, guid)?;
        if !targets.is_empty() && !cascaded_delete {
            return Err(StratumError::DependentElementsExist {
                anchor: guid.clone(),
                dependents: targets.len(),
            });
        }

        let mut removed: Vec<Guid> = targets.into_iter().rev().collect();
        removed.push(guid.clone());
        for target in &removed {
            store.remove_element(target)?;
        }
        Ok(removed)
    }
}

/// The scope a subordinate inherits: the anchor's own scope, if any.
fn inherited_scope(anchor: &MetadataElement) -> Option<Guid> {
    let classification = anchor.classification(ANCHORS_CLASSIFICATION, None)?;
    classification
        .properties
        .get(PROP_ANCHOR_SCOPE_GUID)
        .and_then(PropertyValue::as_guid)
        .cloned()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use crate::types::{ElementProperties, MetadataElement, Relationship};

    fn element(guid: &str) -> MetadataElement {
        MetadataElement::new(Guid::new(guid), "Referenceable", ElementProperties::new())
    }

    fn anchored_element(guid: &str, anchor: &str, scope: Option<&str>) -> MetadataElement {
        let mut e = element(guid);
        let resolution = AnchorResolution {
            anchor_guid: Some(Guid::new(anchor)),
            anchor_scope_guid: scope.map(Guid::new),
        };
        if let Some(c) = AnchorResolver::anchors_classification(&resolution) {
            e.classifications.push(c);
        }
        e
    }

    #[test]
    fn own_anchor_wins() {
        let store = MemoryRepository::new();
        let guid = Guid::new("e1");
        let resolution =
            AnchorResolver::resolve_anchor(&store, &guid, true, None, None, &[]).expect("resolve");
        assert_eq!(resolution.anchor_guid, Some(guid));
    }

    #[test]
    fn contradictory_sources_rejected() {
        let mut store = MemoryRepository::new();
        store.create_element(element("a1")).expect("create");
        store.create_element(element("a2")).expect("create");

        let classification = AnchorResolver::anchors_classification(&AnchorResolution {
            anchor_guid: Some(Guid::new("a2")),
            anchor_scope_guid: None,
        })
        .expect("classification");

        let result = AnchorResolver::resolve_anchor(
            &store,
            &Guid::new("e1"),
            false,
            Some(&Guid::new("a1")),
            None,
            std::slice::from_ref(&classification),
        );
        assert!(matches!(result, Err(StratumError::InvalidParameter(_))));

        // Own-anchor against a different classified anchor also contradicts.
        let result = AnchorResolver::resolve_anchor(
            &store,
            &Guid::new("e1"),
            true,
            None,
            None,
            std::slice::from_ref(&classification),
        );
        assert!(matches!(result, Err(StratumError::InvalidParameter(_))));
    }

    #[test]
    fn scope_inherited_from_anchor() {
        let mut store = MemoryRepository::new();
        store
            .create_element(anchored_element("anchor", "grand", Some("scope-x")))
            .expect("create grand");
        store.create_element(element("grand")).expect("create");

        let resolution = AnchorResolver::resolve_anchor(
            &store,
            &Guid::new("child"),
            false,
            Some(&Guid::new("anchor")),
            None,
            &[],
        )
        .expect("resolve");
        assert_eq!(resolution.anchor_guid, Some(Guid::new("anchor")));
        assert_eq!(resolution.anchor_scope_guid, Some(Guid::new("scope-x")));
    }

    #[test]
    fn missing_anchor_rejected() {
        let store = MemoryRepository::new();
        let result = AnchorResolver::resolve_anchor(
            &store,
            &Guid::new("child"),
            false,
            Some(&Guid::new("ghost")),
            None,
            &[],
        );
        assert!(matches!(result, Err(StratumError::ElementNotFound(_))));
    }

    #[test]
    fn cascade_targets_walks_transitively() {
        let mut store = MemoryRepository::new();
        store.create_element(element("root")).expect("create");
        store
            .create_element(anchored_element("mid", "root", None))
            .expect("create");
        store
            .create_element(anchored_element("leaf", "mid", None))
            .expect("create");
        store
            .create_element(anchored_element("other", "elsewhere", None))
            .expect("create");

        let targets =
            AnchorResolver::cascade_targets(&store, &Guid::new("root")).expect("targets");
        assert_eq!(targets, vec![Guid::new("mid"), Guid::new("leaf")]);
    }

    #[test]
    fn non_cascade_delete_with_dependents_rejects_and_mutates_nothing() {
        let mut store = MemoryRepository::new();
        store.create_element(element("root")).expect("create");
        store
            .create_element(anchored_element("child", "root", None))
            .expect("create");

        let result = AnchorResolver::delete_element(&mut store, &Guid::new("root"), false);
        assert!(matches!(
            result,
            Err(StratumError::DependentElementsExist { dependents: 1, .. })
        ));
        assert_eq!(store.element_count().expect("count"), 2);
    }

    #[test]
    fn cascade_delete_removes_exactly_the_closure() {
        let mut store = MemoryRepository::new();
        store.create_element(element("root")).expect("create");
        store
            .create_element(anchored_element("mid", "root", None))
            .expect("create");
        store
            .create_element(anchored_element("leaf", "mid", None))
            .expect("create");
        store.create_element(element("bystander")).expect("create");
        store
            .create_relationship(Relationship::new(
                Guid::new("r1"),
                "SemanticAssignment",
                Guid::new("bystander"),
                Guid::new("leaf"),
                ElementProperties::new(),
            ))
            .expect("relate");

        let removed =
            AnchorResolver::delete_element(&mut store, &Guid::new("root"), true).expect("delete");
        assert_eq!(removed.len(), 3);
        assert_eq!(*removed.last().expect("non-empty"), Guid::new("root"));

        assert!(store.element(&Guid::new("bystander")).expect("read").is_some());
        assert!(store.element(&Guid::new("leaf")).expect("read").is_none());
        assert_eq!(store.relationship_count().expect("count"), 0);
    }

    #[test]
    fn non_anchor_delete_never_cascades() {
        let mut store = MemoryRepository::new();
        store.create_element(element("a")).expect("create");
        store.create_element(element("b")).expect("create");
        store
            .create_relationship(Relationship::new(
                Guid::new("r1"),
                "SemanticAssignment",
                Guid::new("a"),
                Guid::new("b"),
                ElementProperties::new(),
            ))
            .expect("relate");

        let removed =
            AnchorResolver::delete_element(&mut store, &Guid::new("b"), false).expect("delete");
        assert_eq!(removed, vec![Guid::new("b")]);
        assert!(store.element(&Guid::new("a")).expect("read").is_some());
        assert_eq!(store.relationship_count().expect("count"), 0);
    }
}
