//! # Repository Store
//!
//! The backend contract and the deterministic in-memory implementation.
//!
//! The `RepositoryStore` trait is the contract the engine holds its
//! durable backend to: element/classification/relationship CRUD with
//! temporal visibility, paged search, the anchored-to index query, and
//! correlation record primitives.
//!
//! Every call fully succeeds or fails as a unit — no partial application
//! of a multi-property update. All data structures use `BTreeMap` for
//! deterministic ordering.

use crate::correlation::{Correlation, CorrelationKey};
use crate::effectivity::{Effective, EffectivityWindow};
use crate::primitives::{ANCHORS_CLASSIFICATION, PROP_ANCHOR_GUID};
use crate::search::{SearchSpec, SortOrder};
use crate::types::{
    Classification, ElementProperties, ElementStatus, Guid, MetadataElement, Relationship,
    StratumError, Timestamp,
};
use std::collections::BTreeMap;

// =============================================================================
// REPOSITORYSTORE TRAIT
// =============================================================================

/// The repository backend contract.
///
/// All fallible operations return `Result<T, StratumError>` to support
/// both in-memory and persistent backends uniformly. Reads that honor
/// effectivity are provided as default methods over the raw accessors, so
/// the visibility rules cannot drift between backends.
pub trait RepositoryStore {
    // =========================================================================
    // ELEMENTS
    // =========================================================================

    /// Store a new element. Fails with `InvalidParameter` if the guid is
    /// already in use, or if the initial classification list carries the
    /// same name twice with overlapping effectivity.
    fn create_element(&mut self, element: MetadataElement) -> Result<(), StratumError>;

    /// Raw lookup by guid, ignoring effectivity and status.
    fn element(&self, guid: &Guid) -> Result<Option<MetadataElement>, StratumError>;

    /// Update element properties. With `replace_all` the property set is
    /// replaced wholesale; otherwise the given names are merged over the
    /// existing set.
    fn update_element_properties(
        &mut self,
        guid: &Guid,
        properties: ElementProperties,
        replace_all: bool,
    ) -> Result<(), StratumError>;

    /// Update the lifecycle status.
    fn update_element_status(
        &mut self,
        guid: &Guid,
        status: ElementStatus,
    ) -> Result<(), StratumError>;

    /// Update the element's visibility window.
    fn update_element_effectivity(
        &mut self,
        guid: &Guid,
        effectivity: EffectivityWindow,
    ) -> Result<(), StratumError>;

    /// Physically remove an element together with every relationship that
    /// references it. Cascade policy lives above this call; the store
    /// removes exactly what it is told to.
    fn remove_element(&mut self, guid: &Guid) -> Result<(), StratumError>;

    // =========================================================================
    // CLASSIFICATIONS
    // =========================================================================

    /// Attach a classification. At most one classification of a given
    /// name may be attached with an overlapping effectivity window;
    /// violations fail with `InvalidParameter` before any mutation.
    fn attach_classification(
        &mut self,
        guid: &Guid,
        classification: Classification,
    ) -> Result<(), StratumError>;

    /// Replace the properties of every attached classification of the
    /// given name.
    fn update_classification(
        &mut self,
        guid: &Guid,
        name: &str,
        properties: ElementProperties,
    ) -> Result<(), StratumError>;

    /// Detach every classification of the given name.
    fn detach_classification(&mut self, guid: &Guid, name: &str) -> Result<(), StratumError>;

    // =========================================================================
    // RELATIONSHIPS
    // =========================================================================

    /// Store a new relationship. Both ends must exist; fails with
    /// `InvalidParameter` if the guid is already in use.
    fn create_relationship(&mut self, relationship: Relationship) -> Result<(), StratumError>;

    /// Raw lookup by guid, ignoring effectivity.
    fn relationship(&self, guid: &Guid) -> Result<Option<Relationship>, StratumError>;

    /// Update relationship properties (merge or replace, as for elements).
    fn update_relationship_properties(
        &mut self,
        guid: &Guid,
        properties: ElementProperties,
        replace_all: bool,
    ) -> Result<(), StratumError>;

    /// Physically remove a relationship.
    fn remove_relationship(&mut self, guid: &Guid) -> Result<(), StratumError>;

    /// Every relationship touching the given element, in guid order.
    fn relationships_for(&self, element: &Guid) -> Result<Vec<Relationship>, StratumError>;

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Paged search; see [`SearchSpec`]. Results are deterministic:
    /// sequencing property then guid tiebreak.
    fn search(&self, spec: &SearchSpec) -> Result<Vec<MetadataElement>, StratumError>;

    /// Guids of elements directly anchored to the given anchor (their
    /// `Anchors` classification names it). The anchor itself is excluded.
    fn anchored_to(&self, anchor: &Guid) -> Result<Vec<Guid>, StratumError>;

    /// Total number of stored elements.
    fn element_count(&self) -> Result<usize, StratumError>;

    /// Total number of stored relationships.
    fn relationship_count(&self) -> Result<usize, StratumError>;

    // =========================================================================
    // CORRELATION RECORDS
    // =========================================================================

    /// Append a correlation record. Key-level overlap rules live in the
    /// correlation engine; the store only persists.
    fn insert_correlation(&mut self, correlation: Correlation) -> Result<(), StratumError>;

    /// Every record stored for the key, ordered by effective-from.
    fn correlations_for_key(&self, key: &CorrelationKey)
    -> Result<Vec<Correlation>, StratumError>;

    /// Every record for (scope, element), across identifiers.
    fn correlations_for_element(
        &self,
        scope: &Guid,
        element: &Guid,
    ) -> Result<Vec<Correlation>, StratumError>;

    /// Replace the record list for a key wholesale.
    fn replace_correlations(
        &mut self,
        key: &CorrelationKey,
        records: Vec<Correlation>,
    ) -> Result<(), StratumError>;

    /// Remove every record for the key; returns how many were removed.
    fn remove_correlations(&mut self, key: &CorrelationKey) -> Result<usize, StratumError>;

    // =========================================================================
    // EFFECTIVITY-FILTERED READS (default methods)
    // =========================================================================

    /// Lookup honoring temporal visibility: `None` if the element is
    /// absent, soft-deleted, or outside its window at `at`. Attached
    /// classifications outside their own windows are stripped.
    fn element_at(
        &self,
        guid: &Guid,
        at: Option<Timestamp>,
    ) -> Result<Option<MetadataElement>, StratumError> {
        let Some(element) = self.element(guid)? else {
            return Ok(None);
        };
        if element.status == ElementStatus::Deleted || !element.is_effective(at) {
            return Ok(None);
        }
        Ok(Some(visible_copy(element, at)))
    }

    /// Relationships touching the element that are within their windows
    /// at `at`.
    fn relationships_at(
        &self,
        element: &Guid,
        at: Option<Timestamp>,
    ) -> Result<Vec<Relationship>, StratumError> {
        Ok(self
            .relationships_for(element)?
            .into_iter()
            .filter(|r| r.is_effective(at))
            .collect())
    }
}

/// Strip classifications outside their windows at `at`.
fn visible_copy(mut element: MetadataElement, at: Option<Timestamp>) -> MetadataElement {
    element.classifications.retain(|c| c.is_effective(at));
    element
}

/// Reject a classification list carrying the same name twice with
/// overlapping windows. Applied to the initial list at element creation;
/// later attachments are checked by `attach_classification`.
pub(crate) fn check_initial_classifications(
    classifications: &[Classification],
) -> Result<(), StratumError> {
    for (index, classification) in classifications.iter().enumerate() {
        for other in &classifications[index + 1..] {
            if classification.name == other.name
                && classification.effectivity.overlaps(&other.effectivity)
            {
                return Err(StratumError::InvalidParameter(format!(
                    "classification '{}' supplied twice with overlapping effectivity",
                    classification.name
                )));
            }
        }
    }
    Ok(())
}

/// Shared search predicate + ordering, so backends cannot drift.
pub(crate) fn run_search<'a, I>(elements: I, spec: &SearchSpec) -> Vec<MetadataElement>
where
    I: Iterator<Item = &'a MetadataElement>,
{
    let mut matches: Vec<&MetadataElement> = elements
        .filter(|e| spec.status_matches(e.status))
        .filter(|e| spec.type_name.as_ref().is_none_or(|t| &e.type_name == t))
        .filter(|e| e.is_effective(spec.effective_at))
        .filter(|e| {
            spec.classification
                .as_ref()
                .is_none_or(|name| e.is_classified(name, spec.effective_at))
        })
        .filter(|e| {
            spec.conditions.iter().all(|condition| {
                e.properties
                    .get(&condition.name)
                    .is_some_and(|value| condition.matches(value))
            })
        })
        .collect();

    match &spec.sequencing_property {
        Some(property) => {
            // Missing property sorts after present values; guid tiebreak.
            matches.sort_by(|a, b| {
                let av = a.properties.get(property);
                let bv = b.properties.get(property);
                match (av, bv) {
                    (Some(av), Some(bv)) => av.cmp(bv).then_with(|| a.guid.cmp(&b.guid)),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => a.guid.cmp(&b.guid),
                }
            });
        }
        None => matches.sort_by(|a, b| a.guid.cmp(&b.guid)),
    }
    if spec.order == SortOrder::Descending {
        matches.reverse();
    }

    matches
        .into_iter()
        .skip(spec.start)
        .take(spec.bounded_page_size())
        .map(|e| visible_copy(e.clone(), spec.effective_at))
        .collect()
}

/// Anchor-guid extraction shared by backends: the `Anchors` classification
/// is structural, so it is consulted without an effectivity instant.
pub(crate) fn anchor_of(element: &MetadataElement) -> Option<&Guid> {
    element
        .classification(ANCHORS_CLASSIFICATION, None)?
        .properties
        .get(PROP_ANCHOR_GUID)?
        .as_guid()
}

// =============================================================================
// IN-MEMORY IMPLEMENTATION
// =============================================================================

/// The in-memory repository.
///
/// Uses `BTreeMap` exclusively for deterministic ordering. No `HashMap`
/// allowed.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    /// Element storage: guid -> element (classifications embedded).
    elements: BTreeMap<Guid, MetadataElement>,

    /// Relationship storage: guid -> relationship.
    relationships: BTreeMap<Guid, Relationship>,

    /// Correlation records: key -> records ordered by effective-from.
    correlations: BTreeMap<CorrelationKey, Vec<Correlation>>,
}

impl MemoryRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All elements in guid order.
    pub fn elements(&self) -> impl Iterator<Item = &MetadataElement> {
        self.elements.values()
    }

    /// All relationships in guid order.
    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    /// All correlation records in key order.
    pub fn correlations(&self) -> impl Iterator<Item = &Correlation> {
        self.correlations.values().flatten()
    }

    fn element_mut(&mut self, guid: &Guid) -> Result<&mut MetadataElement, StratumError> {
        self.elements
            .get_mut(guid)
            .ok_or_else(|| StratumError::ElementNotFound(guid.clone()))
    }
}

impl RepositoryStore for MemoryRepository {
    fn create_element(&mut self, element: MetadataElement) -> Result<(), StratumError> {
        if self.elements.contains_key(&element.guid) {
            return Err(StratumError::InvalidParameter(format!(
                "element guid '{}' already in use",
                element.guid
            )));
        }
        check_initial_classifications(&element.classifications)?;
        let mut element = element;
        element.classifications.sort_by(|a, b| a.name.cmp(&b.name));
        self.elements.insert(element.guid.clone(), element);
        Ok(())
    }

    fn element(&self, guid: &Guid) -> Result<Option<MetadataElement>, StratumError> {
        Ok(self.elements.get(guid).cloned())
    }

    fn update_element_properties(
        &mut self,
        guid: &Guid,
        properties: ElementProperties,
        replace_all: bool,
    ) -> Result<(), StratumError> {
        let element = self.element_mut(guid)?;
        if replace_all {
            element.properties = properties;
        } else {
            element.properties.extend(properties);
        }
        Ok(())
    }

    fn update_element_status(
        &mut self,
        guid: &Guid,
        status: ElementStatus,
    ) -> Result<(), StratumError> {
        self.element_mut(guid)?.status = status;
        Ok(())
    }

    fn update_element_effectivity(
        &mut self,
        guid: &Guid,
        effectivity: EffectivityWindow,
    ) -> Result<(), StratumError> {
        self.element_mut(guid)?.effectivity = effectivity;
        Ok(())
    }

    fn remove_element(&mut self, guid: &Guid) -> Result<(), StratumError> {
        if self.elements.remove(guid).is_none() {
            return Err(StratumError::ElementNotFound(guid.clone()));
        }
        self.relationships.retain(|_, r| !r.involves(guid));
        Ok(())
    }

    fn attach_classification(
        &mut self,
        guid: &Guid,
        classification: Classification,
    ) -> Result<(), StratumError> {
        let element = self.element_mut(guid)?;
        let conflict = element.classifications.iter().any(|existing| {
            existing.name == classification.name
                && existing.effectivity.overlaps(&classification.effectivity)
        });
        if conflict {
            return Err(StratumError::InvalidParameter(format!(
                "classification '{}' already attached with overlapping effectivity",
                classification.name
            )));
        }
        element.classifications.push(classification);
        element.classifications.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(())
    }

    fn update_classification(
        &mut self,
        guid: &Guid,
        name: &str,
        properties: ElementProperties,
    ) -> Result<(), StratumError> {
        let element = self.element_mut(guid)?;
        let mut found = false;
        for classification in &mut element.classifications {
            if classification.name == name {
                classification.properties = properties.clone();
                found = true;
            }
        }
        if !found {
            return Err(StratumError::InvalidParameter(format!(
                "classification '{name}' is not attached to element '{guid}'"
            )));
        }
        Ok(())
    }

    fn detach_classification(&mut self, guid: &Guid, name: &str) -> Result<(), StratumError> {
        let element = self.element_mut(guid)?;
        let before = element.classifications.len();
        element.classifications.retain(|c| c.name != name);
        if element.classifications.len() == before {
            return Err(StratumError::InvalidParameter(format!(
                "classification '{name}' is not attached to element '{guid}'"
            )));
        }
        Ok(())
    }

    fn create_relationship(&mut self, relationship: Relationship) -> Result<(), StratumError> {
        if self.relationships.contains_key(&relationship.guid) {
            return Err(StratumError::InvalidParameter(format!(
                "relationship guid '{}' already in use",
                relationship.guid
            )));
        }
        if !self.elements.contains_key(&relationship.end1) {
            return Err(StratumError::ElementNotFound(relationship.end1.clone()));
        }
        if !self.elements.contains_key(&relationship.end2) {
            return Err(StratumError::ElementNotFound(relationship.end2.clone()));
        }
        self.relationships
            .insert(relationship.guid.clone(), relationship);
        Ok(())
    }

    fn relationship(&self, guid: &Guid) -> Result<Option<Relationship>, StratumError> {
        Ok(self.relationships.get(guid).cloned())
    }

    fn update_relationship_properties(
        &mut self,
        guid: &Guid,
        properties: ElementProperties,
        replace_all: bool,
    ) -> Result<(), StratumError> {
        let relationship = self
            .relationships
            .get_mut(guid)
            .ok_or_else(|| StratumError::RelationshipNotFound(guid.clone()))?;
        if replace_all {
            relationship.properties = properties;
        } else {
            relationship.properties.extend(properties);
        }
        Ok(())
    }

    fn remove_relationship(&mut self, guid: &Guid) -> Result<(), StratumError> {
        if self.relationships.remove(guid).is_none() {
            return Err(StratumError::RelationshipNotFound(guid.clone()));
        }
        Ok(())
    }

    fn relationships_for(&self, element: &Guid) -> Result<Vec<Relationship>, StratumError> {
        Ok(self
            .relationships
            .values()
            .filter(|r| r.involves(element))
            .cloned()
            .collect())
    }

    fn search(&self, spec: &SearchSpec) -> Result<Vec<MetadataElement>, StratumError> {
        Ok(run_search(self.elements.values(), spec))
    }

    fn anchored_to(&self, anchor: &Guid) -> Result<Vec<Guid>, StratumError> {
        Ok(self
            .elements
            .values()
            .filter(|e| &e.guid != anchor && anchor_of(e) == Some(anchor))
            .map(|e| e.guid.clone())
            .collect())
    }

    fn element_count(&self) -> Result<usize, StratumError> {
        Ok(self.elements.len())
    }

    fn relationship_count(&self) -> Result<usize, StratumError> {
        Ok(self.relationships.len())
    }

    fn insert_correlation(&mut self, correlation: Correlation) -> Result<(), StratumError> {
        let records = self.correlations.entry(correlation.key.clone()).or_default();
        records.push(correlation);
        records.sort_by_key(|c| c.effectivity.effective_from());
        Ok(())
    }

    fn correlations_for_key(
        &self,
        key: &CorrelationKey,
    ) -> Result<Vec<Correlation>, StratumError> {
        Ok(self.correlations.get(key).cloned().unwrap_or_default())
    }

    fn correlations_for_element(
        &self,
        scope: &Guid,
        element: &Guid,
    ) -> Result<Vec<Correlation>, StratumError> {
        Ok(self
            .correlations
            .iter()
            .filter(|(key, _)| &key.scope == scope && &key.element == element)
            .flat_map(|(_, records)| records.iter().cloned())
            .collect())
    }

    fn replace_correlations(
        &mut self,
        key: &CorrelationKey,
        records: Vec<Correlation>,
    ) -> Result<(), StratumError> {
        if records.is_empty() {
            self.correlations.remove(key);
        } else {
            self.correlations.insert(key.clone(), records);
        }
        Ok(())
    }

    fn remove_correlations(&mut self, key: &CorrelationKey) -> Result<usize, StratumError> {
        Ok(self.correlations.remove(key).map_or(0, |records| records.len()))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::PropertyCondition;
    use crate::types::PropertyValue;

    fn element(guid: &str, type_name: &str) -> MetadataElement {
        MetadataElement::new(Guid::new(guid), type_name, ElementProperties::new())
    }

    fn window(from: i64, to: i64) -> EffectivityWindow {
        EffectivityWindow::new(Some(Timestamp::new(from)), Some(Timestamp::new(to)))
            .expect("valid window")
    }

    #[test]
    fn create_and_lookup_element() {
        let mut store = MemoryRepository::new();
        store.create_element(element("e1", "Asset")).expect("create");

        let found = store.element(&Guid::new("e1")).expect("lookup");
        assert_eq!(found.map(|e| e.type_name), Some("Asset".to_string()));
    }

    #[test]
    fn duplicate_guid_rejected() {
        let mut store = MemoryRepository::new();
        store.create_element(element("e1", "Asset")).expect("create");

        let result = store.create_element(element("e1", "Asset"));
        assert!(matches!(result, Err(StratumError::InvalidParameter(_))));
        assert_eq!(store.element_count().expect("count"), 1);
    }

    #[test]
    fn element_at_honors_window_and_status() {
        let mut store = MemoryRepository::new();
        let mut e = element("e1", "Asset");
        e.effectivity = window(100, 200);
        store.create_element(e).expect("create");
        let guid = Guid::new("e1");

        assert!(store.element_at(&guid, None).expect("read").is_some());
        assert!(
            store
                .element_at(&guid, Some(Timestamp::new(150)))
                .expect("read")
                .is_some()
        );
        assert!(
            store
                .element_at(&guid, Some(Timestamp::new(200)))
                .expect("read")
                .is_none()
        );

        store
            .update_element_status(&guid, ElementStatus::Deleted)
            .expect("status");
        assert!(store.element_at(&guid, None).expect("read").is_none());
    }

    #[test]
    fn overlapping_initial_classifications_rejected() {
        let mut e = element("e1", "Asset");
        e.classifications.push(Classification::with_effectivity(
            "Confidentiality",
            ElementProperties::new(),
            window(0, 100),
        ));
        e.classifications.push(Classification::with_effectivity(
            "Confidentiality",
            ElementProperties::new(),
            window(50, 150),
        ));

        let mut store = MemoryRepository::new();
        let result = store.create_element(e);
        assert!(matches!(result, Err(StratumError::InvalidParameter(_))));
        assert_eq!(store.element_count().expect("count"), 0);

        // Disjoint windows for the same name are a legal initial list.
        let mut e = element("e1", "Asset");
        e.classifications.push(Classification::with_effectivity(
            "Confidentiality",
            ElementProperties::new(),
            window(0, 100),
        ));
        e.classifications.push(Classification::with_effectivity(
            "Confidentiality",
            ElementProperties::new(),
            window(100, 200),
        ));
        store.create_element(e).expect("create");
    }

    #[test]
    fn classification_overlap_rejected() {
        let mut store = MemoryRepository::new();
        store.create_element(element("e1", "Asset")).expect("create");
        let guid = Guid::new("e1");

        store
            .attach_classification(
                &guid,
                Classification::with_effectivity(
                    "Confidentiality",
                    ElementProperties::new(),
                    window(0, 100),
                ),
            )
            .expect("attach");

        // Overlapping window for the same name is rejected.
        let overlapping = store.attach_classification(
            &guid,
            Classification::with_effectivity(
                "Confidentiality",
                ElementProperties::new(),
                window(50, 150),
            ),
        );
        assert!(matches!(
            overlapping,
            Err(StratumError::InvalidParameter(_))
        ));

        // Disjoint window for the same name is fine.
        store
            .attach_classification(
                &guid,
                Classification::with_effectivity(
                    "Confidentiality",
                    ElementProperties::new(),
                    window(100, 200),
                ),
            )
            .expect("attach disjoint");
    }

    #[test]
    fn relationship_requires_both_ends() {
        let mut store = MemoryRepository::new();
        store.create_element(element("e1", "Asset")).expect("create");

        let dangling = Relationship::new(
            Guid::new("r1"),
            "SemanticAssignment",
            Guid::new("e1"),
            Guid::new("missing"),
            ElementProperties::new(),
        );
        assert!(matches!(
            store.create_relationship(dangling),
            Err(StratumError::ElementNotFound(_))
        ));
    }

    #[test]
    fn remove_element_removes_relationships() {
        let mut store = MemoryRepository::new();
        store.create_element(element("e1", "Asset")).expect("create");
        store.create_element(element("e2", "Asset")).expect("create");
        store
            .create_relationship(Relationship::new(
                Guid::new("r1"),
                "SemanticAssignment",
                Guid::new("e1"),
                Guid::new("e2"),
                ElementProperties::new(),
            ))
            .expect("relate");

        store.remove_element(&Guid::new("e2")).expect("remove");

        assert_eq!(store.relationship_count().expect("count"), 0);
        assert!(
            store
                .relationships_for(&Guid::new("e1"))
                .expect("rels")
                .is_empty()
        );
    }

    #[test]
    fn search_filters_and_pages_deterministically() {
        let mut store = MemoryRepository::new();
        for i in 0..5 {
            let mut e = element(&format!("e{i}"), "Asset");
            e.properties.insert(
                "displayName".to_string(),
                PropertyValue::Text(format!("asset-{i}")),
            );
            store.create_element(e).expect("create");
        }
        store
            .create_element(element("x1", "Collection"))
            .expect("create");

        let spec = SearchSpec::of_type("Asset").page(0, 3);
        let first = store.search(&spec).expect("search");
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].guid, Guid::new("e0"));

        let spec = SearchSpec::of_type("Asset").page(3, 3);
        let second = store.search(&spec).expect("search");
        assert_eq!(second.len(), 2);

        let spec = SearchSpec::of_type("Asset")
            .with_condition(PropertyCondition::contains("displayName", "asset-4"));
        let matched = store.search(&spec).expect("search");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].guid, Guid::new("e4"));
    }

    #[test]
    fn search_sequencing_property_orders_results() {
        let mut store = MemoryRepository::new();
        for (guid, name) in [("a", "zeta"), ("b", "alpha"), ("c", "midway")] {
            let mut e = element(guid, "Asset");
            e.properties.insert(
                "displayName".to_string(),
                PropertyValue::Text(name.to_string()),
            );
            store.create_element(e).expect("create");
        }

        let spec = SearchSpec {
            sequencing_property: Some("displayName".to_string()),
            ..SearchSpec::of_type("Asset")
        };
        let results = store.search(&spec).expect("search");
        let guids: Vec<_> = results.iter().map(|e| e.guid.as_str().to_string()).collect();
        assert_eq!(guids, vec!["b", "c", "a"]);

        let spec = SearchSpec {
            sequencing_property: Some("displayName".to_string()),
            order: SortOrder::Descending,
            ..SearchSpec::of_type("Asset")
        };
        let results = store.search(&spec).expect("search");
        assert_eq!(results[0].guid, Guid::new("a"));
    }

    #[test]
    fn anchored_to_reads_anchors_classification() {
        let mut store = MemoryRepository::new();
        store.create_element(element("anchor", "Asset")).expect("create");

        let mut child = element("child", "Asset");
        let mut props = ElementProperties::new();
        props.insert(
            PROP_ANCHOR_GUID.to_string(),
            PropertyValue::GuidRef(Guid::new("anchor")),
        );
        child
            .classifications
            .push(Classification::new(ANCHORS_CLASSIFICATION, props));
        store.create_element(child).expect("create");

        let dependents = store.anchored_to(&Guid::new("anchor")).expect("anchored");
        assert_eq!(dependents, vec![Guid::new("child")]);

        // An element is never its own dependent.
        assert!(store.anchored_to(&Guid::new("child")).expect("anchored").is_empty());
    }
}
