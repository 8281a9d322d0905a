//! # redb-backed Repository Storage
//!
//! A disk-backed repository store using the redb embedded database.
//!
//! Records are postcard-serialized into three tables keyed by guid (or,
//! for correlations, by the postcard-encoded key triple). Every mutation
//! is one ACID transaction; the relationship adjacency needed by
//! `relationships_for` and the anchored-to query is answered by table
//! scans, which redb's copy-on-write B-trees keep cheap at this
//! repository's scale.

use crate::correlation::{Correlation, CorrelationKey};
use crate::effectivity::EffectivityWindow;
use crate::repository::{RepositoryStore, anchor_of, check_initial_classifications, run_search};
use crate::search::SearchSpec;
use crate::types::{
    Classification, ElementProperties, ElementStatus, Guid, MetadataElement, Relationship,
    StratumError,
};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for elements: guid -> serialized MetadataElement (classifications
/// embedded).
const ELEMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("elements");

/// Table for relationships: guid -> serialized Relationship.
const RELATIONSHIPS: TableDefinition<&str, &[u8]> = TableDefinition::new("relationships");

/// Table for correlation records: serialized CorrelationKey -> serialized
/// Vec<Correlation>.
const CORRELATIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("correlations");

fn io_err(e: impl std::fmt::Display) -> StratumError {
    StratumError::IoError(e.to_string())
}

fn ser_err(e: impl std::fmt::Display) -> StratumError {
    StratumError::SerializationError(e.to_string())
}

/// A disk-backed repository store using redb.
pub struct RedbRepository {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbRepository").finish_non_exhaustive()
    }
}

impl RedbRepository {
    /// Open or create a repository database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StratumError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(ELEMENTS).map_err(io_err)?;
            let _ = write_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
            let _ = write_txn.open_table(CORRELATIONS).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Compact the database (optional optimization).
    pub fn compact(&mut self) -> Result<(), StratumError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }

    fn put_element(&self, element: &MetadataElement) -> Result<(), StratumError> {
        let bytes = postcard::to_allocvec(element).map_err(ser_err)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(ELEMENTS).map_err(io_err)?;
            table
                .insert(element.guid.as_str(), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn update_element_with(
        &self,
        guid: &Guid,
        update: impl FnOnce(&mut MetadataElement) -> Result<(), StratumError>,
    ) -> Result<(), StratumError> {
        let mut element = self
            .element(guid)?
            .ok_or_else(|| StratumError::ElementNotFound(guid.clone()))?;
        update(&mut element)?;
        self.put_element(&element)
    }

    fn all_elements(&self) -> Result<Vec<MetadataElement>, StratumError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ELEMENTS).map_err(io_err)?;
        let mut elements = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            elements.push(postcard::from_bytes(value.value()).map_err(ser_err)?);
        }
        Ok(elements)
    }

    fn put_relationship(&self, relationship: &Relationship) -> Result<(), StratumError> {
        let bytes = postcard::to_allocvec(relationship).map_err(ser_err)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
            table
                .insert(relationship.guid.as_str(), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn correlation_key_bytes(key: &CorrelationKey) -> Result<Vec<u8>, StratumError> {
        postcard::to_allocvec(key).map_err(ser_err)
    }
}

impl RepositoryStore for RedbRepository {
    fn create_element(&mut self, element: MetadataElement) -> Result<(), StratumError> {
        if self.element(&element.guid)?.is_some() {
            return Err(StratumError::InvalidParameter(format!(
                "element guid '{}' already in use",
                element.guid
            )));
        }
        check_initial_classifications(&element.classifications)?;
        let mut element = element;
        element.classifications.sort_by(|a, b| a.name.cmp(&b.name));
        self.put_element(&element)
    }

    fn element(&self, guid: &Guid) -> Result<Option<MetadataElement>, StratumError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ELEMENTS).map_err(io_err)?;
        table
            .get(guid.as_str())
            .map_err(io_err)?
            .map(|data| postcard::from_bytes(data.value()).map_err(ser_err))
            .transpose()
    }

    fn update_element_properties(
        &mut self,
        guid: &Guid,
        properties: ElementProperties,
        replace_all: bool,
    ) -> Result<(), StratumError> {
        self.update_element_with(guid, |element| {
            if replace_all {
                element.properties = properties;
            } else {
                element.properties.extend(properties);
            }
            Ok(())
        })
    }

    fn update_element_status(
        &mut self,
        guid: &Guid,
        status: ElementStatus,
    ) -> Result<(), StratumError> {
        self.update_element_with(guid, |element| {
            element.status = status;
            Ok(())
        })
    }

    fn update_element_effectivity(
        &mut self,
        guid: &Guid,
        effectivity: EffectivityWindow,
    ) -> Result<(), StratumError> {
        self.update_element_with(guid, |element| {
            element.effectivity = effectivity;
            Ok(())
        })
    }

    fn remove_element(&mut self, guid: &Guid) -> Result<(), StratumError> {
        // Collect touching relationships before opening the write
        // transaction; removal of element and adjacency commits as one.
        let touching: Vec<String> = self
            .relationships_for(guid)?
            .into_iter()
            .map(|r| r.guid.0)
            .collect();

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut elements = write_txn.open_table(ELEMENTS).map_err(io_err)?;
            if elements.remove(guid.as_str()).map_err(io_err)?.is_none() {
                return Err(StratumError::ElementNotFound(guid.clone()));
            }
            let mut relationships = write_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
            for relationship_guid in &touching {
                relationships
                    .remove(relationship_guid.as_str())
                    .map_err(io_err)?;
            }
        }
        write_txn.commit().map_err(io_err)
    }

    fn attach_classification(
        &mut self,
        guid: &Guid,
        classification: Classification,
    ) -> Result<(), StratumError> {
        self.update_element_with(guid, |element| {
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
        })
    }

    fn update_classification(
        &mut self,
        guid: &Guid,
        name: &str,
        properties: ElementProperties,
    ) -> Result<(), StratumError> {
        self.update_element_with(guid, |element| {
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
        })
    }

    fn detach_classification(&mut self, guid: &Guid, name: &str) -> Result<(), StratumError> {
        self.update_element_with(guid, |element| {
            let before = element.classifications.len();
            element.classifications.retain(|c| c.name != name);
            if element.classifications.len() == before {
                return Err(StratumError::InvalidParameter(format!(
                    "classification '{name}' is not attached to element '{guid}'"
                )));
            }
            Ok(())
        })
    }

    fn create_relationship(&mut self, relationship: Relationship) -> Result<(), StratumError> {
        if self.relationship(&relationship.guid)?.is_some() {
            return Err(StratumError::InvalidParameter(format!(
                "relationship guid '{}' already in use",
                relationship.guid
            )));
        }
        if self.element(&relationship.end1)?.is_none() {
            return Err(StratumError::ElementNotFound(relationship.end1.clone()));
        }
        if self.element(&relationship.end2)?.is_none() {
            return Err(StratumError::ElementNotFound(relationship.end2.clone()));
        }
        self.put_relationship(&relationship)
    }

    fn relationship(&self, guid: &Guid) -> Result<Option<Relationship>, StratumError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
        table
            .get(guid.as_str())
            .map_err(io_err)?
            .map(|data| postcard::from_bytes(data.value()).map_err(ser_err))
            .transpose()
    }

    fn update_relationship_properties(
        &mut self,
        guid: &Guid,
        properties: ElementProperties,
        replace_all: bool,
    ) -> Result<(), StratumError> {
        let mut relationship = self
            .relationship(guid)?
            .ok_or_else(|| StratumError::RelationshipNotFound(guid.clone()))?;
        if replace_all {
            relationship.properties = properties;
        } else {
            relationship.properties.extend(properties);
        }
        self.put_relationship(&relationship)
    }

    fn remove_relationship(&mut self, guid: &Guid) -> Result<(), StratumError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
            if table.remove(guid.as_str()).map_err(io_err)?.is_none() {
                return Err(StratumError::RelationshipNotFound(guid.clone()));
            }
        }
        write_txn.commit().map_err(io_err)
    }

    fn relationships_for(&self, element: &Guid) -> Result<Vec<Relationship>, StratumError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
        let mut touching = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            let relationship: Relationship =
                postcard::from_bytes(value.value()).map_err(ser_err)?;
            if relationship.involves(element) {
                touching.push(relationship);
            }
        }
        Ok(touching)
    }

    fn search(&self, spec: &SearchSpec) -> Result<Vec<MetadataElement>, StratumError> {
        let elements = self.all_elements()?;
        Ok(run_search(elements.iter(), spec))
    }

    fn anchored_to(&self, anchor: &Guid) -> Result<Vec<Guid>, StratumError> {
        Ok(self
            .all_elements()?
            .iter()
            .filter(|e| &e.guid != anchor && anchor_of(e) == Some(anchor))
            .map(|e| e.guid.clone())
            .collect())
    }

    fn element_count(&self) -> Result<usize, StratumError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ELEMENTS).map_err(io_err)?;
        let len = table.len().map_err(io_err)?;
        Ok(usize::try_from(len).unwrap_or(usize::MAX))
    }

    fn relationship_count(&self) -> Result<usize, StratumError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
        let len = table.len().map_err(io_err)?;
        Ok(usize::try_from(len).unwrap_or(usize::MAX))
    }

    fn insert_correlation(&mut self, correlation: Correlation) -> Result<(), StratumError> {
        let mut records = self.correlations_for_key(&correlation.key)?;
        let key = correlation.key.clone();
        records.push(correlation);
        records.sort_by_key(|c| c.effectivity.effective_from());
        self.replace_correlations(&key, records)
    }

    fn correlations_for_key(
        &self,
        key: &CorrelationKey,
    ) -> Result<Vec<Correlation>, StratumError> {
        let key_bytes = Self::correlation_key_bytes(key)?;
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(CORRELATIONS).map_err(io_err)?;
        table
            .get(key_bytes.as_slice())
            .map_err(io_err)?
            .map(|data| postcard::from_bytes(data.value()).map_err(ser_err))
            .transpose()
            .map(Option::unwrap_or_default)
    }

    fn correlations_for_element(
        &self,
        scope: &Guid,
        element: &Guid,
    ) -> Result<Vec<Correlation>, StratumError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(CORRELATIONS).map_err(io_err)?;
        let mut matching = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (key_bytes, value) = entry.map_err(io_err)?;
            let key: CorrelationKey =
                postcard::from_bytes(key_bytes.value()).map_err(ser_err)?;
            if &key.scope == scope && &key.element == element {
                let records: Vec<Correlation> =
                    postcard::from_bytes(value.value()).map_err(ser_err)?;
                matching.extend(records);
            }
        }
        Ok(matching)
    }

    fn replace_correlations(
        &mut self,
        key: &CorrelationKey,
        records: Vec<Correlation>,
    ) -> Result<(), StratumError> {
        let key_bytes = Self::correlation_key_bytes(key)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(CORRELATIONS).map_err(io_err)?;
            if records.is_empty() {
                table.remove(key_bytes.as_slice()).map_err(io_err)?;
            } else {
                let bytes = postcard::to_allocvec(&records).map_err(ser_err)?;
                table
                    .insert(key_bytes.as_slice(), bytes.as_slice())
                    .map_err(io_err)?;
            }
        }
        write_txn.commit().map_err(io_err)
    }

    fn remove_correlations(&mut self, key: &CorrelationKey) -> Result<usize, StratumError> {
        let removed = self.correlations_for_key(key)?.len();
        if removed > 0 {
            self.replace_correlations(key, Vec::new())?;
        }
        Ok(removed)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{ANCHORS_CLASSIFICATION, PROP_ANCHOR_GUID};
    use crate::types::{PropertyValue, Timestamp};
    use tempfile::TempDir;

    fn open_repository(dir: &TempDir) -> RedbRepository {
        RedbRepository::open(dir.path().join("stratum.redb")).expect("open database")
    }

    fn element(guid: &str, type_name: &str) -> MetadataElement {
        MetadataElement::new(Guid::new(guid), type_name, ElementProperties::new())
    }

    #[test]
    fn elements_survive_reopen() {
        let dir = TempDir::new().expect("tempdir");
        {
            let mut store = open_repository(&dir);
            store.create_element(element("e1", "Asset")).expect("create");
            store
                .attach_classification(
                    &Guid::new("e1"),
                    Classification::new("Confidentiality", ElementProperties::new()),
                )
                .expect("attach");
        }

        let store = open_repository(&dir);
        let found = store
            .element(&Guid::new("e1"))
            .expect("read")
            .expect("present");
        assert_eq!(found.type_name, "Asset");
        assert!(found.is_classified("Confidentiality", None));
    }

    #[test]
    fn remove_element_removes_relationships_atomically() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_repository(&dir);
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

        store.remove_element(&Guid::new("e1")).expect("remove");
        assert_eq!(store.relationship_count().expect("count"), 0);
        assert!(store.element(&Guid::new("e2")).expect("read").is_some());
    }

    #[test]
    fn overlapping_initial_classifications_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_repository(&dir);

        let mut e = element("e1", "Asset");
        e.classifications
            .push(Classification::new("Confidentiality", ElementProperties::new()));
        e.classifications
            .push(Classification::new("Confidentiality", ElementProperties::new()));

        let result = store.create_element(e);
        assert!(matches!(result, Err(StratumError::InvalidParameter(_))));
        assert_eq!(store.element_count().expect("count"), 0);
    }

    #[test]
    fn search_matches_memory_semantics() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_repository(&dir);
        for i in 0..3 {
            let mut e = element(&format!("e{i}"), "Asset");
            e.properties.insert(
                "displayName".to_string(),
                PropertyValue::Text(format!("asset-{i}")),
            );
            store.create_element(e).expect("create");
        }

        let results = store.search(&SearchSpec::of_type("Asset")).expect("search");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].guid, Guid::new("e0"));
    }

    #[test]
    fn anchored_to_scans_classifications() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_repository(&dir);
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
    }

    #[test]
    fn correlations_round_trip_and_remove() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_repository(&dir);
        store.create_element(element("e1", "Asset")).expect("create");

        let key = CorrelationKey::new(Guid::new("scope"), Guid::new("e1"), "EXT-1");
        store
            .insert_correlation(Correlation {
                key: key.clone(),
                open_type_name: "Asset".to_string(),
                external_type_name: None,
                mapping_properties: ElementProperties::new(),
                effectivity: EffectivityWindow::unbounded(),
                last_synchronized: Some(Timestamp::new(7)),
            })
            .expect("insert");

        let records = store.correlations_for_key(&key).expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].last_synchronized, Some(Timestamp::new(7)));

        let by_element = store
            .correlations_for_element(&Guid::new("scope"), &Guid::new("e1"))
            .expect("by element");
        assert_eq!(by_element.len(), 1);

        assert_eq!(store.remove_correlations(&key).expect("remove"), 1);
        assert_eq!(store.remove_correlations(&key).expect("remove again"), 0);
    }
}
