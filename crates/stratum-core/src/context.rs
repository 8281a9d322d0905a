//! # Governance Context
//!
//! One concrete context composing the engine's capabilities over a
//! chosen storage backend.
//!
//! Callers hold the context through segregated capability traits, one
//! per governance role: verification (reads), provisioning (element and
//! relationship lifecycle), remediation (duplicates and correlations),
//! and watchdog (change subscription). The context also owns the
//! engine-action audit log and a logical clock; the clock only advances
//! when the caller tells it to, so every run is replayable.

use crate::anchoring::AnchorResolver;
use crate::correlation::{Correlation, CorrelationEngine, ExternalIdentifierProperties};
use crate::duplicates::{DuplicateEngine, DuplicateProperties};
use crate::effectivity::EffectivityWindow;
use crate::engine_action::{
    ActionLog, ActionRequest, ActionState, ActionTargetStatus, CompletionCell, CompletionRecord,
    EngineAction, RequestSource,
};
use crate::primitives::ANCHORS_CLASSIFICATION;
use crate::repository::{MemoryRepository, RepositoryStore};
use crate::search::SearchSpec;
use crate::storage::RedbRepository;
use crate::typedefs::TypeRegistry;
use crate::types::{
    Classification, ElementOrigin, ElementProperties, ElementStatus, Guid, MetadataElement,
    Relationship, StratumError, Timestamp,
};
use crate::watchdog::{
    ChangeEvent, ChangeEventType, ChangePayload, InterestFilter, WatchdogFilter, WatchdogListener,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// BACKEND
// =============================================================================

/// The storage backend behind a context.
#[derive(Debug)]
pub enum Backend {
    /// Volatile, deterministic, for tests and dry runs.
    Memory(MemoryRepository),
    /// Disk-backed via redb.
    Persistent(RedbRepository),
}

macro_rules! delegate {
    ($self:ident, $store:ident => $body:expr) => {
        match $self {
            Backend::Memory($store) => $body,
            Backend::Persistent($store) => $body,
        }
    };
}

impl RepositoryStore for Backend {
    fn create_element(&mut self, element: MetadataElement) -> Result<(), StratumError> {
        delegate!(self, s => s.create_element(element))
    }

    fn element(&self, guid: &Guid) -> Result<Option<MetadataElement>, StratumError> {
        delegate!(self, s => s.element(guid))
    }

    fn update_element_properties(
        &mut self,
        guid: &Guid,
        properties: ElementProperties,
        replace_all: bool,
    ) -> Result<(), StratumError> {
        delegate!(self, s => s.update_element_properties(guid, properties, replace_all))
    }

    fn update_element_status(
        &mut self,
        guid: &Guid,
        status: ElementStatus,
    ) -> Result<(), StratumError> {
        delegate!(self, s => s.update_element_status(guid, status))
    }

    fn update_element_effectivity(
        &mut self,
        guid: &Guid,
        effectivity: EffectivityWindow,
    ) -> Result<(), StratumError> {
        delegate!(self, s => s.update_element_effectivity(guid, effectivity))
    }

    fn remove_element(&mut self, guid: &Guid) -> Result<(), StratumError> {
        delegate!(self, s => s.remove_element(guid))
    }

    fn attach_classification(
        &mut self,
        guid: &Guid,
        classification: Classification,
    ) -> Result<(), StratumError> {
        delegate!(self, s => s.attach_classification(guid, classification))
    }

    fn update_classification(
        &mut self,
        guid: &Guid,
        name: &str,
        properties: ElementProperties,
    ) -> Result<(), StratumError> {
        delegate!(self, s => s.update_classification(guid, name, properties))
    }

    fn detach_classification(&mut self, guid: &Guid, name: &str) -> Result<(), StratumError> {
        delegate!(self, s => s.detach_classification(guid, name))
    }

    fn create_relationship(&mut self, relationship: Relationship) -> Result<(), StratumError> {
        delegate!(self, s => s.create_relationship(relationship))
    }

    fn relationship(&self, guid: &Guid) -> Result<Option<Relationship>, StratumError> {
        delegate!(self, s => s.relationship(guid))
    }

    fn update_relationship_properties(
        &mut self,
        guid: &Guid,
        properties: ElementProperties,
        replace_all: bool,
    ) -> Result<(), StratumError> {
        delegate!(self, s => s.update_relationship_properties(guid, properties, replace_all))
    }

    fn remove_relationship(&mut self, guid: &Guid) -> Result<(), StratumError> {
        delegate!(self, s => s.remove_relationship(guid))
    }

    fn relationships_for(&self, element: &Guid) -> Result<Vec<Relationship>, StratumError> {
        delegate!(self, s => s.relationships_for(element))
    }

    fn search(&self, spec: &SearchSpec) -> Result<Vec<MetadataElement>, StratumError> {
        delegate!(self, s => s.search(spec))
    }

    fn anchored_to(&self, anchor: &Guid) -> Result<Vec<Guid>, StratumError> {
        delegate!(self, s => s.anchored_to(anchor))
    }

    fn element_count(&self) -> Result<usize, StratumError> {
        delegate!(self, s => s.element_count())
    }

    fn relationship_count(&self) -> Result<usize, StratumError> {
        delegate!(self, s => s.relationship_count())
    }

    fn insert_correlation(&mut self, correlation: Correlation) -> Result<(), StratumError> {
        delegate!(self, s => s.insert_correlation(correlation))
    }

    fn correlations_for_key(
        &self,
        key: &crate::correlation::CorrelationKey,
    ) -> Result<Vec<Correlation>, StratumError> {
        delegate!(self, s => s.correlations_for_key(key))
    }

    fn correlations_for_element(
        &self,
        scope: &Guid,
        element: &Guid,
    ) -> Result<Vec<Correlation>, StratumError> {
        delegate!(self, s => s.correlations_for_element(scope, element))
    }

    fn replace_correlations(
        &mut self,
        key: &crate::correlation::CorrelationKey,
        records: Vec<Correlation>,
    ) -> Result<(), StratumError> {
        delegate!(self, s => s.replace_correlations(key, records))
    }

    fn remove_correlations(
        &mut self,
        key: &crate::correlation::CorrelationKey,
    ) -> Result<usize, StratumError> {
        delegate!(self, s => s.remove_correlations(key))
    }
}

// =============================================================================
// ELEMENT CREATION REQUEST
// =============================================================================

/// Everything a caller supplies when creating an element.
#[derive(Debug, Clone)]
pub struct NewElementSpec {
    pub guid: Guid,
    pub type_name: String,
    pub properties: ElementProperties,
    pub status: ElementStatus,
    pub effectivity: EffectivityWindow,
    pub origin: ElementOrigin,
    /// Initial classifications; may include an anchoring classification,
    /// which must agree with the explicit anchoring fields below.
    pub classifications: Vec<Classification>,
    pub is_own_anchor: bool,
    pub anchor_guid: Option<Guid>,
    pub anchor_scope_guid: Option<Guid>,
}

impl NewElementSpec {
    /// An active, unbounded, unanchored element of the given type.
    #[must_use]
    pub fn new(guid: Guid, type_name: impl Into<String>, properties: ElementProperties) -> Self {
        Self {
            guid,
            type_name: type_name.into(),
            properties,
            status: ElementStatus::Active,
            effectivity: EffectivityWindow::unbounded(),
            origin: ElementOrigin::default(),
            classifications: Vec::new(),
            is_own_anchor: false,
            anchor_guid: None,
            anchor_scope_guid: None,
        }
    }

    /// Anchor the new element to an existing one.
    #[must_use]
    pub fn anchored_to(mut self, anchor: Guid) -> Self {
        self.anchor_guid = Some(anchor);
        self
    }

    /// Make the new element its own anchor.
    #[must_use]
    pub fn own_anchor(mut self) -> Self {
        self.is_own_anchor = true;
        self
    }
}

// =============================================================================
// CAPABILITY TRAITS
// =============================================================================

/// Read-only verification role.
pub trait VerificationCapability {
    /// Effectivity-filtered element read.
    fn get_element(
        &self,
        guid: &Guid,
        at: Option<Timestamp>,
    ) -> Result<Option<MetadataElement>, StratumError>;

    /// Effectivity-filtered relationships of an element.
    fn get_relationships(
        &self,
        guid: &Guid,
        at: Option<Timestamp>,
    ) -> Result<Vec<Relationship>, StratumError>;

    /// Paged, deterministic search.
    fn find_elements(&self, spec: &SearchSpec) -> Result<Vec<MetadataElement>, StratumError>;

    /// Read-only external identifier check.
    fn validate_external_identifier(
        &self,
        scope: &Guid,
        element: &Guid,
        identifier: &str,
        at: Option<Timestamp>,
    ) -> Result<bool, StratumError>;
}

/// Element and relationship lifecycle role.
pub trait ProvisioningCapability {
    fn create_element(&mut self, spec: NewElementSpec) -> Result<Guid, StratumError>;

    fn update_element_properties(
        &mut self,
        guid: &Guid,
        properties: ElementProperties,
        replace_all: bool,
    ) -> Result<(), StratumError>;

    fn update_element_status(
        &mut self,
        guid: &Guid,
        status: ElementStatus,
    ) -> Result<(), StratumError>;

    fn update_element_effectivity(
        &mut self,
        guid: &Guid,
        effectivity: EffectivityWindow,
    ) -> Result<(), StratumError>;

    /// Delete an element; with `cascaded_delete` the anchored closure
    /// goes with it. Returns the removed guids.
    fn delete_element(
        &mut self,
        guid: &Guid,
        cascaded_delete: bool,
    ) -> Result<Vec<Guid>, StratumError>;

    fn classify_element(
        &mut self,
        guid: &Guid,
        classification: Classification,
    ) -> Result<(), StratumError>;

    fn reclassify_element(
        &mut self,
        guid: &Guid,
        name: &str,
        properties: ElementProperties,
    ) -> Result<(), StratumError>;

    fn declassify_element(&mut self, guid: &Guid, name: &str) -> Result<(), StratumError>;

    fn create_relationship(
        &mut self,
        guid: Guid,
        type_name: &str,
        end1: &Guid,
        end2: &Guid,
        properties: ElementProperties,
        effectivity: EffectivityWindow,
    ) -> Result<Guid, StratumError>;

    fn update_relationship_properties(
        &mut self,
        guid: &Guid,
        properties: ElementProperties,
        replace_all: bool,
    ) -> Result<(), StratumError>;

    fn delete_relationship(&mut self, guid: &Guid) -> Result<(), StratumError>;
}

/// Duplicate and correlation stewardship role.
pub trait RemediationCapability {
    fn link_peer_duplicates(
        &mut self,
        element1: &Guid,
        element2: &Guid,
        properties: &DuplicateProperties,
        set_known_duplicate: bool,
    ) -> Result<Guid, StratumError>;

    fn link_consolidated_duplicate(
        &mut self,
        survivor: &Guid,
        sources: &[Guid],
        properties: &DuplicateProperties,
    ) -> Result<Vec<Guid>, StratumError>;

    fn add_external_identifier(
        &mut self,
        scope: &Guid,
        element: &Guid,
        properties: &ExternalIdentifierProperties,
        effectivity: EffectivityWindow,
    ) -> Result<(), StratumError>;

    fn update_external_identifier(
        &mut self,
        scope: &Guid,
        element: &Guid,
        properties: &ExternalIdentifierProperties,
    ) -> Result<(), StratumError>;

    fn remove_external_identifier(
        &mut self,
        scope: &Guid,
        element: &Guid,
        identifier: &str,
    ) -> Result<(), StratumError>;

    fn confirm_synchronization(
        &mut self,
        scope: &Guid,
        element: &Guid,
        identifier: &str,
    ) -> Result<(), StratumError>;
}

/// Change-subscription role.
pub trait WatchdogCapability {
    /// Register a listener, replacing any current one.
    fn register_watchdog(
        &self,
        listener: Arc<dyn WatchdogListener>,
        filter: InterestFilter,
    ) -> Result<(), StratumError>;

    /// Remove the current listener. Idempotent.
    fn disconnect_watchdog(&self) -> Result<(), StratumError>;
}

// =============================================================================
// GOVERNANCE CONTEXT
// =============================================================================

/// The concrete engine context.
pub struct GovernanceContext {
    backend: Backend,
    registry: TypeRegistry,
    watchdog: WatchdogFilter,
    actions: ActionLog,
    /// Logical clock; advances only via [`GovernanceContext::advance_to`].
    now: Timestamp,
}

impl std::fmt::Debug for GovernanceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernanceContext")
            .field("backend", &self.backend)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

impl GovernanceContext {
    /// A context over a fresh in-memory repository.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_backend(Backend::Memory(MemoryRepository::new()))
    }

    /// A context over a disk-backed repository at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StratumError> {
        Ok(Self::with_backend(Backend::Persistent(
            RedbRepository::open(path)?,
        )))
    }

    /// A context over an explicit backend.
    #[must_use]
    pub fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            registry: TypeRegistry::builtin(),
            watchdog: WatchdogFilter::new(),
            actions: ActionLog::new(),
            now: Timestamp::new(0),
        }
    }

    /// Advance the logical clock. Never moves backwards.
    pub fn advance_to(&mut self, at: Timestamp) {
        if at > self.now {
            self.now = at;
        }
    }

    /// The current logical instant.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// The type registry, for registering deployment types.
    #[must_use]
    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    /// Direct read access to the backend store.
    #[must_use]
    pub fn store(&self) -> &Backend {
        &self.backend
    }

    /// Stored element count, all statuses included.
    pub fn element_count(&self) -> Result<usize, StratumError> {
        self.backend.element_count()
    }

    /// Stored relationship count.
    pub fn relationship_count(&self) -> Result<usize, StratumError> {
        self.backend.relationship_count()
    }

    // =========================================================================
    // ENGINE ACTIONS
    // =========================================================================

    /// Record a requested engine action.
    pub fn initiate_engine_action(
        &mut self,
        request: ActionRequest,
        request_source: Option<RequestSource>,
    ) -> Result<Guid, StratumError> {
        self.actions
            .initiate_engine_action(request, request_source, self.now)
    }

    /// Record a chained governance action process.
    pub fn initiate_governance_action_process(
        &mut self,
        steps: Vec<ActionRequest>,
        request_source: Option<RequestSource>,
    ) -> Result<Vec<Guid>, StratumError> {
        self.actions
            .initiate_governance_action_process(steps, request_source, self.now)
    }

    /// Mark an action claimed by an engine.
    pub fn start_engine_action(&mut self, guid: &Guid) -> Result<(), StratumError> {
        let now = self.now;
        self.action_mut(guid)?.start(now);
        Ok(())
    }

    /// Record the terminal outcome of an action; the previously recorded
    /// terminal status comes back on re-completion.
    pub fn record_completion_status(
        &mut self,
        guid: &Guid,
        record: CompletionRecord,
    ) -> Result<Option<ActionState>, StratumError> {
        let now = self.now;
        self.action_mut(guid)?.record_completion_status(record, now)
    }

    /// Record per-target progress.
    pub fn update_action_target_status(
        &mut self,
        action: &Guid,
        target: &Guid,
        status: ActionTargetStatus,
        start_date: Option<Timestamp>,
        completion_date: Option<Timestamp>,
        completion_message: Option<String>,
    ) -> Result<(), StratumError> {
        self.action_mut(action)?.update_action_target_status(
            target,
            status,
            start_date,
            completion_date,
            completion_message,
        )
    }

    /// Read an action record.
    #[must_use]
    pub fn engine_action(&self, guid: &Guid) -> Option<&EngineAction> {
        self.actions.action(guid)
    }

    /// Lock-free completion handle for a supervising monitor.
    #[must_use]
    pub fn action_status_handle(&self, guid: &Guid) -> Option<CompletionCell> {
        self.actions.status_handle(guid)
    }

    fn action_mut(&mut self, guid: &Guid) -> Result<&mut EngineAction, StratumError> {
        self.actions.action_mut(guid).ok_or_else(|| {
            StratumError::InvalidParameter(format!("unknown engine action '{guid}'"))
        })
    }

    // =========================================================================
    // EVENT DISPATCH
    // =========================================================================

    fn emit(
        &self,
        event_type: ChangeEventType,
        subject_guid: Guid,
        subject_type_name: impl Into<String>,
        payload: ChangePayload,
    ) -> Result<(), StratumError> {
        self.watchdog.dispatch(&ChangeEvent {
            event_type,
            subject_guid,
            subject_type_name: subject_type_name.into(),
            timestamp: self.now,
            payload,
        })
    }

    fn element_type_name(&self, guid: &Guid) -> Result<String, StratumError> {
        self.backend
            .element(guid)?
            .map(|e| e.type_name)
            .ok_or_else(|| StratumError::ElementNotFound(guid.clone()))
    }

    fn emit_element_event(
        &self,
        event_type: ChangeEventType,
        guid: &Guid,
    ) -> Result<(), StratumError> {
        let element = self
            .backend
            .element(guid)?
            .ok_or_else(|| StratumError::ElementNotFound(guid.clone()))?;
        self.emit(
            event_type,
            guid.clone(),
            element.type_name.clone(),
            ChangePayload::Element(element),
        )
    }
}

impl Drop for GovernanceContext {
    fn drop(&mut self) {
        // Releasing the context ends the subscription; a poisoned slot at
        // teardown has nothing left to protect.
        let _ = self.watchdog.disconnect();
    }
}

// =============================================================================
// CAPABILITY IMPLEMENTATIONS
// =============================================================================

impl VerificationCapability for GovernanceContext {
    fn get_element(
        &self,
        guid: &Guid,
        at: Option<Timestamp>,
    ) -> Result<Option<MetadataElement>, StratumError> {
        self.backend.element_at(guid, at)
    }

    fn get_relationships(
        &self,
        guid: &Guid,
        at: Option<Timestamp>,
    ) -> Result<Vec<Relationship>, StratumError> {
        self.backend.relationships_at(guid, at)
    }

    fn find_elements(&self, spec: &SearchSpec) -> Result<Vec<MetadataElement>, StratumError> {
        self.backend.search(spec)
    }

    fn validate_external_identifier(
        &self,
        scope: &Guid,
        element: &Guid,
        identifier: &str,
        at: Option<Timestamp>,
    ) -> Result<bool, StratumError> {
        CorrelationEngine::validate_external_identifier(&self.backend, scope, element, identifier, at)
    }
}

impl ProvisioningCapability for GovernanceContext {
    fn create_element(&mut self, spec: NewElementSpec) -> Result<Guid, StratumError> {
        self.registry.validate_element(&spec.type_name, &spec.properties)?;
        for classification in &spec.classifications {
            self.registry
                .validate_classification(&classification.name, &classification.properties)?;
        }

        let resolution = AnchorResolver::resolve_anchor(
            &self.backend,
            &spec.guid,
            spec.is_own_anchor,
            spec.anchor_guid.as_ref(),
            spec.anchor_scope_guid.as_ref(),
            &spec.classifications,
        )?;

        // The resolved anchoring replaces any caller-supplied anchoring
        // classification; agreement was checked during resolution.
        let mut classifications: Vec<Classification> = spec
            .classifications
            .into_iter()
            .filter(|c| c.name != ANCHORS_CLASSIFICATION)
            .collect();
        if let Some(anchors) = AnchorResolver::anchors_classification(&resolution) {
            classifications.push(anchors);
        }

        let element = MetadataElement {
            guid: spec.guid.clone(),
            type_name: spec.type_name,
            status: spec.status,
            effectivity: spec.effectivity,
            properties: spec.properties,
            origin: spec.origin,
            classifications,
        };
        self.backend.create_element(element)?;
        self.emit_element_event(ChangeEventType::ElementCreated, &spec.guid)?;
        Ok(spec.guid)
    }

    fn update_element_properties(
        &mut self,
        guid: &Guid,
        properties: ElementProperties,
        replace_all: bool,
    ) -> Result<(), StratumError> {
        let type_name = self.element_type_name(guid)?;
        self.registry.validate_element(&type_name, &properties)?;
        self.backend
            .update_element_properties(guid, properties, replace_all)?;
        self.emit_element_event(ChangeEventType::ElementUpdated, guid)
    }

    fn update_element_status(
        &mut self,
        guid: &Guid,
        status: ElementStatus,
    ) -> Result<(), StratumError> {
        self.backend.update_element_status(guid, status)?;
        self.emit_element_event(ChangeEventType::ElementStatusChanged, guid)
    }

    fn update_element_effectivity(
        &mut self,
        guid: &Guid,
        effectivity: EffectivityWindow,
    ) -> Result<(), StratumError> {
        self.backend.update_element_effectivity(guid, effectivity)?;
        self.emit_element_event(ChangeEventType::ElementUpdated, guid)
    }

    fn delete_element(
        &mut self,
        guid: &Guid,
        cascaded_delete: bool,
    ) -> Result<Vec<Guid>, StratumError> {
        // Subject identities outlive the records; capture type names for
        // the deletion events before anything is removed.
        let mut type_names: BTreeMap<Guid, String> = BTreeMap::new();
        if let Some(element) = self.backend.element(guid)? {
            type_names.insert(guid.clone(), element.type_name);
        }
        for target in AnchorResolver::cascade_targets(&self.backend, guid)? {
            if let Some(element) = self.backend.element(&target)? {
                type_names.insert(target, element.type_name);
            }
        }

        let removed = AnchorResolver::delete_element(&mut self.backend, guid, cascaded_delete)?;
        for removed_guid in &removed {
            let type_name = type_names
                .get(removed_guid)
                .cloned()
                .unwrap_or_default();
            self.emit(
                ChangeEventType::ElementDeleted,
                removed_guid.clone(),
                type_name,
                ChangePayload::None,
            )?;
        }
        Ok(removed)
    }

    fn classify_element(
        &mut self,
        guid: &Guid,
        classification: Classification,
    ) -> Result<(), StratumError> {
        self.registry
            .validate_classification(&classification.name, &classification.properties)?;
        let name = classification.name.clone();
        let payload = ChangePayload::Classification(classification.clone());
        self.backend.attach_classification(guid, classification)?;
        self.emit(ChangeEventType::ElementClassified, guid.clone(), name, payload)
    }

    fn reclassify_element(
        &mut self,
        guid: &Guid,
        name: &str,
        properties: ElementProperties,
    ) -> Result<(), StratumError> {
        self.registry.validate_classification(name, &properties)?;
        self.backend.update_classification(guid, name, properties)?;
        let payload = self
            .backend
            .element(guid)?
            .and_then(|e| e.classification(name, None).cloned())
            .map_or(ChangePayload::None, ChangePayload::Classification);
        self.emit(ChangeEventType::ElementReclassified, guid.clone(), name, payload)
    }

    fn declassify_element(&mut self, guid: &Guid, name: &str) -> Result<(), StratumError> {
        self.backend.detach_classification(guid, name)?;
        self.emit(
            ChangeEventType::ElementDeclassified,
            guid.clone(),
            name,
            ChangePayload::None,
        )
    }

    fn create_relationship(
        &mut self,
        guid: Guid,
        type_name: &str,
        end1: &Guid,
        end2: &Guid,
        properties: ElementProperties,
        effectivity: EffectivityWindow,
    ) -> Result<Guid, StratumError> {
        let end1_type = self.element_type_name(end1)?;
        let end2_type = self.element_type_name(end2)?;
        self.registry
            .validate_relationship(type_name, &end1_type, &end2_type, &properties)?;

        let mut relationship =
            Relationship::new(guid.clone(), type_name, end1.clone(), end2.clone(), properties);
        relationship.effectivity = effectivity;
        let payload = ChangePayload::Relationship(relationship.clone());
        self.backend.create_relationship(relationship)?;
        self.emit(
            ChangeEventType::RelationshipCreated,
            guid.clone(),
            type_name,
            payload,
        )?;
        Ok(guid)
    }

    fn update_relationship_properties(
        &mut self,
        guid: &Guid,
        properties: ElementProperties,
        replace_all: bool,
    ) -> Result<(), StratumError> {
        self.backend
            .update_relationship_properties(guid, properties, replace_all)?;
        let relationship = self
            .backend
            .relationship(guid)?
            .ok_or_else(|| StratumError::RelationshipNotFound(guid.clone()))?;
        self.emit(
            ChangeEventType::RelationshipUpdated,
            guid.clone(),
            relationship.type_name.clone(),
            ChangePayload::Relationship(relationship),
        )
    }

    fn delete_relationship(&mut self, guid: &Guid) -> Result<(), StratumError> {
        let type_name = self
            .backend
            .relationship(guid)?
            .ok_or_else(|| StratumError::RelationshipNotFound(guid.clone()))?
            .type_name;
        self.backend.remove_relationship(guid)?;
        self.emit(
            ChangeEventType::RelationshipDeleted,
            guid.clone(),
            type_name,
            ChangePayload::None,
        )
    }
}

impl RemediationCapability for GovernanceContext {
    fn link_peer_duplicates(
        &mut self,
        element1: &Guid,
        element2: &Guid,
        properties: &DuplicateProperties,
        set_known_duplicate: bool,
    ) -> Result<Guid, StratumError> {
        let link = DuplicateEngine::link_peer_duplicates(
            &mut self.backend,
            element1,
            element2,
            properties,
            set_known_duplicate,
        )?;
        let relationship = self
            .backend
            .relationship(&link)?
            .ok_or_else(|| StratumError::RelationshipNotFound(link.clone()))?;
        self.emit(
            ChangeEventType::RelationshipCreated,
            link.clone(),
            relationship.type_name.clone(),
            ChangePayload::Relationship(relationship),
        )?;
        Ok(link)
    }

    fn link_consolidated_duplicate(
        &mut self,
        survivor: &Guid,
        sources: &[Guid],
        properties: &DuplicateProperties,
    ) -> Result<Vec<Guid>, StratumError> {
        let links = DuplicateEngine::link_consolidated_duplicate(
            &mut self.backend,
            survivor,
            sources,
            properties,
        )?;
        for link in &links {
            let relationship = self
                .backend
                .relationship(link)?
                .ok_or_else(|| StratumError::RelationshipNotFound(link.clone()))?;
            self.emit(
                ChangeEventType::RelationshipCreated,
                link.clone(),
                relationship.type_name.clone(),
                ChangePayload::Relationship(relationship),
            )?;
        }
        Ok(links)
    }

    fn add_external_identifier(
        &mut self,
        scope: &Guid,
        element: &Guid,
        properties: &ExternalIdentifierProperties,
        effectivity: EffectivityWindow,
    ) -> Result<(), StratumError> {
        CorrelationEngine::add_external_identifier(
            &mut self.backend,
            scope,
            element,
            properties,
            effectivity,
        )
    }

    fn update_external_identifier(
        &mut self,
        scope: &Guid,
        element: &Guid,
        properties: &ExternalIdentifierProperties,
    ) -> Result<(), StratumError> {
        CorrelationEngine::update_external_identifier(&mut self.backend, scope, element, properties)
    }

    fn remove_external_identifier(
        &mut self,
        scope: &Guid,
        element: &Guid,
        identifier: &str,
    ) -> Result<(), StratumError> {
        CorrelationEngine::remove_external_identifier(&mut self.backend, scope, element, identifier)
    }

    fn confirm_synchronization(
        &mut self,
        scope: &Guid,
        element: &Guid,
        identifier: &str,
    ) -> Result<(), StratumError> {
        CorrelationEngine::confirm_synchronization(
            &mut self.backend,
            scope,
            element,
            identifier,
            self.now,
        )
    }
}

impl WatchdogCapability for GovernanceContext {
    fn register_watchdog(
        &self,
        listener: Arc<dyn WatchdogListener>,
        filter: InterestFilter,
    ) -> Result<(), StratumError> {
        self.watchdog.register(&self.registry, listener, filter)
    }

    fn disconnect_watchdog(&self) -> Result<(), StratumError> {
        self.watchdog.disconnect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
