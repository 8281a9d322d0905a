//! # Watchdog Subscription Filter
//!
//! Single-slot change notification with interest filtering.
//!
//! At most one listener is registered at a time; registering replaces
//! the slot wholesale (filter included), it never merges. The slot swap
//! and event delivery share one mutex, so once `disconnect` returns no
//! new delivery can start against the removed listener.
//!
//! Events describe repository changes after they have committed; a
//! listener observes outcomes, it cannot veto them.

use crate::types::{
    Classification, Guid, MetadataElement, Relationship, StratumError, Timestamp,
};
use crate::typedefs::TypeRegistry;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

// =============================================================================
// CHANGE EVENTS
// =============================================================================

/// What happened to the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeEventType {
    ElementCreated,
    ElementUpdated,
    ElementDeleted,
    ElementStatusChanged,
    ElementClassified,
    ElementDeclassified,
    ElementReclassified,
    RelationshipCreated,
    RelationshipUpdated,
    RelationshipDeleted,
}

/// The changed record, as of after the change. Deletions carry no
/// payload beyond the subject identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangePayload {
    Element(MetadataElement),
    Relationship(Relationship),
    Classification(Classification),
    None,
}

/// A single change notification.
///
/// For classification events the subject type name is the classification
/// name, not the element's type, so interest filters can select on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub event_type: ChangeEventType,
    pub subject_guid: Guid,
    pub subject_type_name: String,
    pub timestamp: Timestamp,
    pub payload: ChangePayload,
}

// =============================================================================
// INTEREST FILTER
// =============================================================================

/// Which events a listener wants. A `None` set matches anything on that
/// axis; all present axes must match.
#[derive(Debug, Clone, Default)]
pub struct InterestFilter {
    /// Event kinds of interest.
    pub event_types: Option<BTreeSet<ChangeEventType>>,
    /// Subject type names of interest (element, classification, or
    /// relationship type names).
    pub metadata_types: Option<BTreeSet<String>>,
    /// A single element or relationship instance of interest.
    pub specific_instance: Option<Guid>,
}

impl InterestFilter {
    /// Match every event.
    #[must_use]
    pub fn match_any() -> Self {
        Self::default()
    }

    fn matches(&self, event: &ChangeEvent) -> bool {
        if let Some(types) = &self.event_types
            && !types.contains(&event.event_type)
        {
            return false;
        }
        if let Some(names) = &self.metadata_types
            && !names.contains(&event.subject_type_name)
        {
            return false;
        }
        if let Some(instance) = &self.specific_instance
            && instance != &event.subject_guid
        {
            return false;
        }
        true
    }
}

// =============================================================================
// LISTENER & SLOT
// =============================================================================

/// Implemented by the registered watchdog consumer.
///
/// Delivery happens under the slot lock; a listener that blocks delays
/// the mutating caller, so implementations should hand off quickly.
pub trait WatchdogListener: Send + Sync {
    fn process_event(&self, event: &ChangeEvent);
}

struct Subscription {
    listener: Arc<dyn WatchdogListener>,
    filter: InterestFilter,
}

/// The single-slot watchdog filter.
#[derive(Default)]
pub struct WatchdogFilter {
    slot: Mutex<Option<Subscription>>,
}

impl std::fmt::Debug for WatchdogFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered = self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false);
        f.debug_struct("WatchdogFilter")
            .field("registered", &registered)
            .finish()
    }
}

impl WatchdogFilter {
    /// Create an empty (disconnected) filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, replacing any current registration wholesale.
    ///
    /// Every type name the filter lists must be known to the registry;
    /// otherwise the registration fails with `InvalidFilterType` and the
    /// current slot is untouched.
    pub fn register(
        &self,
        registry: &TypeRegistry,
        listener: Arc<dyn WatchdogListener>,
        filter: InterestFilter,
    ) -> Result<(), StratumError> {
        if let Some(names) = &filter.metadata_types {
            for name in names {
                if !registry.is_known_type_name(name) {
                    return Err(StratumError::InvalidFilterType(name.clone()));
                }
            }
        }
        let mut slot = self.lock_slot()?;
        *slot = Some(Subscription { listener, filter });
        Ok(())
    }

    /// Remove the current registration. Idempotent: disconnecting an
    /// empty slot succeeds. After this returns, no new delivery starts
    /// against the removed listener.
    pub fn disconnect(&self) -> Result<(), StratumError> {
        let mut slot = self.lock_slot()?;
        *slot = None;
        Ok(())
    }

    /// Is a listener currently registered?
    pub fn is_registered(&self) -> Result<bool, StratumError> {
        Ok(self.lock_slot()?.is_some())
    }

    /// Deliver an event to the registered listener if its filter
    /// matches. No-op when disconnected.
    ///
    /// The slot lock is held across delivery; this is what makes
    /// disconnect a hard cut rather than a best-effort one.
    pub fn dispatch(&self, event: &ChangeEvent) -> Result<(), StratumError> {
        let slot = self.lock_slot()?;
        if let Some(subscription) = slot.as_ref()
            && subscription.filter.matches(event)
        {
            subscription.listener.process_event(event);
        }
        Ok(())
    }

    fn lock_slot(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Option<Subscription>>, StratumError> {
        self.slot.lock().map_err(|_| {
            StratumError::PropertyServerFailure("watchdog slot lock poisoned".to_string())
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener {
        delivered: AtomicUsize,
    }

    impl CountingListener {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                delivered: AtomicUsize::new(0),
            })
        }

        fn count(&self) -> usize {
            self.delivered.load(Ordering::SeqCst)
        }
    }

    impl WatchdogListener for CountingListener {
        fn process_event(&self, _event: &ChangeEvent) {
            self.delivered.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn event(event_type: ChangeEventType, type_name: &str, guid: &str) -> ChangeEvent {
        ChangeEvent {
            event_type,
            subject_guid: Guid::new(guid),
            subject_type_name: type_name.to_string(),
            timestamp: Timestamp::new(1),
            payload: ChangePayload::None,
        }
    }

    #[test]
    fn match_any_delivers_everything() {
        let filter = WatchdogFilter::new();
        let listener = CountingListener::new();
        filter
            .register(&TypeRegistry::builtin(), listener.clone(), InterestFilter::match_any())
            .expect("register");

        filter
            .dispatch(&event(ChangeEventType::ElementCreated, "Asset", "e1"))
            .expect("dispatch");
        filter
            .dispatch(&event(ChangeEventType::RelationshipDeleted, "SemanticAssignment", "r1"))
            .expect("dispatch");
        assert_eq!(listener.count(), 2);
    }

    #[test]
    fn filter_axes_are_conjunctive() {
        let filter = WatchdogFilter::new();
        let listener = CountingListener::new();
        let interest = InterestFilter {
            event_types: Some([ChangeEventType::ElementCreated].into_iter().collect()),
            metadata_types: Some(std::iter::once("Asset".to_string()).collect()),
            specific_instance: None,
        };
        filter
            .register(&TypeRegistry::builtin(), listener.clone(), interest)
            .expect("register");

        filter
            .dispatch(&event(ChangeEventType::ElementCreated, "Asset", "e1"))
            .expect("dispatch");
        filter
            .dispatch(&event(ChangeEventType::ElementCreated, "GlossaryTerm", "e2"))
            .expect("dispatch");
        filter
            .dispatch(&event(ChangeEventType::ElementDeleted, "Asset", "e1"))
            .expect("dispatch");
        assert_eq!(listener.count(), 1);
    }

    #[test]
    fn unknown_type_name_fails_and_keeps_current_slot() {
        let filter = WatchdogFilter::new();
        let first = CountingListener::new();
        filter
            .register(&TypeRegistry::builtin(), first.clone(), InterestFilter::match_any())
            .expect("register");

        let second = CountingListener::new();
        let bad = InterestFilter {
            metadata_types: Some(std::iter::once("NoSuchType".to_string()).collect()),
            ..InterestFilter::match_any()
        };
        let result = filter.register(&TypeRegistry::builtin(), second.clone(), bad);
        assert!(matches!(result, Err(StratumError::InvalidFilterType(_))));

        // The first registration still receives events.
        filter
            .dispatch(&event(ChangeEventType::ElementCreated, "Asset", "e1"))
            .expect("dispatch");
        assert_eq!(first.count(), 1);
        assert_eq!(second.count(), 0);
    }

    #[test]
    fn registration_replaces_not_merges() {
        let filter = WatchdogFilter::new();
        let first = CountingListener::new();
        filter
            .register(&TypeRegistry::builtin(), first.clone(), InterestFilter::match_any())
            .expect("register");

        let second = CountingListener::new();
        let narrow = InterestFilter {
            specific_instance: Some(Guid::new("only-this")),
            ..InterestFilter::match_any()
        };
        filter
            .register(&TypeRegistry::builtin(), second.clone(), narrow)
            .expect("re-register");

        filter
            .dispatch(&event(ChangeEventType::ElementCreated, "Asset", "e1"))
            .expect("dispatch");
        filter
            .dispatch(&event(ChangeEventType::ElementCreated, "Asset", "only-this"))
            .expect("dispatch");

        assert_eq!(first.count(), 0);
        assert_eq!(second.count(), 1);
    }

    #[test]
    fn disconnect_is_idempotent_and_stops_delivery() {
        let filter = WatchdogFilter::new();
        let listener = CountingListener::new();
        filter
            .register(&TypeRegistry::builtin(), listener.clone(), InterestFilter::match_any())
            .expect("register");

        filter.disconnect().expect("disconnect");
        filter.disconnect().expect("disconnect again");
        assert!(!filter.is_registered().expect("registered"));

        filter
            .dispatch(&event(ChangeEventType::ElementCreated, "Asset", "e1"))
            .expect("dispatch");
        assert_eq!(listener.count(), 0);
    }

    #[test]
    fn classification_events_filter_on_classification_name() {
        let filter = WatchdogFilter::new();
        let listener = CountingListener::new();
        let interest = InterestFilter {
            metadata_types: Some(std::iter::once("Confidentiality".to_string()).collect()),
            ..InterestFilter::match_any()
        };
        filter
            .register(&TypeRegistry::builtin(), listener.clone(), interest)
            .expect("register");

        filter
            .dispatch(&event(ChangeEventType::ElementClassified, "Confidentiality", "e1"))
            .expect("dispatch");
        filter
            .dispatch(&event(ChangeEventType::ElementClassified, "Anchors", "e1"))
            .expect("dispatch");
        assert_eq!(listener.count(), 1);
    }
}
