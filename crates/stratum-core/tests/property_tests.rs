//! # Property-Based Tests
//!
//! These tests ensure determinism and correctness invariants of the
//! lifecycle engine: effectivity window semantics, duplicate-link
//! symmetry, correlation uniqueness, search ordering, and the
//! completion-merge law.

use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;
use stratum_core::{
    ActionLog, ActionRequest, ActionState, AnchorResolution, AnchorResolver, CompletionRecord,
    CorrelationEngine, DuplicateEngine, DuplicateProperties, EffectivityWindow, ElementProperties,
    ExternalIdentifierProperties, Guid, MemoryRepository, MetadataElement, PropertyValue,
    RepositoryStore, SearchSpec, StratumError, Timestamp,
};

fn window(from: Option<i64>, to: Option<i64>) -> Option<EffectivityWindow> {
    EffectivityWindow::new(from.map(Timestamp::new), to.map(Timestamp::new)).ok()
}

fn store_with_elements(guids: &[String]) -> MemoryRepository {
    let mut store = MemoryRepository::new();
    for guid in guids {
        let _ = store.create_element(MetadataElement::new(
            Guid::new(guid.clone()),
            "Referenceable",
            ElementProperties::new(),
        ));
    }
    store
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// A bounded window is effective exactly on [from, to).
    #[test]
    fn effectivity_matches_half_open_interval(
        from in -1000i64..1000,
        length in 1i64..1000,
        at in -2000i64..3000
    ) {
        let to = from + length;
        let w = window(Some(from), Some(to)).expect("valid window");
        let expected = from <= at && at < to;
        prop_assert_eq!(w.is_effective(Some(Timestamp::new(at))), expected);
    }

    /// Any-time mode sees every window; unbounded windows see every instant.
    #[test]
    fn unbounded_axes_always_match(from in -1000i64..1000, at in -2000i64..2000) {
        let w = window(Some(from), None).expect("valid window");
        prop_assert!(w.is_effective(None));
        prop_assert!(EffectivityWindow::unbounded().is_effective(Some(Timestamp::new(at))));
    }

    /// Window overlap is symmetric.
    #[test]
    fn overlap_is_symmetric(
        from1 in -1000i64..1000,
        len1 in 1i64..500,
        from2 in -1000i64..1000,
        len2 in 1i64..500
    ) {
        let w1 = window(Some(from1), Some(from1 + len1)).expect("valid window");
        let w2 = window(Some(from2), Some(from2 + len2)).expect("valid window");
        prop_assert_eq!(w1.overlaps(&w2), w2.overlaps(&w1));
    }

    /// Resolving the same anchoring request twice yields the same
    /// resolution, whichever source the anchor comes from.
    #[test]
    fn anchor_resolution_is_idempotent(
        mode in 0u8..4,
        scope in proptest::option::of("[a-z]{1,6}")
    ) {
        let mut store = store_with_elements(&["anchor".to_string()]);
        // The anchor may carry a scope of its own for the child to inherit.
        if let Some(scope) = &scope {
            let classification = AnchorResolver::anchors_classification(&AnchorResolution {
                anchor_guid: Some(Guid::new("grand")),
                anchor_scope_guid: Some(Guid::new(scope.clone())),
            })
            .expect("classification");
            store
                .attach_classification(&Guid::new("anchor"), classification)
                .expect("attach");
        }

        let child = Guid::new("child");
        let anchor = Guid::new("anchor");
        let classified = AnchorResolver::anchors_classification(&AnchorResolution {
            anchor_guid: Some(anchor.clone()),
            anchor_scope_guid: None,
        })
        .expect("classification");

        let (own, explicit, classifications) = match mode {
            0 => (true, None, Vec::new()),
            1 => (false, Some(&anchor), Vec::new()),
            2 => (false, None, vec![classified]),
            _ => (false, None, Vec::new()),
        };

        let first = AnchorResolver::resolve_anchor(
            &store, &child, own, explicit, None, &classifications,
        ).expect("resolve");
        let second = AnchorResolver::resolve_anchor(
            &store, &child, own, explicit, None, &classifications,
        ).expect("resolve");
        prop_assert_eq!(first, second);
    }

    /// Peer duplicate links are symmetric in argument order: both orders
    /// address one relationship.
    #[test]
    fn peer_duplicate_link_is_order_independent(
        id1 in "[a-z]{1,8}",
        id2 in "[a-z]{1,8}",
        status in 0i64..10
    ) {
        prop_assume!(id1 != id2);
        let properties = DuplicateProperties {
            status_identifier: status,
            ..DuplicateProperties::default()
        };

        let mut forward = store_with_elements(&[id1.clone(), id2.clone()]);
        let link1 = DuplicateEngine::link_peer_duplicates(
            &mut forward, &Guid::new(id1.clone()), &Guid::new(id2.clone()), &properties, false,
        ).expect("link");

        let mut backward = store_with_elements(&[id1.clone(), id2.clone()]);
        let link2 = DuplicateEngine::link_peer_duplicates(
            &mut backward, &Guid::new(id2), &Guid::new(id1), &properties, false,
        ).expect("link");

        prop_assert_eq!(link1, link2);
        prop_assert_eq!(forward.relationship_count().expect("count"), 1);
        prop_assert_eq!(backward.relationship_count().expect("count"), 1);
    }

    /// A second correlation for the same key with an overlapping window is
    /// always rejected, and the stored record is unchanged.
    #[test]
    fn correlation_key_is_unique_per_overlap(
        identifier in "[A-Z0-9-]{1,12}",
        from in -100i64..100,
        len in 1i64..100
    ) {
        let mut store = store_with_elements(&["e1".to_string()]);
        let scope = Guid::new("scope");
        let element = Guid::new("e1");
        let properties = ExternalIdentifierProperties {
            identifier: identifier.clone(),
            external_type_name: None,
            open_type_name: "Referenceable".to_string(),
            mapping_properties: ElementProperties::new(),
        };

        let w = window(Some(from), Some(from + len)).expect("valid window");
        CorrelationEngine::add_external_identifier(&mut store, &scope, &element, &properties, w)
            .expect("first add");

        // Any window containing an instant of the first overlaps it.
        let second = CorrelationEngine::add_external_identifier(
            &mut store, &scope, &element, &properties, EffectivityWindow::unbounded(),
        );
        prop_assert!(
            matches!(second, Err(StratumError::DuplicateCorrelation { .. })),
            "expected DuplicateCorrelation, got {:?}",
            second
        );
    }

    /// Search pages are disjoint, ordered, and cover every match.
    #[test]
    fn search_pages_partition_the_results(
        guids in vec("[a-z]{1,6}", 1..40),
        page_size in 1usize..10
    ) {
        let unique: BTreeSet<String> = guids.into_iter().collect();
        let guids: Vec<String> = unique.into_iter().collect();
        let store = store_with_elements(&guids);

        let mut collected = Vec::new();
        let mut start = 0;
        loop {
            let page = store
                .search(&SearchSpec::of_type("Referenceable").page(start, page_size))
                .expect("search");
            if page.is_empty() {
                break;
            }
            prop_assert!(page.len() <= page_size);
            collected.extend(page.into_iter().map(|e| e.guid.as_str().to_string()));
            start += page_size;
        }

        prop_assert_eq!(collected.clone(), guids);
        let mut sorted = collected.clone();
        sorted.sort();
        prop_assert_eq!(collected, sorted);
    }

    /// Completion merges discovered parameters over the originals with the
    /// new value winning, and never loses an original key.
    #[test]
    fn completion_merge_law(
        original in vec(("[a-z]{1,6}", -100i64..100), 0..8),
        discovered in vec(("[a-z]{1,6}", -100i64..100), 0..8)
    ) {
        let mut original_properties = ElementProperties::new();
        for (name, value) in &original {
            original_properties.insert(name.clone(), PropertyValue::Integer(*value));
        }
        let mut discovered_properties = ElementProperties::new();
        for (name, value) in &discovered {
            discovered_properties.insert(name.clone(), PropertyValue::Integer(*value));
        }

        let mut log = ActionLog::new();
        let guid = log
            .initiate_engine_action(
                ActionRequest {
                    guid: Guid::new("a1"),
                    request_type: "survey".to_string(),
                    request_parameters: original_properties.clone(),
                    action_targets: Vec::new(),
                },
                None,
                Timestamp::new(1),
            )
            .expect("initiate");

        let action = log.action_mut(&guid).expect("action");
        action
            .record_completion_status(
                CompletionRecord {
                    status: ActionState::Completed,
                    request_parameters: discovered_properties.clone(),
                    output_guards: Vec::new(),
                    new_action_targets: Vec::new(),
                    completion_message: None,
                },
                Timestamp::new(2),
            )
            .expect("complete");

        for (name, value) in &discovered_properties {
            prop_assert_eq!(action.request_parameters.get(name), Some(value));
        }
        for (name, value) in &original_properties {
            if !discovered_properties.contains_key(name) {
                prop_assert_eq!(action.request_parameters.get(name), Some(value));
            }
        }
    }

    /// Identical operation sequences on two stores produce identical
    /// search results.
    #[test]
    fn repository_is_deterministic(guids in vec("[a-z]{1,6}", 1..30)) {
        let store1 = store_with_elements(&guids);
        let store2 = store_with_elements(&guids);

        let results1 = store1.search(&SearchSpec::any()).expect("search");
        let results2 = store2.search(&SearchSpec::any()).expect("search");
        prop_assert_eq!(results1, results2);
    }
}
