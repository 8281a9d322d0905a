//! # Search Module
//!
//! Structured, paged search requests against the repository.
//!
//! - Long-running searches are paged with an explicit start/size cursor,
//!   never streamed; callers re-issue bounded requests to continue
//! - Deterministic result ordering (sequencing property, guid tiebreak)
//! - Effectivity filtering applied before any predicate match

use crate::primitives::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::types::{ElementStatus, PropertyValue, Timestamp};
use std::collections::BTreeSet;

/// How a property condition matches a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyMatch {
    /// Exact value equality.
    Equals(PropertyValue),
    /// Text value contains the given substring.
    Contains(String),
}

/// A single named property predicate. Conditions are AND-combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyCondition {
    pub name: String,
    pub matcher: PropertyMatch,
}

impl PropertyCondition {
    /// Equality condition helper.
    #[must_use]
    pub fn equals(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            matcher: PropertyMatch::Equals(value),
        }
    }

    /// Substring condition helper (text properties only).
    #[must_use]
    pub fn contains(name: impl Into<String>, needle: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matcher: PropertyMatch::Contains(needle.into()),
        }
    }

    /// Does the given value satisfy this condition?
    #[must_use]
    pub fn matches(&self, value: &PropertyValue) -> bool {
        match &self.matcher {
            PropertyMatch::Equals(expected) => value == expected,
            PropertyMatch::Contains(needle) => {
                value.as_text().is_some_and(|text| text.contains(needle.as_str()))
            }
        }
    }
}

/// Result ordering direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// A paged search request.
///
/// Every filter is optional; an empty spec matches all elements visible
/// at the effectivity instant.
#[derive(Debug, Clone, Default)]
pub struct SearchSpec {
    /// Restrict to this element type.
    pub type_name: Option<String>,
    /// AND-combined property predicates.
    pub conditions: Vec<PropertyCondition>,
    /// Restrict to these lifecycle statuses. `None` matches any status
    /// except `Deleted`.
    pub statuses: Option<BTreeSet<ElementStatus>>,
    /// Require a classification of this name, effective at the instant.
    pub classification: Option<String>,
    /// Sort by this property; `None` sorts by guid. Elements missing the
    /// property sort after those carrying it.
    pub sequencing_property: Option<String>,
    /// Sort direction.
    pub order: SortOrder,
    /// Effectivity instant; `None` is any-time mode.
    pub effective_at: Option<Timestamp>,
    /// Zero-based result offset.
    pub start: usize,
    /// Page size; zero selects the default, larger values are clamped.
    pub page_size: usize,
}

impl SearchSpec {
    /// Match everything visible at any time, first page.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict to one element type.
    #[must_use]
    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    /// Add a property condition.
    #[must_use]
    pub fn with_condition(mut self, condition: PropertyCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Require a classification name.
    #[must_use]
    pub fn classified_as(mut self, name: impl Into<String>) -> Self {
        self.classification = Some(name.into());
        self
    }

    /// Set the effectivity instant.
    #[must_use]
    pub fn effective_at(mut self, at: Timestamp) -> Self {
        self.effective_at = Some(at);
        self
    }

    /// Set the page cursor.
    #[must_use]
    pub fn page(mut self, start: usize, page_size: usize) -> Self {
        self.start = start;
        self.page_size = page_size;
        self
    }

    /// The page size actually applied: default when zero, clamped to the
    /// maximum otherwise.
    #[must_use]
    pub fn bounded_page_size(&self) -> usize {
        if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size.min(MAX_PAGE_SIZE)
        }
    }

    /// Does this status pass the status filter?
    ///
    /// With no explicit filter, soft-deleted elements are excluded; an
    /// explicit filter naming `Deleted` can retrieve them.
    #[must_use]
    pub fn status_matches(&self, status: ElementStatus) -> bool {
        match &self.statuses {
            Some(statuses) => statuses.contains(&status),
            None => status != ElementStatus::Deleted,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_matches_text_only() {
        let condition = PropertyCondition::contains("displayName", "ord");
        assert!(condition.matches(&PropertyValue::Text("orders".into())));
        assert!(!condition.matches(&PropertyValue::Text("customers".into())));
        assert!(!condition.matches(&PropertyValue::Integer(42)));
    }

    #[test]
    fn page_size_bounds() {
        assert_eq!(SearchSpec::any().bounded_page_size(), DEFAULT_PAGE_SIZE);

        let oversized = SearchSpec::any().page(0, MAX_PAGE_SIZE + 1);
        assert_eq!(oversized.bounded_page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn default_status_filter_hides_deleted() {
        let spec = SearchSpec::any();
        assert!(spec.status_matches(ElementStatus::Active));
        assert!(spec.status_matches(ElementStatus::Draft));
        assert!(!spec.status_matches(ElementStatus::Deleted));

        let mut statuses = BTreeSet::new();
        statuses.insert(ElementStatus::Deleted);
        let spec = SearchSpec {
            statuses: Some(statuses),
            ..SearchSpec::default()
        };
        assert!(spec.status_matches(ElementStatus::Deleted));
        assert!(!spec.status_matches(ElementStatus::Active));
    }
}
