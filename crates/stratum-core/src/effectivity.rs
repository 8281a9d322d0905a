//! # Effectivity Evaluator
//!
//! Pure evaluation of "is this versioned fact visible at time T".
//!
//! Every element, classification, and relationship carries an
//! [`EffectivityWindow`]; the evaluator is applied uniformly before any of
//! them is returned from a read operation or matched by a search
//! predicate. No side effects; pure and total.

use crate::types::{StratumError, Timestamp};
use serde::{Deserialize, Serialize};

/// A `[effective_from, effective_to)` visibility window.
///
/// A `None` bound is unbounded on that side. The inclusive/exclusive
/// semantics are fixed: a fact is visible at exactly `effective_from` and
/// no longer visible at exactly `effective_to`. The bounds are private so
/// an inverted window cannot be represented; construction goes through
/// [`EffectivityWindow::new`], including deserialization of stored bytes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(try_from = "WindowBounds")]
pub struct EffectivityWindow {
    effective_from: Option<Timestamp>,
    effective_to: Option<Timestamp>,
}

impl EffectivityWindow {
    /// Create a window, validating `effective_from < effective_to` when
    /// both bounds are set.
    pub fn new(
        effective_from: Option<Timestamp>,
        effective_to: Option<Timestamp>,
    ) -> Result<Self, StratumError> {
        if let (Some(from), Some(to)) = (effective_from, effective_to)
            && from >= to
        {
            return Err(StratumError::InvalidParameter(format!(
                "effective_from ({}) must precede effective_to ({})",
                from.millis(),
                to.millis()
            )));
        }
        Ok(Self {
            effective_from,
            effective_to,
        })
    }

    /// Window visible at all times.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            effective_from: None,
            effective_to: None,
        }
    }

    /// The inclusive start bound, unbounded when `None`.
    #[must_use]
    pub const fn effective_from(&self) -> Option<Timestamp> {
        self.effective_from
    }

    /// The exclusive end bound, unbounded when `None`.
    #[must_use]
    pub const fn effective_to(&self) -> Option<Timestamp> {
        self.effective_to
    }

    /// Is the fact visible at `at`?
    ///
    /// `None` means "any time" mode: always visible. Otherwise visible iff
    /// `at` falls in `[effective_from, effective_to)` with `None` bounds
    /// treated as -inf/+inf.
    #[must_use]
    pub fn is_effective(&self, at: Option<Timestamp>) -> bool {
        let Some(at) = at else {
            return true;
        };
        let from_ok = self.effective_from.is_none_or(|from| from <= at);
        let to_ok = self.effective_to.is_none_or(|to| at < to);
        from_ok && to_ok
    }

    /// Do two windows overlap on any instant?
    ///
    /// Used by the correlation store to detect duplicate correlations for
    /// the same key. Empty intersection under `[from, to)` semantics means
    /// no overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let starts_before_other_ends = match (self.effective_from, other.effective_to) {
            (Some(from), Some(to)) => from < to,
            _ => true,
        };
        let other_starts_before_self_ends = match (other.effective_from, self.effective_to) {
            (Some(from), Some(to)) => from < to,
            _ => true,
        };
        starts_before_other_ends && other_starts_before_self_ends
    }
}

/// Wire shape of a window. Decoding funnels through the validating
/// constructor, so stored bytes cannot smuggle an inverted window.
#[derive(Deserialize)]
struct WindowBounds {
    effective_from: Option<Timestamp>,
    effective_to: Option<Timestamp>,
}

impl TryFrom<WindowBounds> for EffectivityWindow {
    type Error = StratumError;

    fn try_from(bounds: WindowBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.effective_from, bounds.effective_to)
    }
}

/// Implemented by every versioned fact the repository can return.
pub trait Effective {
    /// The visibility window of this fact.
    fn effectivity(&self) -> &EffectivityWindow;

    /// Is this fact visible at `at`?
    fn is_effective(&self, at: Option<Timestamp>) -> bool {
        self.effectivity().is_effective(at)
    }
}

impl Effective for crate::types::MetadataElement {
    fn effectivity(&self) -> &EffectivityWindow {
        &self.effectivity
    }
}

impl Effective for crate::types::Classification {
    fn effectivity(&self) -> &EffectivityWindow {
        &self.effectivity
    }
}

impl Effective for crate::types::Relationship {
    fn effectivity(&self) -> &EffectivityWindow {
        &self.effectivity
    }
}

// =============================================================================
// TESTS
// =============================================================================
