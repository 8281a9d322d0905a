//! # Engine Actions
//!
//! Requested governance work and its completion protocol.
//!
//! An engine action is a record of work handed to an external governance
//! engine: what was requested, against which targets, and how it ended.
//! The overall status is published through a lock-free atomic cell so a
//! supervising monitor can poll completion without taking any lock the
//! worker holds.
//!
//! Actions are audit records; the log only ever grows.

use crate::types::{ElementProperties, Guid, StratumError, Timestamp};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

// =============================================================================
// ACTION STATE
// =============================================================================

/// Lifecycle state of an engine action.
///
/// `Requested` and `Running` are live; the rest are terminal outcomes
/// reported by the processing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionState {
    /// Recorded, not yet claimed by an engine.
    Requested,
    /// Claimed and in progress.
    Running,
    /// Work finished successfully.
    Completed,
    /// Work ran and failed.
    Failed,
    /// The request itself was malformed or unprocessable.
    Invalid,
    /// A steward acted on the findings.
    Actioned,
    /// A steward reviewed and dismissed the findings.
    Ignored,
}

impl ActionState {
    /// Is this a terminal outcome?
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Requested | Self::Running)
    }

    const fn to_u8(self) -> u8 {
        match self {
            Self::Requested => 0,
            Self::Running => 1,
            Self::Completed => 2,
            Self::Failed => 3,
            Self::Invalid => 4,
            Self::Actioned => 5,
            Self::Ignored => 6,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Failed,
            4 => Self::Invalid,
            5 => Self::Actioned,
            6 => Self::Ignored,
            _ => Self::Requested,
        }
    }
}

/// Shared handle on an action's overall status.
///
/// Writes release, reads acquire: a monitor that observes a terminal
/// state also observes every field the worker wrote before publishing
/// it. Cloning shares the same cell.
#[derive(Debug, Clone)]
pub struct CompletionCell(Arc<AtomicU8>);

impl CompletionCell {
    fn new(state: ActionState) -> Self {
        Self(Arc::new(AtomicU8::new(state.to_u8())))
    }

    fn publish(&self, state: ActionState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }

    /// Current overall status. Lock-free.
    #[must_use]
    pub fn load(&self) -> ActionState {
        ActionState::from_u8(self.0.load(Ordering::Acquire))
    }
}

// =============================================================================
// ACTION TARGETS & SOURCES
// =============================================================================

/// Per-target processing progress, independent of the overall status: a
/// multi-target action can have some targets done and some waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionTargetStatus {
    #[default]
    Waiting,
    InProgress,
    Completed,
    Failed,
}

/// An element the action operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTarget {
    /// Role of the target within the request (e.g. "sourceAsset").
    pub name: String,
    /// Guid of the target element.
    pub guid: Guid,
    pub status: ActionTargetStatus,
    pub start_date: Option<Timestamp>,
    pub completion_date: Option<Timestamp>,
    pub completion_message: Option<String>,
}

impl ActionTarget {
    /// A waiting target with no progress recorded.
    #[must_use]
    pub fn new(name: impl Into<String>, guid: Guid) -> Self {
        Self {
            name: name.into(),
            guid,
            status: ActionTargetStatus::default(),
            start_date: None,
            completion_date: None,
            completion_message: None,
        }
    }
}

/// Who asked for the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSource {
    pub name: String,
    pub guid: Guid,
}

/// Everything an engine reports when it finishes an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    /// Terminal outcome; a live state here is an `InvalidParameter`.
    pub status: ActionState,
    /// Request parameters discovered during processing; merged over the
    /// originals with these winning on collision.
    pub request_parameters: ElementProperties,
    /// Guards published for follow-on steps to key off.
    pub output_guards: Vec<String>,
    /// Targets discovered during processing, handed to follow-on steps.
    pub new_action_targets: Vec<ActionTarget>,
    pub completion_message: Option<String>,
}

// =============================================================================
// ENGINE ACTION
// =============================================================================

/// One requested unit of governance work.
#[derive(Debug, Clone)]
pub struct EngineAction {
    pub guid: Guid,
    /// What kind of work was requested.
    pub request_type: String,
    pub request_parameters: ElementProperties,
    pub request_source: Option<RequestSource>,
    pub action_targets: Vec<ActionTarget>,
    /// Previous step of a process chain, for lineage. A chained step
    /// never blocks on its originator.
    pub originator: Option<Guid>,
    pub requested_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub completion_message: Option<String>,
    pub output_guards: Vec<String>,
    pub new_action_targets: Vec<ActionTarget>,
    status: CompletionCell,
}

impl EngineAction {
    fn new(
        guid: Guid,
        request_type: String,
        request_parameters: ElementProperties,
        action_targets: Vec<ActionTarget>,
        request_source: Option<RequestSource>,
        originator: Option<Guid>,
        requested_at: Timestamp,
    ) -> Self {
        Self {
            guid,
            request_type,
            request_parameters,
            request_source,
            action_targets,
            originator,
            requested_at,
            started_at: None,
            completed_at: None,
            completion_message: None,
            output_guards: Vec::new(),
            new_action_targets: Vec::new(),
            status: CompletionCell::new(ActionState::Requested),
        }
    }

    /// Current overall status.
    #[must_use]
    pub fn status(&self) -> ActionState {
        self.status.load()
    }

    /// Mark the action claimed by an engine.
    pub fn start(&mut self, now: Timestamp) {
        self.started_at = Some(now);
        self.status.publish(ActionState::Running);
    }

    /// Record the terminal outcome of the action.
    ///
    /// A live status in the record is rejected. Re-completion overwrites
    /// the stored outcome, and the previously recorded terminal status
    /// comes back so the caller can detect and handle the repeat.
    pub fn record_completion_status(
        &mut self,
        record: CompletionRecord,
        now: Timestamp,
    ) -> Result<Option<ActionState>, StratumError> {
        if !record.status.is_terminal() {
            return Err(StratumError::InvalidParameter(format!(
                "completion status must be terminal, got {:?}",
                record.status
            )));
        }
        let current = self.status.load();
        let previous = current.is_terminal().then_some(current);

        self.request_parameters.extend(record.request_parameters);
        self.output_guards = record.output_guards;
        self.new_action_targets = record.new_action_targets;
        self.completion_message = record.completion_message;
        self.completed_at = Some(now);
        // Publish last: an acquire load that sees the terminal state sees
        // all of the above.
        self.status.publish(record.status);
        Ok(previous)
    }

    /// Record per-target progress, independent of the overall status.
    pub fn update_action_target_status(
        &mut self,
        target_guid: &Guid,
        status: ActionTargetStatus,
        start_date: Option<Timestamp>,
        completion_date: Option<Timestamp>,
        completion_message: Option<String>,
    ) -> Result<(), StratumError> {
        let target = self
            .action_targets
            .iter_mut()
            .find(|t| &t.guid == target_guid)
            .ok_or_else(|| {
                StratumError::InvalidParameter(format!(
                    "action '{}' has no target '{target_guid}'",
                    self.guid
                ))
            })?;
        target.status = status;
        if start_date.is_some() {
            target.start_date = start_date;
        }
        if completion_date.is_some() {
            target.completion_date = completion_date;
        }
        if completion_message.is_some() {
            target.completion_message = completion_message;
        }
        Ok(())
    }

    /// Lock-free status handle for a supervising monitor.
    #[must_use]
    pub fn status_handle(&self) -> CompletionCell {
        self.status.clone()
    }
}

// =============================================================================
// ACTION LOG
// =============================================================================

/// A request for one action, before it has a record.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub guid: Guid,
    pub request_type: String,
    pub request_parameters: ElementProperties,
    pub action_targets: Vec<ActionTarget>,
}

/// The audit log of engine actions. Records are never deleted.
#[derive(Debug, Default)]
pub struct ActionLog {
    actions: BTreeMap<Guid, EngineAction>,
}

impl ActionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a single requested action.
    pub fn initiate_engine_action(
        &mut self,
        request: ActionRequest,
        request_source: Option<RequestSource>,
        now: Timestamp,
    ) -> Result<Guid, StratumError> {
        self.insert(request, request_source, None, now)
    }

    /// Record a chain of actions forming a governance process.
    ///
    /// Each step after the first carries the previous step's guid as its
    /// originator, giving lineage without coupling: every step is an
    /// independent record, and no step blocks on another.
    pub fn initiate_governance_action_process(
        &mut self,
        steps: Vec<ActionRequest>,
        request_source: Option<RequestSource>,
        now: Timestamp,
    ) -> Result<Vec<Guid>, StratumError> {
        if steps.is_empty() {
            return Err(StratumError::InvalidParameter(
                "governance process requires at least one step".to_string(),
            ));
        }
        let mut guids = Vec::with_capacity(steps.len());
        let mut originator: Option<Guid> = None;
        for step in steps {
            let guid = self.insert(step, request_source.clone(), originator.take(), now)?;
            originator = Some(guid.clone());
            guids.push(guid);
        }
        Ok(guids)
    }

    /// Look up an action by guid.
    #[must_use]
    pub fn action(&self, guid: &Guid) -> Option<&EngineAction> {
        self.actions.get(guid)
    }

    /// Mutable lookup, for recording progress and completion.
    #[must_use]
    pub fn action_mut(&mut self, guid: &Guid) -> Option<&mut EngineAction> {
        self.actions.get_mut(guid)
    }

    /// Lock-free status handle for the given action.
    #[must_use]
    pub fn status_handle(&self, guid: &Guid) -> Option<CompletionCell> {
        self.actions.get(guid).map(EngineAction::status_handle)
    }

    /// All actions in guid order.
    pub fn actions(&self) -> impl Iterator<Item = &EngineAction> {
        self.actions.values()
    }

    fn insert(
        &mut self,
        request: ActionRequest,
        request_source: Option<RequestSource>,
        originator: Option<Guid>,
        now: Timestamp,
    ) -> Result<Guid, StratumError> {
        if request.request_type.is_empty() {
            return Err(StratumError::InvalidParameter(
                "engine action request type must not be empty".to_string(),
            ));
        }
        if self.actions.contains_key(&request.guid) {
            return Err(StratumError::InvalidParameter(format!(
                "engine action guid '{}' already in use",
                request.guid
            )));
        }
        let guid = request.guid.clone();
        self.actions.insert(
            guid.clone(),
            EngineAction::new(
                request.guid,
                request.request_type,
                request.request_parameters,
                request.action_targets,
                request_source,
                originator,
                now,
            ),
        );
        Ok(guid)
    }
}

// =============================================================================
// TESTS
// =============================================================================
