//! # stratum-core
//!
//! The deterministic metadata lifecycle engine for Stratum - THE LOGIC.
//!
//! This crate implements the CORE engine: versioned, time-scoped,
//! ownership-scoped metadata elements, classifications, and
//! relationships, with duplicate resolution, external-identifier
//! correlation, change watching, and an engine-action completion
//! protocol.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is the ONLY place where repository state lives (stateful)
//! - Is deterministic: BTreeMap ordering everywhere, integer arithmetic
//!   only, no randomness
//! - Carries no clock: every instant is caller-supplied
//! - Never initiates interaction; only reacts to explicit operations
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod anchoring;
pub mod context;
pub mod correlation;
pub mod duplicates;
pub mod effectivity;
pub mod engine_action;
pub mod primitives;
pub mod repository;
pub mod search;
pub mod storage;
pub mod typedefs;
pub mod types;
pub mod watchdog;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Classification, ElementOrigin, ElementProperties, ElementStatus, Guid, MetadataElement,
    OriginCategory, PropertyValue, Relationship, StratumError, Timestamp,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use anchoring::{AnchorResolution, AnchorResolver};
pub use context::{
    Backend, GovernanceContext, NewElementSpec, ProvisioningCapability, RemediationCapability,
    VerificationCapability, WatchdogCapability,
};
pub use correlation::{
    Correlation, CorrelationEngine, CorrelationKey, ExternalIdentifierProperties,
};
pub use duplicates::{DuplicateEngine, DuplicateProperties};
pub use effectivity::{Effective, EffectivityWindow};
pub use engine_action::{
    ActionLog, ActionRequest, ActionState, ActionTarget, ActionTargetStatus, CompletionCell,
    CompletionRecord, EngineAction, RequestSource,
};
pub use repository::{MemoryRepository, RepositoryStore};
pub use search::{PropertyCondition, PropertyMatch, SearchSpec, SortOrder};
pub use storage::RedbRepository;
pub use typedefs::{
    ClassificationTypeDef, ElementTypeDef, PropertySchema, RelationshipTypeDef, TypeRegistry,
};
pub use watchdog::{
    ChangeEvent, ChangeEventType, ChangePayload, InterestFilter, WatchdogFilter, WatchdogListener,
};
