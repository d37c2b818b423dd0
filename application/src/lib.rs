//! Application layer for concord
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{GovernorConfig, PipelineSettings};
pub use ports::{
    audit_logger::{AuditEvent, AuditLogger, NoAuditLogger},
    governance_stages::{
        AuthorityCheck, ConflictResolver, Simulator, StageContext, StageError, StressTester,
    },
    participant_backend::{BackendError, ParticipantBackend, ParticipantReply},
    progress::{CallOutcome, NoProgress, ProgressNotifier},
    state_store::{InMemoryStateStore, StateStore, StateStoreError},
};
pub use use_cases::council_state::CouncilState;
pub use use_cases::dispatch::{DispatchError, DispatchLimits, DispatchReport, FanOutDispatcher};
pub use use_cases::governance_pipeline::{GovernancePipeline, GovernanceStages};
pub use use_cases::submit_task::{
    ParticipantFailure, SubmitTaskError, SubmitTaskInput, SubmitTaskUseCase, TaskReport,
};
pub use use_cases::throttle_evaluator::ThrottleEvaluator;
