//! Domain layer for concord
//!
//! This crate contains the core rules of the council: who may vote, how
//! much effort a task may spend, how divergent answers become one decision,
//! and how that decision is staged through governance. It is synchronous
//! and has no dependencies on infrastructure or presentation concerns; all
//! time is passed in as epoch milliseconds.
//!
//! # Core Concepts
//!
//! - **Participant Pool**: registry of voting participants with trust weight,
//!   capability tags and liveness
//! - **Load Throttle**: a `minimal < standard < deep < swarm` state machine
//!   bounding participant count, debate depth, call budget and timeout
//! - **Consensus**: five aggregation methods over one weighted tally, chosen
//!   by fixed priority
//! - **Trust Feedback**: agreement and dissent nudge trust weights
//! - **Governance**: authority, simulation, stress test and conflict
//!   resolution stages with early exit and a final synthesis

pub mod config;
pub mod consensus;
pub mod core;
pub mod governance;
pub mod participant;
pub mod persistence;
pub mod task;
pub mod throttle;
pub mod trust;
pub mod util;

// Re-export commonly used types
pub use config::OutputFormat;
pub use consensus::{
    ConsensusDecision, ConsensusEngine, ConsensusHistory, ConsensusMethod, ConsensusSettings,
    DecisionBand, GroupingStrategy, MethodOutcome, OutputGrouper, Response, SimilarityGrouper,
    WeightStrategy,
};
pub use core::{
    error::DomainError,
    ids::{ParticipantId, TaskId},
};
pub use governance::{
    AuthorityDecision, AuthorityOutcome, Conflict, ConflictOutcome, GovernanceStage,
    GovernanceVerdict, PipelineTrace, RiskAssessment, RiskLevel, RiskRecommendation,
    SimulationOutcome, StageOutcome, StressFailure, StressOutcome, SynthesisWeights,
    VerdictDecision,
};
pub use participant::{Participant, ParticipantPool, ParticipantStatus, SelectionSettings};
pub use persistence::PersistedState;
pub use task::{PeerOutput, Task, TaskHints, TaskPriority};
pub use throttle::{
    LoadCeilings, LoadDimension, LoadMetrics, LoadSample, LoadThrottleController, ModePolicies,
    ModePolicy, ModeTransition, ThrottleMode, ThrottleSettings, TransitionTrigger,
};
pub use trust::{ParticipantStats, TrustAdjustment, TrustLedger, TrustPolicy, TrustRecord};
