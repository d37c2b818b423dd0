//! Governance domain
//!
//! Stage findings, the verdict they produce, and the trace that sequences
//! them. The async stage invocation lives in the application layer.

pub mod stage;
pub mod synthesis;
pub mod verdict;

pub use stage::{
    AuthorityDecision, AuthorityOutcome, Conflict, ConflictOutcome, GovernanceStage,
    RiskRecommendation, SimulationOutcome, StageOutcome, StressFailure, StressOutcome,
};
pub use synthesis::{PipelineTrace, SynthesisWeights};
pub use verdict::{
    GovernanceVerdict, RiskAssessment, RiskLevel, StageContribution, VerdictDecision,
};
