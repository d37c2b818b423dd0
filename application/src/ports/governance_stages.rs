//! Governance stage ports
//!
//! One trait per pipeline stage. Stage implementations may be rule-based,
//! model-backed or human-in-the-loop; the pipeline only sees their findings.

use async_trait::async_trait;
use concord_domain::{
    AuthorityOutcome, ConflictOutcome, ConsensusDecision, Response, SimulationOutcome,
    StageOutcome, StressOutcome, Task,
};
use thiserror::Error;

/// A stage could not evaluate. The pipeline treats this as fail-closed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("Evaluation failed: {0}")]
    Failed(String),

    #[error("Stage timed out after {0} ms")]
    Timeout(u64),

    #[error("Stage unavailable: {0}")]
    Unavailable(String),
}

/// Everything a stage may inspect.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub task: &'a Task,
    pub decision: &'a ConsensusDecision,
    /// Responses of the final round, sorted by participant id
    pub responses: &'a [Response],
    /// Findings of the stages that already ran
    pub prior: &'a [StageOutcome],
}

#[async_trait]
pub trait AuthorityCheck: Send + Sync {
    async fn check(&self, ctx: &StageContext<'_>) -> Result<AuthorityOutcome, StageError>;
}

#[async_trait]
pub trait Simulator: Send + Sync {
    async fn simulate(&self, ctx: &StageContext<'_>) -> Result<SimulationOutcome, StageError>;
}

#[async_trait]
pub trait StressTester: Send + Sync {
    async fn stress_test(&self, ctx: &StageContext<'_>) -> Result<StressOutcome, StageError>;
}

#[async_trait]
pub trait ConflictResolver: Send + Sync {
    async fn resolve(&self, ctx: &StageContext<'_>) -> Result<ConflictOutcome, StageError>;
}
