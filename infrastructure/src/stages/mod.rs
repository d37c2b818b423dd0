//! Rule-based governance stages
//!
//! Deterministic implementations of the governance stage ports. Each stage
//! is plain configuration (deserializable from the `[governance]` section)
//! plus a pure evaluation over the stage context.

mod authority;
mod conflict;
mod simulation;
mod stress;

pub use authority::PolicyAuthority;
pub use conflict::DissentConflictResolver;
pub use simulation::ConsensusRiskSimulator;
pub use stress::ConfidenceStressTest;

use concord_domain::ConsensusDecision;

/// Share of responders that dissented from the chosen output.
fn dissent_ratio(decision: &ConsensusDecision) -> f64 {
    let total = decision.response_count();
    if total == 0 {
        return 0.0;
    }
    decision.dissenting_participants.len() as f64 / total as f64
}
