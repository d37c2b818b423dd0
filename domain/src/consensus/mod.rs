//! Consensus domain
//!
//! Reconciles divergent participant responses into one
//! [`ConsensusDecision`] plus the list of dissenters.

pub mod decision;
pub mod engine;
pub mod grouping;
pub mod history;
pub mod method;
pub mod response;

pub use decision::{ConsensusDecision, DecisionBand, MethodOutcome};
pub use engine::{ConsensusEngine, ConsensusSettings, GroupingStrategy};
pub use grouping::{
    ExactMatchGrouper, OutputGrouper, SimilarityGrouper, cosine_similarity, jaccard_similarity,
    normalize_output,
};
pub use history::{ConsensusHistory, DEFAULT_HISTORY_CAPACITY};
pub use method::{ConsensusMethod, WeightStrategy};
pub use response::{Response, sort_responses};
