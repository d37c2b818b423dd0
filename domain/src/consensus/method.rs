//! Consensus aggregation methods.
//!
//! All five methods share one weighted tally; they differ only in how a
//! response's weight is extracted ([`WeightStrategy`]) and, for unanimous,
//! in the genuineness check.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a response's weight is extracted for the tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightStrategy {
    /// Every response weighs 1
    Uniform,
    /// The participant's trust weight
    Trust,
    /// The response's self-reported confidence
    Confidence,
}

impl WeightStrategy {
    pub fn weight(&self, trust: f64, confidence: f64) -> f64 {
        match self {
            WeightStrategy::Uniform => 1.0,
            WeightStrategy::Trust => trust,
            WeightStrategy::Confidence => confidence,
        }
    }
}

/// Consensus method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusMethod {
    Majority,
    Weighted,
    ConfidenceWeighted,
    TrustWeighted,
    Unanimous,
}

impl ConsensusMethod {
    /// Methods in selection priority order (first genuine result wins).
    pub const PRIORITY: [ConsensusMethod; 5] = [
        ConsensusMethod::Unanimous,
        ConsensusMethod::TrustWeighted,
        ConsensusMethod::ConfidenceWeighted,
        ConsensusMethod::Weighted,
        ConsensusMethod::Majority,
    ];

    /// Position in [`Self::PRIORITY`]; lower wins.
    pub fn priority(&self) -> usize {
        match self {
            ConsensusMethod::Unanimous => 0,
            ConsensusMethod::TrustWeighted => 1,
            ConsensusMethod::ConfidenceWeighted => 2,
            ConsensusMethod::Weighted => 3,
            ConsensusMethod::Majority => 4,
        }
    }

    pub fn weight_strategy(&self) -> WeightStrategy {
        match self {
            ConsensusMethod::Majority => WeightStrategy::Uniform,
            ConsensusMethod::Weighted | ConsensusMethod::TrustWeighted => WeightStrategy::Trust,
            ConsensusMethod::ConfidenceWeighted => WeightStrategy::Confidence,
            // Its fallback is the trust-weighted tally
            ConsensusMethod::Unanimous => WeightStrategy::Trust,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusMethod::Majority => "majority",
            ConsensusMethod::Weighted => "weighted",
            ConsensusMethod::ConfidenceWeighted => "confidence_weighted",
            ConsensusMethod::TrustWeighted => "trust_weighted",
            ConsensusMethod::Unanimous => "unanimous",
        }
    }
}

impl fmt::Display for ConsensusMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConsensusMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "majority" => Ok(ConsensusMethod::Majority),
            "weighted" => Ok(ConsensusMethod::Weighted),
            "confidence_weighted" | "confidence" => Ok(ConsensusMethod::ConfidenceWeighted),
            "trust_weighted" | "trust" => Ok(ConsensusMethod::TrustWeighted),
            "unanimous" => Ok(ConsensusMethod::Unanimous),
            _ => Err(format!(
                "Unknown consensus method: {}. Valid: majority, weighted, confidence_weighted, trust_weighted, unanimous",
                s
            )),
        }
    }
}
