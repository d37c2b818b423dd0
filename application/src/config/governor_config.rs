//! Council configuration container.
//!
//! [`GovernorConfig`] groups the policy types each component needs. Use
//! cases receive only the slices they need; the council service holds the
//! whole container.
//!
//! | Type | Pool | Throttle | Consensus | Trust | Pipeline |
//! |------|------|----------|-----------|-------|----------|
//! | `SelectionSettings` | Yes | No | No | No | No |
//! | `ThrottleSettings` | No | Yes | No | No | No |
//! | `ConsensusSettings` | No | No | Yes | No | No |
//! | `TrustPolicy` | No | No | No | Yes | No |
//! | `PipelineSettings` | No | No | No | No | Yes |

use super::PipelineSettings;
use concord_domain::{
    ConsensusSettings, SelectionSettings, ThrottleSettings, TrustPolicy,
    consensus::DEFAULT_HISTORY_CAPACITY,
};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct GovernorConfig {
    pub pool: SelectionSettings,
    pub throttle: ThrottleSettings,
    pub consensus: ConsensusSettings,
    pub trust: TrustPolicy,
    pub pipeline: PipelineSettings,
    /// Decisions kept for `consensus_history`
    pub history_capacity: usize,
    /// Tick of the periodic throttle evaluator
    pub evaluation_interval: Duration,
    /// Re-dispatch non-accepted rounds while depth and call budget remain
    pub debate: bool,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            pool: SelectionSettings::default(),
            throttle: ThrottleSettings::default(),
            consensus: ConsensusSettings::default(),
            trust: TrustPolicy::default(),
            pipeline: PipelineSettings::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            evaluation_interval: Duration::from_secs(1),
            debate: true,
        }
    }
}

impl GovernorConfig {
    pub fn with_pool(mut self, pool: SelectionSettings) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_throttle(mut self, throttle: ThrottleSettings) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_consensus(mut self, consensus: ConsensusSettings) -> Self {
        self.consensus = consensus;
        self
    }

    pub fn with_trust(mut self, trust: TrustPolicy) -> Self {
        self.trust = trust;
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineSettings) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_debate(mut self, debate: bool) -> Self {
        self.debate = debate;
        self
    }

    pub fn with_evaluation_interval(mut self, interval: Duration) -> Self {
        self.evaluation_interval = interval;
        self
    }
}
