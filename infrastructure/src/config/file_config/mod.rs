//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod consensus;
mod governance;
mod logging;
mod output;
mod participants;
mod persistence;
mod pool;
mod throttle;
mod validation;

pub use consensus::FileConsensusConfig;
pub use governance::FileGovernanceConfig;
pub use logging::FileLoggingConfig;
pub use output::{FileOutputConfig, FileOutputFormat};
pub use participants::{FileBackendKind, FileParticipantConfig, build_backend};
pub use persistence::FilePersistenceConfig;
pub use pool::FilePoolConfig;
pub use throttle::{FilePoliciesConfig, FileThrottleConfig};
pub use validation::{ConfigIssue, ConfigIssueCode, ConfigValidationError, Severity};

use concord_application::GovernorConfig;
use concord_domain::TrustPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Participant selection
    pub pool: FilePoolConfig,
    /// Load throttle modes, ceilings and trend thresholds
    pub throttle: FileThrottleConfig,
    /// Aggregation methods and decision bands
    pub consensus: FileConsensusConfig,
    /// Trust feedback deltas
    pub trust: TrustPolicy,
    /// Governance stages and their rules
    pub governance: FileGovernanceConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Diagnostic log and audit trail destinations
    pub logging: FileLoggingConfig,
    /// State file for trust and load history
    pub persistence: FilePersistenceConfig,
    /// Registered participants
    pub participants: Vec<FileParticipantConfig>,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        self.pool.validate(&mut issues);
        self.throttle.validate(&mut issues);
        self.consensus.validate(&mut issues);
        self.governance.validate(&mut issues);
        participants::validate(&self.participants, &mut issues);

        let trust = &self.trust;
        for (field, value) in [
            ("trust.agree_delta", trust.agree_delta),
            ("trust.dissent_delta", trust.dissent_delta),
            ("trust.high_agreement", trust.high_agreement),
            ("trust.low_agreement", trust.low_agreement),
            ("trust.agreement_adjustment", trust.agreement_adjustment),
        ] {
            validation::check_unit(field, value, &mut issues);
        }

        if self.participants.is_empty() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "participants".to_string(),
                },
                "no [[participants]] configured; every task will be rejected",
            ));
        }
        issues
    }

    /// Fail on any error-level issue; otherwise return the warnings.
    pub fn ensure_valid(&self) -> Result<Vec<ConfigIssue>, ConfigValidationError> {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            self.validate().into_iter().partition(|i| i.is_error());
        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(ConfigValidationError::Invalid(errors))
        }
    }

    /// Convert into the application-side configuration container.
    pub fn to_governor_config(&self) -> GovernorConfig {
        GovernorConfig {
            pool: self.pool.to_selection_settings(),
            throttle: self.throttle.to_throttle_settings(),
            consensus: self.consensus.to_consensus_settings(),
            trust: self.trust,
            pipeline: self.governance.to_pipeline_settings(),
            history_capacity: self.consensus.history_capacity,
            evaluation_interval: Duration::from_millis(self.throttle.evaluation_interval_ms),
            debate: self.consensus.debate,
        }
    }
}
