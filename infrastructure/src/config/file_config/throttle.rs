//! Load throttle configuration (`[throttle]` section)
//!
//! ```toml
//! [throttle]
//! initial_mode = "standard"
//! window = 10
//! escalate_below = 0.5
//! downgrade_above = 0.8
//! evaluation_interval_ms = 1000
//!
//! [throttle.ceilings]
//! latency_ms = 20000
//!
//! [throttle.policies.standard]
//! max_participants = 5
//! max_depth = 2
//! max_calls = 10
//! timeout_ms = 15000
//! ```

use super::validation::{ConfigIssue, ConfigIssueCode, check_nonzero, check_unit, invalid_enum};
use concord_domain::{LoadCeilings, ModePolicy, ThrottleMode, ThrottleSettings};
use serde::{Deserialize, Serialize};

const MODES: [&str; 4] = ["minimal", "standard", "deep", "swarm"];

/// Policy overrides per mode; absent modes keep their built-in policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePoliciesConfig {
    pub minimal: Option<ModePolicy>,
    pub standard: Option<ModePolicy>,
    pub deep: Option<ModePolicy>,
    pub swarm: Option<ModePolicy>,
}

impl FilePoliciesConfig {
    fn entries(&self) -> [(ThrottleMode, Option<&ModePolicy>); 4] {
        [
            (ThrottleMode::Minimal, self.minimal.as_ref()),
            (ThrottleMode::Standard, self.standard.as_ref()),
            (ThrottleMode::Deep, self.deep.as_ref()),
            (ThrottleMode::Swarm, self.swarm.as_ref()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileThrottleConfig {
    pub initial_mode: String,
    /// Samples averaged by the trend evaluation
    pub window: usize,
    pub history_capacity: usize,
    pub escalate_below: f64,
    pub downgrade_above: f64,
    /// Highest mode automatic escalation may reach
    pub escalation_ceiling: String,
    pub evaluation_interval_ms: u64,
    pub ceilings: LoadCeilings,
    pub policies: FilePoliciesConfig,
}

impl Default for FileThrottleConfig {
    fn default() -> Self {
        let defaults = ThrottleSettings::default();
        Self {
            initial_mode: defaults.initial_mode.to_string(),
            window: defaults.window,
            history_capacity: defaults.history_capacity,
            escalate_below: defaults.escalate_below,
            downgrade_above: defaults.downgrade_above,
            escalation_ceiling: defaults.escalation_ceiling.to_string(),
            evaluation_interval_ms: 1_000,
            ceilings: defaults.ceilings,
            policies: FilePoliciesConfig::default(),
        }
    }
}

impl FileThrottleConfig {
    pub fn parse_initial_mode(&self) -> Option<ThrottleMode> {
        self.initial_mode.parse().ok()
    }

    pub fn parse_escalation_ceiling(&self) -> Option<ThrottleMode> {
        self.escalation_ceiling.parse().ok()
    }

    /// Unparseable modes fall back to the built-in defaults.
    pub fn to_throttle_settings(&self) -> ThrottleSettings {
        let defaults = ThrottleSettings::default();
        let mut policies = defaults.policies.clone();
        for (mode, policy) in self.policies.entries() {
            if let Some(policy) = policy {
                policies.set(mode, *policy);
            }
        }
        ThrottleSettings {
            initial_mode: self.parse_initial_mode().unwrap_or(defaults.initial_mode),
            policies,
            ceilings: self.ceilings,
            history_capacity: self.history_capacity.max(self.window),
            window: self.window,
            escalate_below: self.escalate_below,
            downgrade_above: self.downgrade_above,
            escalation_ceiling: self
                .parse_escalation_ceiling()
                .unwrap_or(defaults.escalation_ceiling),
            transition_log_capacity: defaults.transition_log_capacity,
        }
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        if self.parse_initial_mode().is_none() {
            issues.push(invalid_enum("throttle.initial_mode", &self.initial_mode, &MODES));
        }
        if self.parse_escalation_ceiling().is_none() {
            issues.push(invalid_enum(
                "throttle.escalation_ceiling",
                &self.escalation_ceiling,
                &MODES,
            ));
        }
        if self.window == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::OutOfRange {
                    field: "throttle.window".to_string(),
                },
                "throttle.window must be at least 1",
            ));
        }
        check_unit("throttle.escalate_below", self.escalate_below, issues);
        check_unit("throttle.downgrade_above", self.downgrade_above, issues);
        if self.escalate_below >= self.downgrade_above {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ThresholdOrder,
                "throttle.escalate_below must be below throttle.downgrade_above",
            ));
        }
        check_nonzero("throttle.evaluation_interval_ms", self.evaluation_interval_ms, issues);

        for (mode, policy) in self.policies.entries() {
            let Some(policy) = policy else { continue };
            let field = format!("throttle.policies.{}.timeout_ms", mode);
            check_nonzero(&field, policy.timeout_ms, issues);
            if policy.max_participants == 0 || policy.max_calls == 0 || policy.max_depth == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::OutOfRange {
                        field: format!("throttle.policies.{}", mode),
                    },
                    format!(
                        "throttle.policies.{}: max_participants, max_depth and max_calls must be at least 1",
                        mode
                    ),
                ));
            }
        }
    }
}
