//! Throttle modes and their fixed resource policies.
//!
//! [`ThrottleMode`] is a totally ordered effort tier:
//!
//! ```text
//! minimal < standard < deep < swarm
//! ```
//!
//! Each tier maps to a [`ModePolicy`] bounding how many participants a task
//! may consult, how many debate rounds it may run, how many backend calls it
//! may issue in total, and how long each call may take.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Resource-budget tier for a task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ThrottleMode {
    Minimal,
    #[default]
    Standard,
    Deep,
    Swarm,
}

impl ThrottleMode {
    /// All modes in ascending effort order.
    pub const ALL: [ThrottleMode; 4] = [
        ThrottleMode::Minimal,
        ThrottleMode::Standard,
        ThrottleMode::Deep,
        ThrottleMode::Swarm,
    ];

    /// One level more effort, `None` at the top.
    pub fn higher(&self) -> Option<ThrottleMode> {
        match self {
            ThrottleMode::Minimal => Some(ThrottleMode::Standard),
            ThrottleMode::Standard => Some(ThrottleMode::Deep),
            ThrottleMode::Deep => Some(ThrottleMode::Swarm),
            ThrottleMode::Swarm => None,
        }
    }

    /// One level less effort, `None` at the bottom.
    pub fn lower(&self) -> Option<ThrottleMode> {
        match self {
            ThrottleMode::Minimal => None,
            ThrottleMode::Standard => Some(ThrottleMode::Minimal),
            ThrottleMode::Deep => Some(ThrottleMode::Standard),
            ThrottleMode::Swarm => Some(ThrottleMode::Deep),
        }
    }

    /// Number of levels between two modes.
    pub fn distance(&self, other: ThrottleMode) -> usize {
        (*self as i32 - other as i32).unsigned_abs() as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThrottleMode::Minimal => "minimal",
            ThrottleMode::Standard => "standard",
            ThrottleMode::Deep => "deep",
            ThrottleMode::Swarm => "swarm",
        }
    }
}

impl fmt::Display for ThrottleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ThrottleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minimal" | "min" => Ok(ThrottleMode::Minimal),
            "standard" | "std" => Ok(ThrottleMode::Standard),
            "deep" => Ok(ThrottleMode::Deep),
            "swarm" => Ok(ThrottleMode::Swarm),
            _ => Err(format!(
                "Invalid throttle mode: {}. Valid: minimal, standard, deep, swarm",
                s
            )),
        }
    }
}

/// Resource bounds applied to one task under a given mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModePolicy {
    /// Maximum participants consulted per round
    pub max_participants: usize,
    /// Maximum debate rounds
    pub max_depth: u32,
    /// Maximum backend calls across all rounds
    pub max_calls: usize,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
}

impl ModePolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Built-in policy for a mode.
    pub fn default_for(mode: ThrottleMode) -> Self {
        match mode {
            ThrottleMode::Minimal => Self {
                max_participants: 1,
                max_depth: 1,
                max_calls: 2,
                timeout_ms: 5_000,
            },
            ThrottleMode::Standard => Self {
                max_participants: 3,
                max_depth: 2,
                max_calls: 6,
                timeout_ms: 15_000,
            },
            ThrottleMode::Deep => Self {
                max_participants: 5,
                max_depth: 3,
                max_calls: 15,
                timeout_ms: 30_000,
            },
            ThrottleMode::Swarm => Self {
                max_participants: 9,
                max_depth: 4,
                max_calls: 36,
                timeout_ms: 60_000,
            },
        }
    }
}

/// The fixed mode → policy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModePolicies {
    pub minimal: ModePolicy,
    pub standard: ModePolicy,
    pub deep: ModePolicy,
    pub swarm: ModePolicy,
}

impl ModePolicies {
    pub fn get(&self, mode: ThrottleMode) -> &ModePolicy {
        match mode {
            ThrottleMode::Minimal => &self.minimal,
            ThrottleMode::Standard => &self.standard,
            ThrottleMode::Deep => &self.deep,
            ThrottleMode::Swarm => &self.swarm,
        }
    }

    pub fn set(&mut self, mode: ThrottleMode, policy: ModePolicy) {
        match mode {
            ThrottleMode::Minimal => self.minimal = policy,
            ThrottleMode::Standard => self.standard = policy,
            ThrottleMode::Deep => self.deep = policy,
            ThrottleMode::Swarm => self.swarm = policy,
        }
    }
}

impl Default for ModePolicies {
    fn default() -> Self {
        Self {
            minimal: ModePolicy::default_for(ThrottleMode::Minimal),
            standard: ModePolicy::default_for(ThrottleMode::Standard),
            deep: ModePolicy::default_for(ThrottleMode::Deep),
            swarm: ModePolicy::default_for(ThrottleMode::Swarm),
        }
    }
}
