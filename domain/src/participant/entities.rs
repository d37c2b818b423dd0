//! Participant entity

use crate::core::ids::ParticipantId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest trust weight a participant can hold.
pub const TRUST_MIN: f64 = 0.1;
/// Highest trust weight a participant can hold.
pub const TRUST_MAX: f64 = 1.0;
/// Trust weight given to newly registered participants unless specified.
pub const TRUST_DEFAULT: f64 = 0.5;

/// Clamp a trust weight into `[TRUST_MIN, TRUST_MAX]`.
///
/// Out-of-range adjustments are clamped rather than rejected; NaN falls back
/// to the minimum.
pub fn clamp_trust(weight: f64) -> f64 {
    if weight.is_nan() {
        TRUST_MIN
    } else {
        weight.clamp(TRUST_MIN, TRUST_MAX)
    }
}

/// Liveness status of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    #[default]
    Online,
    /// Reachable but misbehaving; still selectable
    Degraded,
    /// Never selected
    Offline,
}

impl ParticipantStatus {
    pub fn is_selectable(&self) -> bool {
        !matches!(self, ParticipantStatus::Offline)
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantStatus::Online => write!(f, "online"),
            ParticipantStatus::Degraded => write!(f, "degraded"),
            ParticipantStatus::Offline => write!(f, "offline"),
        }
    }
}

/// An independent reasoning unit that votes on tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub capabilities: Vec<String>,
    trust_weight: f64,
    /// Last time the participant was seen alive (ms since epoch)
    pub last_seen: u64,
    pub status: ParticipantStatus,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>) -> Self {
        Self {
            id: id.into(),
            capabilities: Vec::new(),
            trust_weight: TRUST_DEFAULT,
            last_seen: 0,
            status: ParticipantStatus::Online,
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        let capability = capability.into();
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for capability in capabilities {
            self = self.with_capability(capability);
        }
        self
    }

    pub fn with_trust(mut self, weight: f64) -> Self {
        self.trust_weight = clamp_trust(weight);
        self
    }

    pub fn with_last_seen(mut self, timestamp: u64) -> Self {
        self.last_seen = timestamp;
        self
    }

    pub fn trust_weight(&self) -> f64 {
        self.trust_weight
    }

    /// Apply a trust delta, clamping the result. Returns the new weight.
    pub(crate) fn adjust_trust(&mut self, delta: f64) -> f64 {
        self.trust_weight = clamp_trust(self.trust_weight + delta);
        self.trust_weight
    }

    pub(crate) fn set_trust(&mut self, weight: f64) {
        self.trust_weight = clamp_trust(weight);
    }

    pub fn has_capabilities(&self, required: &[String]) -> bool {
        required.iter().all(|r| self.capabilities.contains(r))
    }

    /// Seen within `window_ms` of `now_ms`.
    pub fn is_fresh(&self, now_ms: u64, window_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_seen) <= window_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_is_clamped_on_construction() {
        assert_eq!(Participant::new("a").with_trust(3.0).trust_weight(), TRUST_MAX);
        assert_eq!(Participant::new("a").with_trust(-1.0).trust_weight(), TRUST_MIN);
        assert_eq!(Participant::new("a").with_trust(f64::NAN).trust_weight(), TRUST_MIN);
    }

    #[test]
    fn test_adjust_trust_clamps() {
        let mut p = Participant::new("a").with_trust(0.95);
        assert_eq!(p.adjust_trust(0.2), TRUST_MAX);
        let mut q = Participant::new("b").with_trust(0.12);
        assert_eq!(q.adjust_trust(-0.5), TRUST_MIN);
    }

    #[test]
    fn test_capability_matching() {
        let p = Participant::new("a").with_capabilities(["code", "review", "code"]);
        assert_eq!(p.capabilities.len(), 2);
        assert!(p.has_capabilities(&["code".to_string()]));
        assert!(p.has_capabilities(&[]));
        assert!(!p.has_capabilities(&["audio".to_string()]));
    }

    #[test]
    fn test_freshness() {
        let p = Participant::new("a").with_last_seen(1_000);
        assert!(p.is_fresh(61_000, 60_000));
        assert!(!p.is_fresh(61_001, 60_000));
    }

    #[test]
    fn test_offline_is_not_selectable() {
        assert!(ParticipantStatus::Online.is_selectable());
        assert!(ParticipantStatus::Degraded.is_selectable());
        assert!(!ParticipantStatus::Offline.is_selectable());
    }
}
