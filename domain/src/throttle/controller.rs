//! Load throttle controller state machine.
//!
//! ```text
//!            escalate (trend < 50% on all)          escalate
//!   minimal ───────────────▶ standard ───────────▶ deep ───────────▶ swarm
//!           ◀───────────────          ◀───────────      ◀───────────
//!            downgrade (ceiling hit, or trend > 80% on any)
//! ```
//!
//! Automatic transitions (ceiling breach on [`LoadThrottleController::record_sample`],
//! trend evaluation on [`LoadThrottleController::evaluate`]) move exactly one
//! level. Only [`LoadThrottleController::set_mode`] may skip levels.
//!
//! Trend evaluation only judges samples recorded since the last transition
//! and waits until a full window of them exists, so one stretch of load
//! moves the mode at most one level.
//!
//! The controller is a plain value; the application layer owns it behind a
//! single-writer lock.

use super::mode::{ModePolicies, ModePolicy, ThrottleMode};
use super::sample::{LoadCeilings, LoadDimension, LoadHistory, LoadSample};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// What caused a mode transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTrigger {
    /// A single sample exceeded a ceiling
    Ceiling,
    /// Periodic trend evaluation over the trailing window
    Trend,
    /// Operator override via `set_mode`
    Manual,
}

impl fmt::Display for TransitionTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionTrigger::Ceiling => write!(f, "ceiling"),
            TransitionTrigger::Trend => write!(f, "trend"),
            TransitionTrigger::Manual => write!(f, "manual"),
        }
    }
}

/// Audit record of a mode change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeTransition {
    pub from: ThrottleMode,
    pub to: ThrottleMode,
    pub trigger: TransitionTrigger,
    pub reason: String,
    pub load_snapshot: Option<LoadSample>,
    pub timestamp: u64,
}

impl ModeTransition {
    pub fn is_automatic(&self) -> bool {
        self.trigger != TransitionTrigger::Manual
    }
}

/// Tunables for the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrottleSettings {
    pub initial_mode: ThrottleMode,
    pub policies: ModePolicies,
    pub ceilings: LoadCeilings,
    /// Ring buffer size for load samples
    pub history_capacity: usize,
    /// Trailing samples inspected per evaluation
    pub window: usize,
    /// Escalate when the window average is below this fraction on every dimension
    pub escalate_below: f64,
    /// Downgrade when the window average is above this fraction on any dimension
    pub downgrade_above: f64,
    /// Highest mode automatic escalation may reach
    pub escalation_ceiling: ThrottleMode,
    /// Bounded transition audit log
    pub transition_log_capacity: usize,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            initial_mode: ThrottleMode::Standard,
            policies: ModePolicies::default(),
            ceilings: LoadCeilings::default(),
            history_capacity: 100,
            window: 10,
            escalate_below: 0.5,
            downgrade_above: 0.8,
            escalation_ceiling: ThrottleMode::Swarm,
            transition_log_capacity: 100,
        }
    }
}

/// Average and utilization of one dimension over the evaluation window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionUtilization {
    pub dimension: LoadDimension,
    pub average: f64,
    pub ceiling: f64,
    pub utilization: f64,
}

/// Observability snapshot of the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadMetrics {
    pub mode: ThrottleMode,
    pub policy: ModePolicy,
    pub sample_count: usize,
    pub window: usize,
    pub utilization: Vec<DimensionUtilization>,
    pub latest_sample: Option<LoadSample>,
    pub recent_transitions: Vec<ModeTransition>,
}

/// Resource-budget state machine.
#[derive(Debug, Clone)]
pub struct LoadThrottleController {
    mode: ThrottleMode,
    settings: ThrottleSettings,
    history: LoadHistory,
    /// Samples recorded since the last transition
    fresh_samples: usize,
    transitions: VecDeque<ModeTransition>,
}

impl LoadThrottleController {
    pub fn new(settings: ThrottleSettings) -> Self {
        Self {
            mode: settings.initial_mode,
            history: LoadHistory::new(settings.history_capacity),
            fresh_samples: 0,
            transitions: VecDeque::new(),
            settings,
        }
    }

    pub fn current_mode(&self) -> ThrottleMode {
        self.mode
    }

    pub fn current_policy(&self) -> ModePolicy {
        *self.settings.policies.get(self.mode)
    }

    pub fn policy_for(&self, mode: ThrottleMode) -> ModePolicy {
        *self.settings.policies.get(mode)
    }

    pub fn settings(&self) -> &ThrottleSettings {
        &self.settings
    }

    pub fn history(&self) -> &LoadHistory {
        &self.history
    }

    pub fn transitions(&self) -> impl Iterator<Item = &ModeTransition> {
        self.transitions.iter()
    }

    /// Append a sample; downgrade one level immediately if any ceiling is exceeded.
    pub fn record_sample(&mut self, sample: LoadSample) -> Option<ModeTransition> {
        self.history.push(sample);
        self.fresh_samples = self.fresh_samples.saturating_add(1);

        let exceeded = self.settings.ceilings.exceeded(&sample);
        if exceeded.is_empty() {
            return None;
        }

        let names: Vec<&str> = exceeded.iter().map(|d| d.as_str()).collect();
        self.downgrade(
            TransitionTrigger::Ceiling,
            format!("ceiling exceeded: {}", names.join(", ")),
            Some(sample),
            sample.timestamp,
        )
    }

    /// Inspect the trailing window and move at most one level.
    ///
    /// Holds until `window` samples have arrived since the last transition.
    pub fn evaluate(&mut self, now_ms: u64) -> Option<ModeTransition> {
        if self.fresh_samples < self.settings.window.max(1) {
            return None;
        }
        let average = self.history.window_average(self.settings.window)?;
        let ceilings = self.settings.ceilings;

        let hot: Vec<&str> = LoadDimension::ALL
            .iter()
            .filter(|d| {
                ceilings.utilization(**d, average.value(**d)) > self.settings.downgrade_above
            })
            .map(|d| d.as_str())
            .collect();

        if !hot.is_empty() {
            return self.downgrade(
                TransitionTrigger::Trend,
                format!(
                    "window average above {:.0}% of ceiling: {}",
                    self.settings.downgrade_above * 100.0,
                    hot.join(", ")
                ),
                Some(average),
                now_ms,
            );
        }

        let all_cool = LoadDimension::ALL.iter().all(|d| {
            ceilings.utilization(*d, average.value(*d)) < self.settings.escalate_below
        });

        if all_cool {
            return self.escalate(
                format!(
                    "window average below {:.0}% of ceiling on all dimensions",
                    self.settings.escalate_below * 100.0
                ),
                Some(average),
                now_ms,
            );
        }

        None
    }

    /// Per-task mode override. Never changes the persisted mode.
    ///
    /// - `safety_level > 0.8` → swarm
    /// - `confidence < 0.7` or `complexity > 0.6` → deep
    /// - otherwise the current trend-based mode
    pub fn select_mode_for_task(
        &self,
        confidence: f64,
        safety_level: f64,
        complexity: f64,
    ) -> ThrottleMode {
        select_mode_for_task(self.mode, confidence, safety_level, complexity)
    }

    /// Manual override. Always accepted, always recorded, may skip levels.
    pub fn set_mode(
        &mut self,
        mode: ThrottleMode,
        reason: impl Into<String>,
        now_ms: u64,
    ) -> ModeTransition {
        let snapshot = self.history.latest().copied();
        self.transition(
            mode,
            TransitionTrigger::Manual,
            reason.into(),
            snapshot,
            now_ms,
        )
    }

    /// Snapshot for observability.
    pub fn metrics(&self) -> LoadMetrics {
        let average = self.history.window_average(self.settings.window);
        let ceilings = self.settings.ceilings;
        let utilization = LoadDimension::ALL
            .iter()
            .map(|d| {
                let avg = average.map(|a| a.value(*d)).unwrap_or(0.0);
                DimensionUtilization {
                    dimension: *d,
                    average: avg,
                    ceiling: ceilings.ceiling(*d),
                    utilization: ceilings.utilization(*d, avg),
                }
            })
            .collect();

        LoadMetrics {
            mode: self.mode,
            policy: self.current_policy(),
            sample_count: self.history.len(),
            window: self.settings.window,
            utilization,
            latest_sample: self.history.latest().copied(),
            recent_transitions: self.transitions.iter().rev().take(10).cloned().collect(),
        }
    }

    /// Replace the sample history with persisted samples. They count as
    /// unjudged, since the mode itself is not persisted.
    pub fn restore_history(&mut self, samples: impl IntoIterator<Item = LoadSample>) {
        self.history.restore(samples);
        self.fresh_samples = self.history.len();
    }

    fn downgrade(
        &mut self,
        trigger: TransitionTrigger,
        reason: String,
        snapshot: Option<LoadSample>,
        now_ms: u64,
    ) -> Option<ModeTransition> {
        let target = self.mode.lower()?;
        Some(self.transition(target, trigger, reason, snapshot, now_ms))
    }

    fn escalate(
        &mut self,
        reason: String,
        snapshot: Option<LoadSample>,
        now_ms: u64,
    ) -> Option<ModeTransition> {
        let target = self.mode.higher()?;
        if target > self.settings.escalation_ceiling {
            return None;
        }
        Some(self.transition(target, TransitionTrigger::Trend, reason, snapshot, now_ms))
    }

    fn transition(
        &mut self,
        to: ThrottleMode,
        trigger: TransitionTrigger,
        reason: String,
        load_snapshot: Option<LoadSample>,
        timestamp: u64,
    ) -> ModeTransition {
        let record = ModeTransition {
            from: self.mode,
            to,
            trigger,
            reason,
            load_snapshot,
            timestamp,
        };
        self.mode = to;
        self.fresh_samples = 0;

        if self.transitions.len() >= self.settings.transition_log_capacity.max(1) {
            self.transitions.pop_front();
        }
        self.transitions.push_back(record.clone());
        record
    }
}

impl Default for LoadThrottleController {
    fn default() -> Self {
        Self::new(ThrottleSettings::default())
    }
}

/// Deterministic per-task mode selection (see [`LoadThrottleController::select_mode_for_task`]).
pub fn select_mode_for_task(
    trend_mode: ThrottleMode,
    confidence: f64,
    safety_level: f64,
    complexity: f64,
) -> ThrottleMode {
    if safety_level > 0.8 {
        ThrottleMode::Swarm
    } else if confidence < 0.7 || complexity > 0.6 {
        ThrottleMode::Deep
    } else {
        trend_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_latency_ceiling(ceiling: f64) -> ThrottleSettings {
        ThrottleSettings {
            ceilings: LoadCeilings {
                latency_ms: ceiling,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn latency_sample(ms: f64, ts: u64) -> LoadSample {
        LoadSample {
            latency_ms: ms,
            timestamp: ts,
            ..Default::default()
        }
    }

    #[test]
    fn test_ceiling_breach_downgrades_one_level() {
        let mut controller = LoadThrottleController::new(ThrottleSettings {
            initial_mode: ThrottleMode::Swarm,
            ..settings_with_latency_ceiling(1_000.0)
        });

        let transition = controller.record_sample(latency_sample(1_500.0, 1)).unwrap();
        assert_eq!(transition.from, ThrottleMode::Swarm);
        assert_eq!(transition.to, ThrottleMode::Deep);
        assert_eq!(transition.trigger, TransitionTrigger::Ceiling);
        assert!(transition.reason.contains("latency"));
        assert_eq!(controller.current_mode(), ThrottleMode::Deep);
    }

    #[test]
    fn test_sample_below_ceiling_keeps_mode() {
        let mut controller = LoadThrottleController::new(settings_with_latency_ceiling(1_000.0));
        assert!(controller.record_sample(latency_sample(950.0, 1)).is_none());
        assert_eq!(controller.current_mode(), ThrottleMode::Standard);
    }

    #[test]
    fn test_sustained_95_percent_latency_downgrades_exactly_once_per_cycle() {
        let mut controller = LoadThrottleController::new(ThrottleSettings {
            initial_mode: ThrottleMode::Swarm,
            ..settings_with_latency_ceiling(1_000.0)
        });

        for tick in 0..10 {
            assert!(controller.record_sample(latency_sample(950.0, tick)).is_none());
        }

        let transition = controller.evaluate(10).unwrap();
        assert_eq!(transition.from, ThrottleMode::Swarm);
        assert_eq!(transition.to, ThrottleMode::Deep);
        assert_eq!(transition.trigger, TransitionTrigger::Trend);
        assert_eq!(controller.current_mode(), ThrottleMode::Deep);
        assert_eq!(controller.transitions().count(), 1);
    }

    #[test]
    fn test_trend_waits_for_a_fresh_window_after_transition() {
        let mut controller = LoadThrottleController::new(ThrottleSettings {
            initial_mode: ThrottleMode::Swarm,
            ..settings_with_latency_ceiling(1_000.0)
        });
        for tick in 0..10 {
            controller.record_sample(latency_sample(950.0, tick));
        }
        assert_eq!(controller.evaluate(10).unwrap().to, ThrottleMode::Deep);

        // Same samples, judged already
        assert!(controller.evaluate(11).is_none());
        for tick in 11..20 {
            controller.record_sample(latency_sample(950.0, tick));
            assert!(controller.evaluate(tick).is_none());
        }
        assert_eq!(controller.current_mode(), ThrottleMode::Deep);

        controller.record_sample(latency_sample(950.0, 20));
        assert_eq!(controller.evaluate(20).unwrap().to, ThrottleMode::Standard);
    }

    #[test]
    fn test_partial_window_holds_mode() {
        let mut controller = LoadThrottleController::new(ThrottleSettings {
            initial_mode: ThrottleMode::Minimal,
            ..Default::default()
        });
        controller.record_sample(latency_sample(10.0, 0));
        for tick in 1..6 {
            assert!(controller.evaluate(tick).is_none());
        }
        assert_eq!(controller.current_mode(), ThrottleMode::Minimal);
    }

    #[test]
    fn test_manual_override_restarts_the_window() {
        let mut controller = LoadThrottleController::new(settings_with_latency_ceiling(1_000.0));
        for tick in 0..10 {
            controller.record_sample(latency_sample(950.0, tick));
        }
        controller.set_mode(ThrottleMode::Swarm, "load test", 10);
        assert!(controller.evaluate(11).is_none());
        assert_eq!(controller.current_mode(), ThrottleMode::Swarm);
    }

    #[test]
    fn test_restored_samples_are_judged_once() {
        let mut controller = LoadThrottleController::new(ThrottleSettings {
            initial_mode: ThrottleMode::Minimal,
            ..Default::default()
        });
        controller.restore_history((0..10).map(|tick| latency_sample(10.0, tick)));
        assert_eq!(controller.evaluate(10).unwrap().to, ThrottleMode::Standard);
        assert!(controller.evaluate(11).is_none());
    }

    #[test]
    fn test_quiet_window_escalates_one_level() {
        let mut controller = LoadThrottleController::new(ThrottleSettings {
            initial_mode: ThrottleMode::Minimal,
            ..Default::default()
        });
        for tick in 0..10 {
            controller.record_sample(latency_sample(10.0, tick));
        }

        let transition = controller.evaluate(10).unwrap();
        assert_eq!(transition.to, ThrottleMode::Standard);
        assert_eq!(controller.current_mode(), ThrottleMode::Standard);
    }

    #[test]
    fn test_middle_band_holds_mode() {
        let mut controller = LoadThrottleController::new(settings_with_latency_ceiling(1_000.0));
        for tick in 0..10 {
            controller.record_sample(latency_sample(650.0, tick));
        }
        assert!(controller.evaluate(10).is_none());
        assert_eq!(controller.current_mode(), ThrottleMode::Standard);
    }

    #[test]
    fn test_escalation_respects_ceiling_mode() {
        let mut controller = LoadThrottleController::new(ThrottleSettings {
            initial_mode: ThrottleMode::Deep,
            escalation_ceiling: ThrottleMode::Deep,
            ..Default::default()
        });
        controller.record_sample(latency_sample(1.0, 0));
        assert!(controller.evaluate(1).is_none());
        assert_eq!(controller.current_mode(), ThrottleMode::Deep);
    }

    #[test]
    fn test_empty_history_never_transitions() {
        let mut controller = LoadThrottleController::default();
        assert!(controller.evaluate(0).is_none());
    }

    #[test]
    fn test_automatic_transitions_never_skip_levels() {
        let mut controller = LoadThrottleController::new(ThrottleSettings {
            initial_mode: ThrottleMode::Minimal,
            ..settings_with_latency_ceiling(1_000.0)
        });

        let loads = [10.0, 10.0, 2_000.0, 900.0, 5.0, 5.0, 5_000.0, 1.0, 1.0, 1.0];
        for (tick, ms) in loads.iter().cycle().take(60).enumerate() {
            controller.record_sample(latency_sample(*ms, tick as u64));
            controller.evaluate(tick as u64);
        }

        for transition in controller.transitions() {
            assert!(transition.is_automatic());
            assert_eq!(transition.from.distance(transition.to), 1);
        }
    }

    #[test]
    fn test_manual_override_may_skip_levels() {
        let mut controller = LoadThrottleController::new(ThrottleSettings {
            initial_mode: ThrottleMode::Minimal,
            ..Default::default()
        });

        let transition = controller.set_mode(ThrottleMode::Swarm, "incident review", 42);
        assert_eq!(transition.from, ThrottleMode::Minimal);
        assert_eq!(transition.to, ThrottleMode::Swarm);
        assert_eq!(transition.trigger, TransitionTrigger::Manual);
        assert_eq!(transition.reason, "incident review");
        assert_eq!(controller.current_mode(), ThrottleMode::Swarm);
    }

    #[test]
    fn test_manual_override_to_same_mode_is_still_recorded() {
        let mut controller = LoadThrottleController::default();
        controller.set_mode(ThrottleMode::Standard, "pin", 1);
        assert_eq!(controller.transitions().count(), 1);
    }

    #[test]
    fn test_select_mode_for_task_overrides() {
        let controller = LoadThrottleController::new(ThrottleSettings {
            initial_mode: ThrottleMode::Minimal,
            ..Default::default()
        });

        assert_eq!(controller.select_mode_for_task(0.9, 0.95, 0.1), ThrottleMode::Swarm);
        assert_eq!(controller.select_mode_for_task(0.5, 0.2, 0.1), ThrottleMode::Deep);
        assert_eq!(controller.select_mode_for_task(0.9, 0.2, 0.7), ThrottleMode::Deep);
        assert_eq!(controller.select_mode_for_task(0.9, 0.2, 0.1), ThrottleMode::Minimal);
        assert_eq!(controller.current_mode(), ThrottleMode::Minimal);
    }

    #[test]
    fn test_transition_log_is_bounded() {
        let mut controller = LoadThrottleController::new(ThrottleSettings {
            transition_log_capacity: 3,
            ..Default::default()
        });
        for i in 0..5 {
            controller.set_mode(ThrottleMode::ALL[i % 4], format!("step {}", i), i as u64);
        }
        let reasons: Vec<String> = controller.transitions().map(|t| t.reason.clone()).collect();
        assert_eq!(reasons, vec!["step 2", "step 3", "step 4"]);
    }

    #[test]
    fn test_metrics_reports_utilization() {
        let mut controller = LoadThrottleController::new(settings_with_latency_ceiling(1_000.0));
        controller.record_sample(latency_sample(500.0, 1));
        let metrics = controller.metrics();

        assert_eq!(metrics.mode, ThrottleMode::Standard);
        assert_eq!(metrics.sample_count, 1);
        let latency = metrics
            .utilization
            .iter()
            .find(|u| u.dimension == LoadDimension::Latency)
            .unwrap();
        assert!((latency.utilization - 0.5).abs() < 1e-9);
    }
}
