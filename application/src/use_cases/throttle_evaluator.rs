//! Periodic throttle evaluation
//!
//! Runs the trend check of the load throttle on a fixed tick, independent of
//! task traffic, until its cancellation token fires.

use super::council_state::CouncilState;
use concord_domain::ModeTransition;
use concord_domain::util::current_timestamp;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct ThrottleEvaluator {
    state: Arc<CouncilState>,
    interval: Duration,
}

impl ThrottleEvaluator {
    pub fn new(state: Arc<CouncilState>, interval: Duration) -> Self {
        Self {
            state,
            // A zero period would panic in tokio::time::interval
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Evaluate once. At most one level moves per call.
    pub async fn tick(&self) -> Option<ModeTransition> {
        self.state.evaluate_throttle(current_timestamp()).await
    }

    /// Run on the configured interval until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it
            ticker.tick().await;
            info!(interval_ms = self.interval.as_millis() as u64, "Throttle evaluator started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Some(transition) = self.tick().await {
                            debug!(from = %transition.from, to = %transition.to, "Evaluator moved mode");
                        }
                    }
                }
            }
            info!("Throttle evaluator stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GovernorConfig;
    use concord_domain::{LoadSample, ThrottleMode, ThrottleSettings, TransitionTrigger};

    fn state_in(initial: ThrottleMode) -> Arc<CouncilState> {
        let config = GovernorConfig::default().with_throttle(ThrottleSettings {
            initial_mode: initial,
            ..Default::default()
        });
        Arc::new(CouncilState::new(&config))
    }

    fn latency(ms: f64, ts: u64) -> LoadSample {
        LoadSample {
            latency_ms: ms,
            timestamp: ts,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ten_hot_ticks_downgrade_exactly_once() {
        let state = state_in(ThrottleMode::Swarm);
        let evaluator = ThrottleEvaluator::new(state.clone(), Duration::from_secs(1));

        let mut transitions = Vec::new();
        for ts in 0..10 {
            // 95% of the default latency ceiling, below the hard breach
            assert!(state.record_sample(latency(28_500.0, ts)).await.is_none());
            transitions.extend(evaluator.tick().await);
        }

        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].from, ThrottleMode::Swarm);
        assert_eq!(transitions[0].to, ThrottleMode::Deep);
        assert_eq!(transitions[0].trigger, TransitionTrigger::Trend);
        assert_eq!(state.current_mode().await, ThrottleMode::Deep);
    }

    #[tokio::test]
    async fn test_idle_ticks_do_not_escalate() {
        let state = state_in(ThrottleMode::Minimal);
        state.record_sample(latency(10.0, 0)).await;
        let evaluator = ThrottleEvaluator::new(state.clone(), Duration::from_secs(1));

        for _ in 0..5 {
            assert!(evaluator.tick().await.is_none());
        }
        assert_eq!(state.current_mode().await, ThrottleMode::Minimal);
    }

    #[tokio::test]
    async fn test_quiet_window_escalates_once_then_holds() {
        let state = state_in(ThrottleMode::Minimal);
        for ts in 0..10 {
            state.record_sample(latency(10.0, ts)).await;
        }
        let evaluator = ThrottleEvaluator::new(state.clone(), Duration::from_secs(1));

        assert_eq!(evaluator.tick().await.unwrap().to, ThrottleMode::Standard);
        for _ in 0..5 {
            assert!(evaluator.tick().await.is_none());
        }
        assert_eq!(state.current_mode().await, ThrottleMode::Standard);
    }

    #[tokio::test]
    async fn test_empty_history_leaves_mode() {
        let state = Arc::new(CouncilState::new(&GovernorConfig::default()));
        let evaluator = ThrottleEvaluator::new(state.clone(), Duration::from_secs(1));
        assert!(evaluator.tick().await.is_none());
        assert_eq!(state.current_mode().await, ThrottleMode::Standard);
    }

    #[tokio::test]
    async fn test_spawned_evaluator_runs_and_stops_on_cancel() {
        let state = state_in(ThrottleMode::Deep);
        for ts in 0..10 {
            state.record_sample(latency(28_500.0, ts)).await;
        }
        let cancel = CancellationToken::new();
        let handle = ThrottleEvaluator::new(state.clone(), Duration::from_millis(10))
            .spawn(cancel.clone());

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        // Several ticks ran, but the one window only moves one level
        assert_eq!(state.current_mode().await, ThrottleMode::Standard);
        assert_eq!(state.load_metrics().await.recent_transitions.len(), 1);
    }
}
