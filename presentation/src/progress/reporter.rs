//! Progress reporting for council rounds

use colored::Colorize;
use concord_application::ports::progress::{CallOutcome, ProgressNotifier};
use concord_domain::{
    ConsensusDecision, DecisionBand, GovernanceStage, GovernanceVerdict, ParticipantId, TaskId,
};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Reports progress with one bar per dispatch round
pub struct ProgressReporter {
    multi: MultiProgress,
    round_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            round_bar: Mutex::new(None),
        }
    }

    fn round_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn outcome_label(participant: &ParticipantId, outcome: &CallOutcome) -> String {
    match outcome {
        CallOutcome::Responded { latency_ms } => {
            format!("{} {} ({}ms)", "v".green(), participant, latency_ms)
        }
        CallOutcome::Failed(cause) => format!("{} {} ({})", "x".red(), participant, cause),
        CallOutcome::TimedOut => format!("{} {} (timed out)", "x".red(), participant),
    }
}

fn band_colored(band: DecisionBand) -> colored::ColoredString {
    match band {
        DecisionBand::Accept => band.as_str().green(),
        DecisionBand::Hedge => band.as_str().yellow(),
        DecisionBand::Block => band.as_str().red(),
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_dispatch_start(&self, _task_id: &TaskId, round: u32, participants: usize) {
        let pb = self.multi.add(ProgressBar::new(participants as u64));
        pb.set_style(Self::round_style());
        pb.set_prefix(format!("Round {}", round));
        pb.set_message("Dispatching...");

        if let Ok(mut bar) = self.round_bar.lock() {
            *bar = Some(pb);
        }
    }

    fn on_participant_complete(&self, participant: &ParticipantId, outcome: &CallOutcome) {
        if let Ok(bar) = self.round_bar.lock()
            && let Some(pb) = bar.as_ref()
        {
            pb.set_message(outcome_label(participant, outcome));
            pb.inc(1);
        }
    }

    fn on_dispatch_complete(&self, _task_id: &TaskId, round: u32, responded: usize) {
        if let Ok(mut bar) = self.round_bar.lock()
            && let Some(pb) = bar.take()
        {
            pb.finish_with_message(format!(
                "Round {} complete: {} responded",
                round,
                responded.to_string().green()
            ));
        }
    }

    fn on_consensus(&self, decision: &ConsensusDecision) {
        let _ = self.multi.println(format!(
            "{} consensus {} (score {:.2})",
            "->".cyan(),
            band_colored(decision.band),
            decision.agreement_score
        ));
    }

    fn on_stage_complete(&self, stage: GovernanceStage, passed: bool) {
        let mark = if passed { "v".green() } else { "x".red() };
        let _ = self.multi.println(format!("  {} {}", mark, stage));
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_dispatch_start(&self, task_id: &TaskId, round: u32, participants: usize) {
        println!(
            "{} {} {} ({} participants)",
            "->".cyan(),
            format!("Round {}", round).bold(),
            task_id,
            participants
        );
    }

    fn on_participant_complete(&self, participant: &ParticipantId, outcome: &CallOutcome) {
        println!("  {}", outcome_label(participant, outcome));
    }

    fn on_dispatch_complete(&self, _task_id: &TaskId, _round: u32, _responded: usize) {
        println!();
    }

    fn on_consensus(&self, decision: &ConsensusDecision) {
        println!(
            "{} consensus {} (score {:.2})",
            "->".cyan(),
            band_colored(decision.band),
            decision.agreement_score
        );
    }

    fn on_verdict(&self, verdict: &GovernanceVerdict) {
        println!("{} verdict {}", "->".cyan(), verdict.decision.as_str().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_label_names_participant_and_cause() {
        colored::control::set_override(false);
        let id = ParticipantId::new("alpha");
        assert_eq!(
            outcome_label(&id, &CallOutcome::Responded { latency_ms: 12 }),
            "v alpha (12ms)"
        );
        assert_eq!(outcome_label(&id, &CallOutcome::TimedOut), "x alpha (timed out)");
        assert_eq!(
            outcome_label(&id, &CallOutcome::Failed("refused".into())),
            "x alpha (refused)"
        );
    }
}
