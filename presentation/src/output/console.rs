//! Console output formatter for council results

use crate::output::formatter::OutputFormatter;
use colored::{ColoredString, Colorize};
use concord_application::TaskReport;
use concord_domain::{
    ConsensusDecision, DecisionBand, LoadMetrics, ParticipantStats, RiskLevel, VerdictDecision,
};

/// Formats council results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete task report
    pub fn format(report: &TaskReport) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Council Verdict"));
        output.push('\n');

        output.push_str(&format!("{} {}\n", "Task:".cyan().bold(), report.task_id));
        output.push_str(&format!(
            "{} {} ({} participants, depth {}, {} of {} calls)\n",
            "Mode:".cyan().bold(),
            report.mode,
            report.policy.max_participants,
            report.policy.max_depth,
            report.calls_used,
            report.policy.max_calls
        ));

        // Responses of the final round
        output.push_str(&Self::section_header("Responses"));
        if report.responses.is_empty() {
            output.push_str(&format!("\n{}\n", "No usable responses".red()));
        }
        for response in &report.responses {
            output.push_str(&format!(
                "\n{}\n{}\n",
                format!(
                    "── {} (confidence {:.2}, {}ms) ──",
                    response.participant_id, response.confidence, response.latency_ms
                )
                .yellow()
                .bold(),
                response.output
            ));
        }
        if !report.failures.is_empty() {
            output.push_str(&format!("\n{}\n", "Failures:".red().bold()));
            for failure in &report.failures {
                output.push_str(&format!(
                    "  x {} (round {}): {}\n",
                    failure.participant_id, failure.round, failure.cause
                ));
            }
        }

        // Consensus
        output.push_str(&Self::section_header("Consensus"));
        output.push_str(&Self::format_decision(&report.decision));
        for alternative in &report.decision.alternatives {
            let marker = if alternative.genuine { "" } else { " (no result)" };
            output.push_str(&format!(
                "  * {:<20} {:.2}{}\n",
                alternative.method.to_string(),
                alternative.score,
                marker
            ));
        }

        if !report.trust_adjustments.is_empty() {
            output.push_str(&format!("\n{}\n", "Trust:".cyan().bold()));
            for adjustment in &report.trust_adjustments {
                output.push_str(&format!(
                    "  {} {:.3} -> {:.3} ({:+.3})\n",
                    adjustment.participant_id,
                    adjustment.previous,
                    adjustment.updated,
                    adjustment.delta
                ));
            }
        }

        // Governance
        let verdict = &report.verdict;
        output.push_str(&Self::section_header("Governance"));
        let path: Vec<&str> = verdict.stage_path.iter().map(|s| s.as_str()).collect();
        output.push_str(&format!("{} {}\n", "Stages:".cyan().bold(), path.join(" -> ")));
        if let Some(stage) = verdict.terminal_stage {
            output.push_str(&format!("{} {}\n", "Stopped at:".yellow().bold(), stage));
        }
        for contribution in &verdict.risk.per_stage {
            output.push_str(&format!(
                "  * {:<20} risk {:.2}  confidence {:.2}\n",
                contribution.stage.as_str(),
                contribution.risk,
                contribution.confidence
            ));
        }
        if !verdict.reasoning.is_empty() {
            output.push_str(&format!("\n{}\n", "Reasoning:".cyan().bold()));
            for line in &verdict.reasoning {
                output.push_str(&format!("  * {}\n", line));
            }
        }
        output.push_str(&format!(
            "\n{} {}  {} {} ({:.2})  {} {:.2}\n",
            "Verdict:".bold(),
            Self::verdict_colored(verdict.decision),
            "Risk:".bold(),
            Self::risk_colored(verdict.risk.level),
            verdict.risk.overall,
            "Confidence:".bold(),
            verdict.confidence
        ));

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(report: &TaskReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    /// Verdict line plus the chosen output
    pub fn format_summary(report: &TaskReport) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{} {} ({}, {} {:.2})\n",
            "Verdict:".bold(),
            Self::verdict_colored(report.verdict.decision),
            report.mode,
            Self::band_colored(report.decision.band),
            report.decision.agreement_score
        ));
        if !report.decision.chosen_output.is_empty() {
            output.push('\n');
            output.push_str(&report.decision.chosen_output);
            output.push('\n');
        } else {
            output.push_str(&format!("{}\n", report.decision.rationale.dimmed()));
        }

        output
    }

    /// Throttle mode, budget and per-dimension utilization
    pub fn format_metrics(metrics: &LoadMetrics) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Load Throttle"));
        output.push('\n');
        output.push_str(&format!(
            "{} {} ({} participants, depth {}, {} calls, {}ms timeout)\n",
            "Mode:".cyan().bold(),
            metrics.mode,
            metrics.policy.max_participants,
            metrics.policy.max_depth,
            metrics.policy.max_calls,
            metrics.policy.timeout_ms
        ));
        output.push_str(&format!(
            "{} {} (window {})\n",
            "Samples:".cyan().bold(),
            metrics.sample_count,
            metrics.window
        ));

        output.push_str(&Self::section_header("Utilization"));
        for dim in &metrics.utilization {
            let percent = format!("{:>5.1}%", dim.utilization * 100.0);
            let percent = if dim.utilization > 1.0 {
                percent.red()
            } else if dim.utilization > 0.8 {
                percent.yellow()
            } else {
                percent.green()
            };
            output.push_str(&format!(
                "  {:<20} {}  (avg {:.1} / {:.1})\n",
                dim.dimension.to_string(),
                percent,
                dim.average,
                dim.ceiling
            ));
        }

        if !metrics.recent_transitions.is_empty() {
            output.push_str(&Self::section_header("Recent Transitions"));
            for transition in &metrics.recent_transitions {
                output.push_str(&format!(
                    "  {} -> {} [{}] {}\n",
                    transition.from, transition.to, transition.trigger, transition.reason
                ));
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// One line per participant
    pub fn format_participants(stats: &[ParticipantStats]) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Participants"));
        output.push('\n');
        if stats.is_empty() {
            output.push_str(&format!("{}\n", "No participants registered".dimmed()));
        }
        for s in stats {
            let caps = if s.capabilities.is_empty() {
                "-".to_string()
            } else {
                s.capabilities.join(",")
            };
            output.push_str(&format!(
                "  {:<16} {:<9} trust {:.3}  agree {:>3}  dissent {:>3}  [{}]\n",
                s.id.to_string(),
                s.status.to_string(),
                s.trust_weight,
                s.agreements,
                s.dissents,
                caps
            ));
        }

        output.push_str(&Self::footer());
        output
    }

    fn format_decision(decision: &ConsensusDecision) -> String {
        let method = decision
            .method
            .map(|m| m.to_string())
            .unwrap_or_else(|| "none".to_string());
        let mut output = format!(
            "{} {}  {} {:.2}  {} {}  {} {}\n",
            "Band:".bold(),
            Self::band_colored(decision.band),
            "Score:".bold(),
            decision.agreement_score,
            "Method:".bold(),
            method,
            "Rounds:".bold(),
            decision.rounds
        );
        output.push_str(&format!("{}\n", decision.rationale.dimmed()));
        if !decision.dissenting_participants.is_empty() {
            let dissent: Vec<String> = decision
                .dissenting_participants
                .iter()
                .map(|p| p.to_string())
                .collect();
            output.push_str(&format!("{} {}\n", "Dissent:".yellow().bold(), dissent.join(", ")));
        }
        output
    }

    fn band_colored(band: DecisionBand) -> ColoredString {
        match band {
            DecisionBand::Accept => band.as_str().green().bold(),
            DecisionBand::Hedge => band.as_str().yellow().bold(),
            DecisionBand::Block => band.as_str().red().bold(),
        }
    }

    fn verdict_colored(decision: VerdictDecision) -> ColoredString {
        match decision {
            VerdictDecision::Approve => decision.as_str().green().bold(),
            VerdictDecision::Defer | VerdictDecision::Escalate => decision.as_str().yellow().bold(),
            VerdictDecision::Deny | VerdictDecision::Block => decision.as_str().red().bold(),
        }
    }

    fn risk_colored(level: RiskLevel) -> ColoredString {
        let label = level.to_string();
        match level {
            RiskLevel::Low => label.green(),
            RiskLevel::Medium => label.yellow(),
            RiskLevel::High => label.red(),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, report: &TaskReport) -> String {
        Self::format(report)
    }

    fn format_json(&self, report: &TaskReport) -> String {
        Self::format_json(report)
    }

    fn format_summary(&self, report: &TaskReport) -> String {
        Self::format_summary(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_application::ParticipantFailure;
    use concord_domain::{
        ConsensusMethod, GovernanceStage, GovernanceVerdict, ModePolicy, ParticipantId,
        ParticipantStatus, Response, RiskAssessment, TaskId, ThrottleMode,
    };

    fn report() -> TaskReport {
        let task_id = TaskId::new("t-1");
        let decision = ConsensusDecision {
            task_id: task_id.clone(),
            chosen_output: "ship it".to_string(),
            agreement_score: 0.8,
            band: DecisionBand::Accept,
            method: Some(ConsensusMethod::Majority),
            agreeing_participants: vec![ParticipantId::new("a"), ParticipantId::new("b")],
            dissenting_participants: vec![ParticipantId::new("c")],
            rationale: "2 of 3 agree".to_string(),
            alternatives: Vec::new(),
            rounds: 1,
            timestamp: 0,
        };
        let verdict = GovernanceVerdict {
            task_id: task_id.clone(),
            decision: VerdictDecision::Approve,
            stage_path: vec![GovernanceStage::Consensus, GovernanceStage::Synthesis],
            terminal_stage: None,
            risk: RiskAssessment {
                overall: 0.1,
                level: RiskLevel::Low,
                per_stage: Vec::new(),
            },
            confidence: 0.9,
            reasoning: vec!["consensus accepted".to_string()],
            timestamp: 0,
        };
        TaskReport {
            task_id,
            mode: ThrottleMode::Standard,
            policy: ModePolicy::default_for(ThrottleMode::Standard),
            decision,
            verdict,
            responses: vec![Response::new("a", "ship it", 0.9)],
            failures: vec![ParticipantFailure {
                participant_id: ParticipantId::new("d"),
                round: 1,
                cause: "timed out".to_string(),
            }],
            calls_used: 4,
            trust_adjustments: Vec::new(),
        }
    }

    #[test]
    fn test_full_format_covers_every_section() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format(&report());
        assert!(text.contains("Task: t-1"));
        assert!(text.contains("Mode: standard (3 participants, depth 2, 4 of 6 calls)"));
        assert!(text.contains("x d (round 1): timed out"));
        assert!(text.contains("Dissent: c"));
        assert!(text.contains("consensus -> synthesis"));
        assert!(text.contains("Verdict: approve"));
    }

    #[test]
    fn test_summary_prints_chosen_output() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format_summary(&report());
        assert!(text.starts_with("Verdict: approve (standard, accept 0.80)"));
        assert!(text.contains("ship it"));
    }

    #[test]
    fn test_json_is_parseable() {
        let json = ConsoleFormatter::format_json(&report());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["verdict"]["decision"], "approve");
        assert_eq!(value["decision"]["band"], "accept");
    }

    #[test]
    fn test_participants_table() {
        colored::control::set_override(false);
        let stats = vec![ParticipantStats {
            id: ParticipantId::new("alpha"),
            status: ParticipantStatus::Online,
            trust_weight: 0.55,
            last_seen: 0,
            capabilities: vec!["ops".to_string()],
            agreements: 3,
            dissents: 1,
            trust_history: Vec::new(),
        }];
        let text = ConsoleFormatter::format_participants(&stats);
        assert!(text.contains("alpha"));
        assert!(text.contains("trust 0.550"));
        assert!(text.contains("[ops]"));
    }
}
