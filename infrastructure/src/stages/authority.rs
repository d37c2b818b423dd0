//! Authority check against configured policy terms

use async_trait::async_trait;
use concord_application::{AuthorityCheck, StageContext, StageError};
use concord_domain::AuthorityOutcome;
use serde::{Deserialize, Serialize};

/// Grants authority unless the task or the chosen output trips a rule.
///
/// - a vetoed term in the payload or chosen output vetoes the action
/// - a denied term, or a required capability on the denied list, denies it
///
/// Terms match case-insensitively as substrings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyAuthority {
    pub vetoed_terms: Vec<String>,
    pub denied_terms: Vec<String>,
    pub denied_capabilities: Vec<String>,
}

impl PolicyAuthority {
    fn find_term<'a>(terms: &'a [String], haystacks: &[&str]) -> Option<&'a str> {
        terms
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .find(|term| {
                let term = term.to_lowercase();
                haystacks.iter().any(|h| h.contains(&term))
            })
    }
}

#[async_trait]
impl AuthorityCheck for PolicyAuthority {
    async fn check(&self, ctx: &StageContext<'_>) -> Result<AuthorityOutcome, StageError> {
        let payload = ctx.task.payload.to_lowercase();
        let output = ctx.decision.chosen_output.to_lowercase();
        let haystacks = [payload.as_str(), output.as_str()];

        if let Some(term) = Self::find_term(&self.vetoed_terms, &haystacks) {
            return Ok(AuthorityOutcome::vetoed(format!("vetoed term '{}'", term)));
        }
        if let Some(term) = Self::find_term(&self.denied_terms, &haystacks) {
            return Ok(AuthorityOutcome::denied(format!("denied term '{}'", term)));
        }
        if let Some(capability) = ctx.task.required_capabilities.iter().find(|c| {
            self.denied_capabilities
                .iter()
                .any(|d| d.eq_ignore_ascii_case(c))
        }) {
            return Ok(AuthorityOutcome::denied(format!(
                "capability '{}' is not authorized",
                capability
            )));
        }

        Ok(AuthorityOutcome::granted("no policy rule matched"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_domain::{AuthorityDecision, ConsensusDecision, Task, TaskId};

    fn policy() -> PolicyAuthority {
        PolicyAuthority {
            vetoed_terms: vec!["DROP TABLE".to_string()],
            denied_terms: vec!["production".to_string()],
            denied_capabilities: vec!["payments".to_string()],
        }
    }

    async fn check(task: Task, output: &str) -> AuthorityOutcome {
        let mut decision = ConsensusDecision::without_responses(TaskId::new("t"), "", 0);
        decision.chosen_output = output.to_string();
        let ctx = StageContext {
            task: &task,
            decision: &decision,
            responses: &[],
            prior: &[],
        };
        policy().check(&ctx).await.unwrap()
    }

    #[tokio::test]
    async fn test_vetoed_term_in_output() {
        let outcome = check(Task::new("t", "clean up"), "run drop table users").await;
        assert_eq!(outcome.decision, AuthorityDecision::Vetoed);
        assert!(outcome.reason.contains("DROP TABLE"));
    }

    #[tokio::test]
    async fn test_denied_term_and_capability() {
        let outcome = check(Task::new("t", "deploy to Production"), "ok").await;
        assert_eq!(outcome.decision, AuthorityDecision::Denied);

        let outcome = check(Task::new("t", "refund").with_capability("Payments"), "ok").await;
        assert_eq!(outcome.decision, AuthorityDecision::Denied);
        assert!(outcome.reason.contains("Payments"));
    }

    #[tokio::test]
    async fn test_granted_when_nothing_matches() {
        let outcome = check(Task::new("t", "summarize the report"), "summary").await;
        assert_eq!(outcome.decision, AuthorityDecision::Granted);
        assert_eq!(outcome.risk, 0.0);
    }

    #[tokio::test]
    async fn test_empty_terms_are_ignored() {
        let authority = PolicyAuthority {
            vetoed_terms: vec!["  ".to_string()],
            ..Default::default()
        };
        let task = Task::new("t", "anything");
        let decision = ConsensusDecision::without_responses(TaskId::new("t"), "", 0);
        let ctx = StageContext {
            task: &task,
            decision: &decision,
            responses: &[],
            prior: &[],
        };
        let outcome = authority.check(&ctx).await.unwrap();
        assert_eq!(outcome.decision, AuthorityDecision::Granted);
    }
}
