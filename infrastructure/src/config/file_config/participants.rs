//! Participant entries (`[[participants]]` array)
//!
//! ```toml
//! [[participants]]
//! id = "alpha"
//! capabilities = ["code", "review"]
//! trust = 0.6
//! backend = "fixed"
//! output = "ship it"
//! confidence = 0.8
//!
//! [[participants]]
//! id = "beta"
//! backend = "http"
//! endpoint = "http://localhost:8081/answer"
//! ```

use super::validation::{ConfigIssue, ConfigIssueCode, check_unit};
use crate::backends::{FixedParticipantBackend, FixedReply, RoutingBackend};
use concord_domain::Participant;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileBackendKind {
    /// Canned reply from this entry
    #[default]
    Fixed,
    /// JSON over HTTP to `endpoint`
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileParticipantConfig {
    pub id: String,
    pub capabilities: Vec<String>,
    /// Initial trust weight; restored state takes precedence
    pub trust: Option<f64>,
    pub backend: FileBackendKind,
    pub endpoint: Option<String>,
    pub output: String,
    pub confidence: f64,
    pub latency_ms: u64,
    pub compute_cost: Option<f64>,
    /// Adopt the majority peer answer in later debate rounds
    pub follow_peers: bool,
}

impl Default for FileParticipantConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            capabilities: Vec::new(),
            trust: None,
            backend: FileBackendKind::Fixed,
            endpoint: None,
            output: String::new(),
            confidence: 0.5,
            latency_ms: 0,
            compute_cost: None,
            follow_peers: false,
        }
    }
}

impl FileParticipantConfig {
    pub fn to_participant(&self, now_ms: u64) -> Participant {
        let mut participant = Participant::new(self.id.trim())
            .with_capabilities(self.capabilities.iter().cloned())
            .with_last_seen(now_ms);
        if let Some(trust) = self.trust {
            participant = participant.with_trust(trust);
        }
        participant
    }

    fn fixed_reply(&self) -> FixedReply {
        let mut reply = FixedReply::new(self.output.clone(), self.confidence)
            .with_latency(self.latency_ms);
        if let Some(cost) = self.compute_cost {
            reply = reply.with_compute_cost(cost);
        }
        if self.follow_peers {
            reply = reply.following_peers();
        }
        reply
    }
}

/// Route every configured participant to its backend.
///
/// HTTP entries are only routed when built with the `http-backend`
/// feature; validation reports them otherwise.
pub fn build_backend(participants: &[FileParticipantConfig]) -> RoutingBackend {
    let mut routing = RoutingBackend::new();

    let mut fixed = FixedParticipantBackend::new();
    for entry in participants.iter().filter(|p| p.backend == FileBackendKind::Fixed) {
        fixed.insert(entry.id.trim(), entry.fixed_reply());
    }
    if !fixed.is_empty() {
        let idx = routing.add_backend(Arc::new(fixed));
        for entry in participants.iter().filter(|p| p.backend == FileBackendKind::Fixed) {
            routing.route(entry.id.trim(), idx);
        }
    }

    #[cfg(feature = "http-backend")]
    {
        let mut http = crate::backends::HttpParticipantBackend::new(reqwest::Client::new());
        let mut routed = Vec::new();
        for entry in participants.iter().filter(|p| p.backend == FileBackendKind::Http) {
            if let Some(endpoint) = &entry.endpoint {
                http.insert(entry.id.trim(), endpoint.clone());
                routed.push(entry.id.trim());
            }
        }
        if !routed.is_empty() {
            let idx = routing.add_backend(Arc::new(http));
            for id in routed {
                routing.route(id, idx);
            }
        }
    }

    routing
}

pub(super) fn validate(participants: &[FileParticipantConfig], issues: &mut Vec<ConfigIssue>) {
    let mut seen = HashSet::new();
    for (index, entry) in participants.iter().enumerate() {
        let id = entry.id.trim();
        if id.is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyParticipantId,
                format!("participants[{}]: id cannot be empty", index),
            ));
            continue;
        }
        if !seen.insert(id) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::DuplicateParticipantId(id.to_string()),
                format!("participants: duplicate id '{}'", id),
            ));
        }
        check_unit(&format!("participants.{}.confidence", id), entry.confidence, issues);
        if let Some(trust) = entry.trust {
            check_unit(&format!("participants.{}.trust", id), trust, issues);
        }
        if entry.backend == FileBackendKind::Http {
            if entry.endpoint.as_deref().is_none_or(|e| e.trim().is_empty()) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::UnusableBackend(id.to_string()),
                    format!("participants.{}: http backend needs an endpoint", id),
                ));
            } else if !cfg!(feature = "http-backend") {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::UnusableBackend(id.to_string()),
                    format!(
                        "participants.{}: http backend requires the 'http-backend' feature",
                        id
                    ),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_application::ParticipantBackend;
    use concord_domain::Task;

    fn entry(id: &str, output: &str) -> FileParticipantConfig {
        FileParticipantConfig {
            id: id.to_string(),
            output: output.to_string(),
            confidence: 0.8,
            ..Default::default()
        }
    }

    #[test]
    fn test_to_participant() {
        let config = FileParticipantConfig {
            capabilities: vec!["code".to_string()],
            trust: Some(2.0),
            ..entry(" alpha ", "x")
        };
        let participant = config.to_participant(42);
        assert_eq!(participant.id.as_str(), "alpha");
        assert_eq!(participant.last_seen, 42);
        assert_eq!(participant.trust_weight(), 1.0);
        assert!(participant.has_capabilities(&["code".to_string()]));
    }

    #[tokio::test]
    async fn test_build_backend_routes_fixed_entries() {
        let backend = build_backend(&[entry("alpha", "ship"), entry("beta", "hold")]);
        let task = Task::new("t", "p");
        let reply = backend.call(&Participant::new("beta"), &task).await.unwrap();
        assert_eq!(reply.output, "hold");
        assert!(backend.call(&Participant::new("gamma"), &task).await.is_err());
    }

    #[test]
    fn test_validation() {
        let http = FileParticipantConfig {
            backend: FileBackendKind::Http,
            ..entry("gamma", "")
        };
        let mut issues = Vec::new();
        validate(
            &[entry("alpha", "x"), entry("alpha", "y"), entry("", "z"), http],
            &mut issues,
        );
        let codes: Vec<_> = issues.iter().map(|i| i.code.clone()).collect();
        assert!(codes.contains(&ConfigIssueCode::DuplicateParticipantId("alpha".to_string())));
        assert!(codes.contains(&ConfigIssueCode::EmptyParticipantId));
        assert!(codes.contains(&ConfigIssueCode::UnusableBackend("gamma".to_string())));
    }
}
