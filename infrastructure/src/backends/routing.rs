//! Per-participant backend routing

use async_trait::async_trait;
use concord_application::{BackendError, ParticipantBackend, ParticipantReply};
use concord_domain::{Participant, ParticipantId, Task};
use std::collections::HashMap;
use std::sync::Arc;

/// Routes each call to the backend registered for its participant.
///
/// Resolution order:
///  1. an explicit route for the participant id
///  2. the default backend, when one is set
///  3. `BackendError::Unavailable`
#[derive(Default)]
pub struct RoutingBackend {
    backends: Vec<Arc<dyn ParticipantBackend>>,
    routes: HashMap<ParticipantId, usize>,
    default: Option<usize>,
}

impl RoutingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend and return its index for [`Self::route`].
    pub fn add_backend(&mut self, backend: Arc<dyn ParticipantBackend>) -> usize {
        self.backends.push(backend);
        self.backends.len() - 1
    }

    /// Route a participant to a registered backend. Unknown indices are ignored.
    pub fn route(&mut self, id: impl Into<ParticipantId>, backend: usize) {
        if backend < self.backends.len() {
            self.routes.insert(id.into(), backend);
        }
    }

    pub fn set_default(&mut self, backend: usize) {
        if backend < self.backends.len() {
            self.default = Some(backend);
        }
    }

    fn resolve(&self, id: &ParticipantId) -> Result<&dyn ParticipantBackend, BackendError> {
        self.routes
            .get(id)
            .copied()
            .or(self.default)
            .and_then(|idx| self.backends.get(idx))
            .map(|b| b.as_ref())
            .ok_or_else(|| BackendError::Unavailable(id.to_string()))
    }
}

#[async_trait]
impl ParticipantBackend for RoutingBackend {
    async fn call(
        &self,
        participant: &Participant,
        task: &Task,
    ) -> Result<ParticipantReply, BackendError> {
        self.resolve(&participant.id)?.call(participant, task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{FixedParticipantBackend, FixedReply};

    fn fixed(output: &str) -> Arc<dyn ParticipantBackend> {
        Arc::new(
            FixedParticipantBackend::new()
                .with_reply("a", FixedReply::new(output, 0.9))
                .with_reply("b", FixedReply::new(output, 0.9)),
        )
    }

    #[tokio::test]
    async fn test_explicit_route_then_default() {
        let mut routing = RoutingBackend::new();
        let first = routing.add_backend(fixed("from-first"));
        let second = routing.add_backend(fixed("from-second"));
        routing.route("a", second);
        routing.set_default(first);

        let task = Task::new("t", "p");
        let a = routing.call(&Participant::new("a"), &task).await.unwrap();
        let b = routing.call(&Participant::new("b"), &task).await.unwrap();
        assert_eq!(a.output, "from-second");
        assert_eq!(b.output, "from-first");
    }

    #[tokio::test]
    async fn test_unrouted_without_default_is_unavailable() {
        let mut routing = RoutingBackend::new();
        let idx = routing.add_backend(fixed("x"));
        routing.route("a", idx);
        routing.route("b", 7);

        let err = routing
            .call(&Participant::new("b"), &Task::new("t", "p"))
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::Unavailable("b".to_string()));
    }
}
