//! Governance pipeline use case
//!
//! Runs a resolved consensus through the enabled stages in their fixed
//! order. The first terminal finding ends the pipeline; no later stage is
//! invoked. A stage that errors or overruns its timeout closes the pipeline
//! as `block`.

use crate::config::PipelineSettings;
use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger};
use crate::ports::governance_stages::{
    AuthorityCheck, ConflictResolver, Simulator, StageContext, StageError, StressTester,
};
use crate::ports::progress::ProgressNotifier;
use concord_domain::util::current_timestamp;
use concord_domain::{
    ConsensusDecision, DomainError, GovernanceStage, GovernanceVerdict, PipelineTrace, Response,
    StageOutcome, Task,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Stage implementations. A stage without an implementation is skipped.
#[derive(Clone, Default)]
pub struct GovernanceStages {
    pub authority: Option<Arc<dyn AuthorityCheck>>,
    pub simulator: Option<Arc<dyn Simulator>>,
    pub stress_tester: Option<Arc<dyn StressTester>>,
    pub conflict_resolver: Option<Arc<dyn ConflictResolver>>,
}

impl GovernanceStages {
    pub fn with_authority(mut self, stage: Arc<dyn AuthorityCheck>) -> Self {
        self.authority = Some(stage);
        self
    }

    pub fn with_simulator(mut self, stage: Arc<dyn Simulator>) -> Self {
        self.simulator = Some(stage);
        self
    }

    pub fn with_stress_tester(mut self, stage: Arc<dyn StressTester>) -> Self {
        self.stress_tester = Some(stage);
        self
    }

    pub fn with_conflict_resolver(mut self, stage: Arc<dyn ConflictResolver>) -> Self {
        self.conflict_resolver = Some(stage);
        self
    }
}

pub struct GovernancePipeline {
    stages: GovernanceStages,
    settings: PipelineSettings,
    audit: Arc<dyn AuditLogger>,
}

impl GovernancePipeline {
    pub fn new(stages: GovernanceStages, settings: PipelineSettings) -> Self {
        Self {
            stages,
            settings,
            audit: Arc::new(NoAuditLogger),
        }
    }

    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Produce the verdict for a resolved consensus.
    pub async fn evaluate(
        &self,
        task: &Task,
        decision: &ConsensusDecision,
        responses: &[Response],
        progress: &dyn ProgressNotifier,
    ) -> GovernanceVerdict {
        let mut trace = PipelineTrace::new(task.id.clone(), self.settings.weights);

        if let Some(verdict) = trace.record_consensus(decision, current_timestamp()) {
            info!(task_id = %task.id, band = %decision.band, "Consensus gate blocked the task");
            return self.conclude(verdict, progress);
        }

        let mut prior: Vec<StageOutcome> = Vec::new();
        for stage in self.settings.enabled_stages() {
            let ctx = StageContext {
                task,
                decision,
                responses,
                prior: &prior,
            };

            let result = match tokio::time::timeout(
                self.settings.stage_timeout,
                self.run_stage(stage, &ctx),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(StageError::Timeout(
                    self.settings.stage_timeout.as_millis() as u64,
                )),
            };

            let outcome = match result {
                Ok(Some(outcome)) => outcome,
                Ok(None) => {
                    debug!(task_id = %task.id, stage = %stage, "Stage has no implementation; skipping");
                    continue;
                }
                Err(e) => {
                    let failure = DomainError::StageEvaluation {
                        stage: stage.to_string(),
                        cause: e.to_string(),
                    };
                    error!(task_id = %task.id, stage = %stage, cause = %e, "{}", failure);
                    self.audit.log(AuditEvent::new(
                        "stage_failed",
                        json!({
                            "task_id": task.id,
                            "stage": stage,
                            "cause": e.to_string(),
                        }),
                    ));
                    progress.on_stage_complete(stage, false);
                    let verdict = trace.fail(stage, &e.to_string(), current_timestamp());
                    return self.conclude(verdict, progress);
                }
            };

            let terminal = trace.record(&outcome, current_timestamp());
            progress.on_stage_complete(stage, terminal.is_none());
            if let Some(verdict) = terminal {
                info!(
                    task_id = %task.id,
                    stage = %stage,
                    decision = %verdict.decision,
                    "Stage short-circuited the pipeline"
                );
                return self.conclude(verdict, progress);
            }
            prior.push(outcome);
        }

        self.conclude(trace.finish(current_timestamp()), progress)
    }

    async fn run_stage(
        &self,
        stage: GovernanceStage,
        ctx: &StageContext<'_>,
    ) -> Result<Option<StageOutcome>, StageError> {
        match stage {
            GovernanceStage::Authority => match &self.stages.authority {
                Some(s) => s.check(ctx).await.map(|o| Some(StageOutcome::Authority(o))),
                None => Ok(None),
            },
            GovernanceStage::Simulation => match &self.stages.simulator {
                Some(s) => s.simulate(ctx).await.map(|o| Some(StageOutcome::Simulation(o))),
                None => Ok(None),
            },
            GovernanceStage::StressTest => match &self.stages.stress_tester {
                Some(s) => s
                    .stress_test(ctx)
                    .await
                    .map(|o| Some(StageOutcome::StressTest(o))),
                None => Ok(None),
            },
            GovernanceStage::ConflictResolution => match &self.stages.conflict_resolver {
                Some(s) => s
                    .resolve(ctx)
                    .await
                    .map(|o| Some(StageOutcome::ConflictResolution(o))),
                None => Ok(None),
            },
            GovernanceStage::Consensus | GovernanceStage::Synthesis => Ok(None),
        }
    }

    fn conclude(
        &self,
        verdict: GovernanceVerdict,
        progress: &dyn ProgressNotifier,
    ) -> GovernanceVerdict {
        info!(
            task_id = %verdict.task_id,
            decision = %verdict.decision,
            risk = verdict.risk.overall,
            confidence = verdict.confidence,
            "Governance verdict"
        );
        self.audit.log(AuditEvent::new(
            "verdict",
            serde_json::to_value(&verdict).unwrap_or_default(),
        ));
        progress.on_verdict(&verdict);
        verdict
    }
}
