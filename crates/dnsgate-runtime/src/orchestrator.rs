//! Run orchestrator: convergence, collection, validation.
//!
//! The orchestrator drives one validation run per plan:
//! - Parse the network block (fatal if malformed, before any polling)
//! - Wait for the readiness probe within the plan's deadline
//! - Collect the evidence batch in one fetch
//! - Decode and validate it into a single verdict
//!
//! Several plans can run concurrently; each run owns its network, clock and
//! evidence batch and shares only the read-only backends.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use dnsgate_core::{validate_batch, NetworkError, PlanError, RunPlan, Verdict};

use crate::backends::{BackendError, LogStore, ObjectStore};
use crate::collector::EvidenceCollector;
use crate::convergence::{probe_for, ConvergenceError, ConvergenceResult, ConvergenceSignal, PollSettings};

/// Errors that end a run without a verdict.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error(transparent)]
    MalformedNetwork(#[from] NetworkError),

    #[error(transparent)]
    InvalidPlan(#[from] PlanError),

    #[error(
        "Convergence timed out after {attempts} attempts ({elapsed:?}); last observation: {}",
        .last_observation.as_deref().unwrap_or("none")
    )]
    ConvergenceTimeout {
        attempts: u32,
        elapsed: Duration,
        last_observation: Option<String>,
    },

    #[error(transparent)]
    Probe(#[from] ConvergenceError),

    #[error("Evidence fetch failed for stream '{stream}': {source}")]
    EvidenceFetch {
        stream: String,
        #[source]
        source: BackendError,
    },
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Plan name
    pub plan: String,

    pub convergence: ConvergenceResult,

    pub verdict: Verdict,
}

impl RunOutcome {
    pub fn passed(&self) -> bool {
        self.verdict.pass
    }
}

/// Sequences convergence, collection and validation for run plans.
pub struct Orchestrator {
    objects: Arc<dyn ObjectStore>,
    logs: Arc<dyn LogStore>,
}

impl Orchestrator {
    pub fn new(objects: Arc<dyn ObjectStore>, logs: Arc<dyn LogStore>) -> Self {
        Self { objects, logs }
    }

    /// Execute one plan.
    ///
    /// # Execution Flow
    /// 1. Parse the CIDR block and check the rest of the plan
    /// 2. Poll the readiness probe until achieved or the deadline passes
    /// 3. Wait out the settle delay
    /// 4. Collect the evidence batch
    /// 5. Decode, validate and assemble the verdict
    pub async fn run(&self, plan: &RunPlan) -> Result<RunOutcome, RunError> {
        let network = plan.network()?;
        plan.validate()?;

        let probe = probe_for(
            &plan.readiness,
            &plan.stream,
            Arc::clone(&self.objects),
            Arc::clone(&self.logs),
        );
        let settings = PollSettings::from_plan(plan);

        tracing::info!(
            plan = %plan.name,
            readiness = plan.readiness.kind(),
            deadline = ?settings.deadline,
            network = %network,
            "Waiting for environment to converge"
        );

        let convergence = ConvergenceSignal::new(settings).wait(probe.as_ref()).await?;
        if !convergence.achieved {
            return Err(RunError::ConvergenceTimeout {
                attempts: convergence.attempts,
                elapsed: convergence.elapsed,
                last_observation: convergence.last_observation,
            });
        }

        if !plan.settle_delay.is_zero() {
            tracing::info!(
                plan = %plan.name,
                delay = ?plan.settle_delay,
                "Waiting for the log backend to catch up"
            );
            tokio::time::sleep(plan.settle_delay).await;
        }

        let payloads = EvidenceCollector::new(Arc::clone(&self.logs))
            .collect(&plan.stream)
            .await
            .map_err(|source| RunError::EvidenceFetch {
                stream: plan.stream.clone(),
                source,
            })?;

        let verdict = validate_batch(&payloads, &network);

        tracing::info!(
            plan = %plan.name,
            pass = verdict.pass,
            summary = %verdict.summary(),
            "Run finished"
        );

        Ok(RunOutcome {
            plan: plan.name.clone(),
            convergence,
            verdict,
        })
    }

    /// Execute several plans concurrently; results keep input order.
    pub async fn run_all(&self, plans: &[RunPlan]) -> Vec<Result<RunOutcome, RunError>> {
        join_all(plans.iter().map(|plan| self.run(plan))).await
    }
}

/// Builder for Orchestrator.
#[derive(Default)]
pub struct OrchestratorBuilder {
    objects: Option<Arc<dyn ObjectStore>>,
    logs: Option<Arc<dyn LogStore>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the object backend used by marker probes.
    pub fn objects(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.objects = Some(store);
        self
    }

    /// Set the log backend holding evidence.
    pub fn logs(mut self, store: Arc<dyn LogStore>) -> Self {
        self.logs = Some(store);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> Result<Orchestrator, RunError> {
        let objects = self
            .objects
            .ok_or_else(|| RunError::NotConfigured("No object store set".to_string()))?;
        let logs = self
            .logs
            .ok_or_else(|| RunError::NotConfigured("No log store set".to_string()))?;

        Ok(Orchestrator::new(objects, logs))
    }
}
