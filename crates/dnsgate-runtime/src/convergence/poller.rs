//! Deadline-bounded polling of a readiness probe.
//!
//! State machine: `Pending -> {Achieved, TimedOut}`. Absence errors keep the
//! poll pending; any other backend error ends it at once. No probe is started
//! once the deadline has passed, and a probe still running at the deadline
//! is abandoned.

use serde::{Serialize, Serializer};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout, Instant};

use dnsgate_core::plan::{DEFAULT_POLL_INTERVAL, SHORT_DEADLINE};
use dnsgate_core::RunPlan;

use super::probe::{Probe, ProbeOutcome};
use crate::backends::BackendError;

/// Errors that end a poll before the deadline.
#[derive(Error, Debug)]
pub enum ConvergenceError {
    #[error("Readiness probe failed after {attempts} attempts ({elapsed:?}): {source}")]
    Backend {
        attempts: u32,
        elapsed: Duration,
        #[source]
        source: BackendError,
    },
}

/// Timing of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Total budget measured from the first attempt
    pub deadline: Duration,

    /// Pause between attempts
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            deadline: SHORT_DEADLINE,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollSettings {
    pub fn new(deadline: Duration, interval: Duration) -> Self {
        Self { deadline, interval }
    }

    /// Settings from a plan, resolving the readiness default deadline.
    pub fn from_plan(plan: &RunPlan) -> Self {
        Self {
            deadline: plan.effective_deadline(),
            interval: plan.poll_interval,
        }
    }
}

/// Where a poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceState {
    Pending,
    Achieved,
    TimedOut,
}

/// Outcome of a finished poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvergenceResult {
    pub achieved: bool,

    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,

    pub attempts: u32,

    /// What the last unsuccessful attempt saw, for diagnostics
    pub last_observation: Option<String>,
}

impl ConvergenceResult {
    pub fn state(&self) -> ConvergenceState {
        if self.achieved {
            ConvergenceState::Achieved
        } else {
            ConvergenceState::TimedOut
        }
    }
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&humantime::format_duration(*duration))
}

/// Polls a probe until it reports readiness or the deadline passes.
///
/// The poller is agnostic to which probe it drives. It sleeps on tokio's
/// timer, so concurrent runs never block one another.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvergenceSignal {
    settings: PollSettings,
}

impl ConvergenceSignal {
    pub fn new(settings: PollSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Block (asynchronously) until the probe succeeds or time runs out.
    pub async fn wait(&self, probe: &dyn Probe) -> Result<ConvergenceResult, ConvergenceError> {
        let start = Instant::now();
        let deadline = start + self.settings.deadline;
        let mut state = ConvergenceState::Pending;
        let mut attempts: u32 = 0;
        let mut last_observation = None;

        tracing::debug!(
            probe = %probe.describe(),
            deadline = ?self.settings.deadline,
            interval = ?self.settings.interval,
            "Polling for convergence"
        );

        while state == ConvergenceState::Pending {
            attempts += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());

            match timeout(remaining, probe.check()).await {
                Ok(Ok(ProbeOutcome::Ready)) => {
                    state = ConvergenceState::Achieved;
                    continue;
                }
                Ok(Ok(ProbeOutcome::Pending { observed })) => {
                    tracing::debug!(attempt = attempts, observed = %observed, "Not converged yet");
                    last_observation = Some(observed);
                }
                Ok(Err(e)) if e.is_absence() => {
                    tracing::debug!(attempt = attempts, error = %e, "Not converged yet");
                    last_observation = Some(e.to_string());
                }
                Ok(Err(e)) => {
                    tracing::warn!(attempt = attempts, error = %e, "Readiness probe failed");
                    return Err(ConvergenceError::Backend {
                        attempts,
                        elapsed: start.elapsed(),
                        source: e,
                    });
                }
                Err(_) => {
                    last_observation = Some("probe still running at the deadline".to_string());
                    state = ConvergenceState::TimedOut;
                    continue;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                state = ConvergenceState::TimedOut;
                continue;
            }

            sleep(self.settings.interval.min(deadline - now)).await;

            if Instant::now() >= deadline {
                state = ConvergenceState::TimedOut;
            }
        }

        let result = ConvergenceResult {
            achieved: state == ConvergenceState::Achieved,
            elapsed: start.elapsed(),
            attempts,
            last_observation,
        };

        if result.achieved {
            tracing::info!(
                probe = %probe.describe(),
                attempts,
                elapsed = ?result.elapsed,
                "Convergence achieved"
            );
        } else {
            tracing::warn!(
                probe = %probe.describe(),
                attempts,
                elapsed = ?result.elapsed,
                last = ?result.last_observation,
                "Convergence deadline exceeded"
            );
        }

        Ok(result)
    }
}
