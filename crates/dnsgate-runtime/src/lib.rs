//! # dnsgate-runtime
//!
//! Async execution for dnsgate runs.
//!
//! `dnsgate-core` decides whether a batch of DNS evidence is clean. This
//! crate gets the batch: it waits for the environment to signal readiness,
//! pulls the evidence from a log backend, and hands it to the core.
//!
//! ## Backends
//!
//! - [`MemoryObjectStore`] / [`MemoryLogStore`]: in-process, scriptable
//! - [`FsObjectStore`] / [`FsLogStore`]: fixtures on disk
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dnsgate_core::RunPlan;
//! use dnsgate_runtime::{FsLogStore, FsObjectStore, OrchestratorBuilder};
//!
//! let orchestrator = OrchestratorBuilder::new()
//!     .objects(Arc::new(FsObjectStore::new("fixtures/objects")))
//!     .logs(Arc::new(FsLogStore::new("fixtures/logs")))
//!     .build()?;
//!
//! let plan = RunPlan::from_file("plan.yaml")?;
//! let outcome = orchestrator.run(&plan).await?;
//! println!("{}", outcome.verdict);
//! ```

pub mod backends;
pub mod collector;
pub mod convergence;
pub mod orchestrator;

pub use backends::{
    BackendError, FsLogStore, FsObjectStore, LogStore, MemoryLogStore, MemoryObjectStore,
    ObjectStore,
};
pub use collector::EvidenceCollector;
pub use convergence::{
    probe_for, ConvergenceError, ConvergenceResult, ConvergenceSignal, ConvergenceState,
    PollSettings, Probe, ProbeOutcome,
};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, RunError, RunOutcome};
