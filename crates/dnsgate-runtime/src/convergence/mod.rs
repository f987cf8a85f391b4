//! Convergence detection for provisioned environments.
//!
//! Provisioning finishes asynchronously inside the created environment. A
//! [`Probe`] makes one observation of whether that work is done, and
//! [`ConvergenceSignal`] polls it at a fixed interval until it succeeds or
//! the deadline passes.

mod poller;
mod probe;

pub use poller::{
    ConvergenceError, ConvergenceResult, ConvergenceSignal, ConvergenceState, PollSettings,
};
pub use probe::{
    probe_for, EvidencePresentProbe, MarkerContentProbe, MarkerExistsProbe, Probe, ProbeOutcome,
};
