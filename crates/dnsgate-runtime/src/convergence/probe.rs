//! Readiness probes.
//!
//! A probe makes one observation of the environment. It does not decide
//! whether an error is transient; the poller does that.

use async_trait::async_trait;
use std::sync::Arc;

use dnsgate_core::{ObjectLocator, Readiness};

use crate::backends::{BackendError, LogStore, ObjectStore};

/// Result of one successful observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The environment reports readiness
    Ready,

    /// Not ready yet; `observed` describes what was seen
    Pending { observed: String },
}

/// One completion-detection strategy.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Observe the environment once.
    async fn check(&self) -> Result<ProbeOutcome, BackendError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Ready once the marker object holds exactly the expected content.
pub struct MarkerContentProbe {
    store: Arc<dyn ObjectStore>,
    object: ObjectLocator,
    expected: String,
}

impl MarkerContentProbe {
    pub fn new(store: Arc<dyn ObjectStore>, object: ObjectLocator, expected: impl Into<String>) -> Self {
        Self {
            store,
            object,
            expected: expected.into(),
        }
    }
}

#[async_trait]
impl Probe for MarkerContentProbe {
    async fn check(&self) -> Result<ProbeOutcome, BackendError> {
        let content = self.store.get_object(&self.object).await?;

        if content == self.expected.as_bytes() {
            Ok(ProbeOutcome::Ready)
        } else {
            Ok(ProbeOutcome::Pending {
                observed: format!(
                    "{} holds {:?}, expected {:?}",
                    self.object,
                    String::from_utf8_lossy(&content),
                    self.expected
                ),
            })
        }
    }

    fn describe(&self) -> String {
        format!("marker content at {}", self.object)
    }
}

/// Ready once the marker object exists.
pub struct MarkerExistsProbe {
    store: Arc<dyn ObjectStore>,
    object: ObjectLocator,
}

impl MarkerExistsProbe {
    pub fn new(store: Arc<dyn ObjectStore>, object: ObjectLocator) -> Self {
        Self { store, object }
    }
}

#[async_trait]
impl Probe for MarkerExistsProbe {
    async fn check(&self) -> Result<ProbeOutcome, BackendError> {
        self.store.get_object(&self.object).await?;
        Ok(ProbeOutcome::Ready)
    }

    fn describe(&self) -> String {
        format!("marker object {}", self.object)
    }
}

/// Ready once the evidence stream holds at least one event.
pub struct EvidencePresentProbe {
    store: Arc<dyn LogStore>,
    stream: String,
}

impl EvidencePresentProbe {
    pub fn new(store: Arc<dyn LogStore>, stream: impl Into<String>) -> Self {
        Self {
            store,
            stream: stream.into(),
        }
    }
}

#[async_trait]
impl Probe for EvidencePresentProbe {
    async fn check(&self) -> Result<ProbeOutcome, BackendError> {
        let events = self.store.list_events(&self.stream).await?;

        if events.is_empty() {
            Ok(ProbeOutcome::Pending {
                observed: format!("log stream '{}' is empty", self.stream),
            })
        } else {
            Ok(ProbeOutcome::Ready)
        }
    }

    fn describe(&self) -> String {
        format!("evidence in log stream '{}'", self.stream)
    }
}

/// Build the probe a readiness setting asks for.
pub fn probe_for(
    readiness: &Readiness,
    stream: &str,
    objects: Arc<dyn ObjectStore>,
    logs: Arc<dyn LogStore>,
) -> Box<dyn Probe> {
    match readiness {
        Readiness::MarkerContent { object, expected } => {
            Box::new(MarkerContentProbe::new(objects, object.clone(), expected.clone()))
        }
        Readiness::MarkerExists { object } => {
            Box::new(MarkerExistsProbe::new(objects, object.clone()))
        }
        Readiness::EvidencePresent => Box::new(EvidencePresentProbe::new(logs, stream)),
    }
}
