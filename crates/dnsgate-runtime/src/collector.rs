//! One-shot evidence collection from a log stream.

use std::sync::Arc;

use crate::backends::{BackendError, LogStore};

/// Fetches every raw payload currently in a stream.
///
/// Exactly one backend call per collection. An empty stream is a valid
/// (empty) batch; waiting for evidence to appear is the job of the
/// evidence-present readiness probe. Every backend error, including a
/// missing stream, is returned to the caller.
pub struct EvidenceCollector {
    store: Arc<dyn LogStore>,
}

impl EvidenceCollector {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Collect the stream's payloads, oldest first.
    pub async fn collect(&self, stream: &str) -> Result<Vec<String>, BackendError> {
        tracing::info!(stream, backend = self.store.name(), "Collecting evidence");

        match self.store.list_events(stream).await {
            Ok(payloads) => {
                tracing::info!(stream, count = payloads.len(), "Evidence collected");
                Ok(payloads)
            }
            Err(e) => {
                tracing::warn!(stream, error = %e, "Evidence collection failed");
                Err(e)
            }
        }
    }
}
