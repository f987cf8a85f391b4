//! Backend abstractions for the object and log services a run reads from.
//!
//! The provisioned environment reports progress through an object store
//! (marker objects) and emits DNS evidence into a log store. Both are
//! accessed read-only, so one backend may be shared by concurrent runs.

use async_trait::async_trait;
use thiserror::Error;

use dnsgate_core::ObjectLocator;

mod fs;
mod memory;

pub use fs::{FsLogStore, FsObjectStore};
pub use memory::{MemoryLogStore, MemoryObjectStore};

/// Errors from backend services.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Whether the error only means "not there yet".
    ///
    /// Absence is ordinary polling state; every other error is fatal.
    pub fn is_absence(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }
}

/// Object storage holding marker objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the full content of an object.
    async fn get_object(&self, locator: &ObjectLocator) -> Result<Vec<u8>, BackendError>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// Log storage holding raw evidence payloads.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// List every event currently in a stream, oldest first.
    async fn list_events(&self, stream: &str) -> Result<Vec<String>, BackendError>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_not_found_is_absence() {
        assert!(BackendError::NotFound("x".into()).is_absence());
        assert!(!BackendError::AccessDenied("x".into()).is_absence());
        assert!(!BackendError::InvalidRequest("x".into()).is_absence());
        assert!(!BackendError::Unavailable("x".into()).is_absence());
    }
}
