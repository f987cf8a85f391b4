//! In-process backends.
//!
//! Both stores can be primed with a queue of scripted responses that are
//! served before falling back to stored content. This models eventually
//! consistent services ("not found" a few times, then present).

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

use dnsgate_core::ObjectLocator;

use super::{BackendError, LogStore, ObjectStore};

/// In-memory object store.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<ObjectLocator, Vec<u8>>>,
    scripted: Mutex<VecDeque<Result<Vec<u8>, BackendError>>>,
    calls: AtomicU32,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace an object.
    pub fn put(&self, locator: ObjectLocator, content: impl Into<Vec<u8>>) {
        self.objects.write().insert(locator, content.into());
    }

    /// Delete an object.
    pub fn remove(&self, locator: &ObjectLocator) {
        self.objects.write().remove(locator);
    }

    /// Queue responses served, in order, before stored content.
    pub fn script(&self, responses: impl IntoIterator<Item = Result<Vec<u8>, BackendError>>) {
        self.scripted.lock().extend(responses);
    }

    /// Number of `get_object` calls served.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, locator: &ObjectLocator) -> Result<Vec<u8>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(response) = self.scripted.lock().pop_front() {
            return response;
        }

        self.objects
            .read()
            .get(locator)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(locator.to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// In-memory log store.
#[derive(Default)]
pub struct MemoryLogStore {
    streams: RwLock<HashMap<String, Vec<String>>>,
    scripted: Mutex<VecDeque<Result<Vec<String>, BackendError>>>,
    calls: AtomicU32,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stream with no events.
    pub fn create_stream(&self, stream: impl Into<String>) {
        self.streams.write().entry(stream.into()).or_default();
    }

    /// Append one event, creating the stream if needed.
    pub fn push(&self, stream: impl Into<String>, payload: impl Into<String>) {
        self.streams
            .write()
            .entry(stream.into())
            .or_default()
            .push(payload.into());
    }

    /// Queue responses served, in order, before stored streams.
    pub fn script(&self, responses: impl IntoIterator<Item = Result<Vec<String>, BackendError>>) {
        self.scripted.lock().extend(responses);
    }

    /// Number of `list_events` calls served.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn list_events(&self, stream: &str) -> Result<Vec<String>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(response) = self.scripted.lock().pop_front() {
            return response;
        }

        self.streams
            .read()
            .get(stream)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("log stream '{}'", stream)))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
