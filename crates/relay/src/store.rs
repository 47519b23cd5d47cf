//! Short-lived key/value store backing the relay.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use cloudfiles_protocol::messages::ConfigRecord;

use crate::RelayError;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RelayError>> + Send + 'a>>;

/// Remote store reachable from both sides of the relay.
pub trait EphemeralStore: Send + Sync {
    /// Issues a fresh, unguessable record id.
    fn generate_id(&self) -> StoreFuture<'_, String>;

    fn put(&self, record: ConfigRecord) -> StoreFuture<'_, ()>;

    /// Returns the stored payload JSON, `None` when nothing is stored yet.
    fn get(&self, config_id: String) -> StoreFuture<'_, Option<String>>;

    /// Removes the record. Deleting a missing record is not an error.
    fn delete(&self, config_id: String) -> StoreFuture<'_, ()>;
}

/// In-process store keyed by UUID v4 ids.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, RelayError> {
        self.records
            .lock()
            .map_err(|_| RelayError::Store("store lock poisoned".into()))
    }
}

impl EphemeralStore for MemoryStore {
    fn generate_id(&self) -> StoreFuture<'_, String> {
        Box::pin(async { Ok(uuid::Uuid::new_v4().to_string()) })
    }

    fn put(&self, record: ConfigRecord) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.lock()?.insert(record.config_id, record.payload_json);
            Ok(())
        })
    }

    fn get(&self, config_id: String) -> StoreFuture<'_, Option<String>> {
        Box::pin(async move { Ok(self.lock()?.get(&config_id).cloned()) })
    }

    fn delete(&self, config_id: String) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.lock()?.remove(&config_id);
            Ok(())
        })
    }
}
