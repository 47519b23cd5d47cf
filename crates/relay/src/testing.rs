//! Instrumented store for relay tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use cloudfiles_protocol::messages::ConfigRecord;

use crate::RelayError;
use crate::store::{EphemeralStore, MemoryStore, StoreFuture};

#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub deletes: AtomicUsize,
    pub id_requests: AtomicUsize,
    /// Payload that appears on the n-th get (1-based).
    pub appears_on_get: Mutex<Option<(usize, String)>>,
    pub fail_gets: bool,
    pub fail_deletes: bool,
}

impl CountingStore {
    pub fn with_payload_on_get(n: usize, payload_json: &str) -> Self {
        Self {
            appears_on_get: Mutex::new(Some((n, payload_json.to_string()))),
            ..Default::default()
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl EphemeralStore for CountingStore {
    fn generate_id(&self) -> StoreFuture<'_, String> {
        self.id_requests.fetch_add(1, Ordering::SeqCst);
        self.inner.generate_id()
    }

    fn put(&self, record: ConfigRecord) -> StoreFuture<'_, ()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(record)
    }

    fn get(&self, config_id: String) -> StoreFuture<'_, Option<String>> {
        let n = self.gets.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_gets {
            return Box::pin(async { Err(RelayError::Store("unreachable".into())) });
        }
        let appears = self
            .appears_on_get
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(at, _)| n >= *at)
            .map(|(_, payload)| payload.clone());
        match appears {
            Some(payload) => Box::pin(async move { Ok(Some(payload)) }),
            None => self.inner.get(config_id),
        }
    }

    fn delete(&self, config_id: String) -> StoreFuture<'_, ()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes {
            return Box::pin(async { Err(RelayError::Store("delete refused".into())) });
        }
        self.inner.delete(config_id)
    }
}
