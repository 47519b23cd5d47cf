//! Sending side of the relay.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cloudfiles_protocol::messages::ConfigRecord;
use serde::Serialize;
use tracing::{debug, warn};

use crate::RelayError;
use crate::store::EphemeralStore;

/// A stored payload and the handle that removes it.
pub struct ConfigSession {
    pub config_id: String,
    pub subscription: Subscription,
}

/// Removes the relayed record once the sender no longer needs it.
pub struct Subscription {
    store: Arc<dyn EphemeralStore>,
    config_id: String,
    active: AtomicBool,
}

impl Subscription {
    /// Takes over cleanup of a record stored elsewhere, e.g. by another
    /// process that handed over only the id.
    pub fn new(store: Arc<dyn EphemeralStore>, config_id: impl Into<String>) -> Self {
        Self {
            store,
            config_id: config_id.into(),
            active: AtomicBool::new(true),
        }
    }

    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Deletes the record. Store errors are logged, never returned.
    /// Only the first call reaches the store.
    pub async fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        match self.store.delete(self.config_id.clone()).await {
            Ok(()) => debug!(config_id = %self.config_id, "relay record removed"),
            Err(e) => warn!(config_id = %self.config_id, error = %e, "failed to remove relay record"),
        }
    }
}

/// Serializes `payload`, reserves an id and stores the record.
///
/// Serialization happens first, so a payload that cannot be encoded never
/// touches the store.
pub async fn start_session<T: Serialize + ?Sized>(
    store: Arc<dyn EphemeralStore>,
    payload: &T,
) -> Result<ConfigSession, RelayError> {
    let payload_json = serde_json::to_string(payload)?;
    let config_id = store.generate_id().await?;

    store
        .put(ConfigRecord {
            config_id: config_id.clone(),
            payload_json,
        })
        .await?;
    debug!(config_id = %config_id, "relay session started");

    Ok(ConfigSession {
        subscription: Subscription::new(store, config_id.clone()),
        config_id,
    })
}

/// Unsubscribes if a subscription is present.
pub async fn stop_session(subscription: Option<&Subscription>) {
    if let Some(subscription) = subscription {
        subscription.unsubscribe().await;
    }
}
