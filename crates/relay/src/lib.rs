//! Ephemeral config relay.
//!
//! One context stores a payload under a generated id and passes the id
//! along (usually as the `c__configId` navigation state). The receiving
//! context polls the store until the payload shows up or the timeout
//! elapses.

pub mod context;
pub mod poll;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

use std::time::Duration;

use cloudfiles_protocol::constants::{RELAY_POLL_INTERVAL, RELAY_TIMEOUT};

pub use context::{ContextKind, NavigationCapability, Page, RuntimeContext, config_state};
pub use poll::{ConfigRequest, request_config};
pub use session::{ConfigSession, Subscription, start_session, stop_session};
pub use store::{EphemeralStore, MemoryStore, StoreFuture};

/// Errors produced by the relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("unable to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(String),
}

/// Polling cadence for [`request_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// Delay between the end of one pull and the start of the next.
    pub poll_interval: Duration,
    /// Polling stops once this much time has passed without a delivery.
    pub timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: RELAY_POLL_INTERVAL,
            timeout: RELAY_TIMEOUT,
        }
    }
}

/// Lifecycle of a [`ConfigRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Polling,
    /// The payload was handed to the callback.
    Delivered,
    /// A payload arrived but could not be decoded. Polling stopped and the
    /// callback was never called.
    Malformed,
    /// Nothing arrived in time; the callback was never called.
    TimedOut,
    /// The caller unsubscribed first.
    Cancelled,
}

impl RelayState {
    pub fn is_finished(self) -> bool {
        self != RelayState::Polling
    }
}
