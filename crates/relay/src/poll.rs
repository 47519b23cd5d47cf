//! Receiving side of the relay: bounded polling for a relayed payload.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::store::EphemeralStore;
use crate::{RelayConfig, RelayState};

/// Handle to a running poll.
///
/// Dropping the handle does not stop polling; call
/// [`unsubscribe`](Self::unsubscribe) for that.
pub struct ConfigRequest {
    config_id: String,
    state: Arc<watch::Sender<RelayState>>,
    cancel: CancellationToken,
}

impl ConfigRequest {
    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    pub fn state(&self) -> RelayState {
        *self.state.borrow()
    }

    /// Stops polling. Has no effect once the request has finished.
    pub fn unsubscribe(&self) {
        if transition(&self.state, RelayState::Cancelled) {
            debug!(config_id = %self.config_id, "relay request cancelled");
        }
        self.cancel.cancel();
    }

    /// Waits until the request leaves [`RelayState::Polling`].
    pub async fn finished(&self) -> RelayState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|s| s.is_finished()).await {
            Ok(state) => *state,
            Err(_) => *self.state.borrow(),
        }
    }
}

/// Moves out of `Polling`. Returns `false` if another outcome won.
fn transition(state: &watch::Sender<RelayState>, to: RelayState) -> bool {
    state.send_if_modified(|s| {
        if *s == RelayState::Polling {
            *s = to;
            true
        } else {
            false
        }
    })
}

/// Polls `store` for `config_id` and hands the payload to `on_delivered`.
///
/// The first pull happens immediately, then one every
/// `config.poll_interval`. Missing records and store errors count as "not
/// ready yet". The first payload pulled ends polling: it is decoded into `T`
/// and handed to the callback, or, when decoding fails, the request ends in
/// [`RelayState::Malformed`]. The callback runs at most once; after
/// `config.timeout` without a payload polling stops and the callback is
/// dropped uncalled.
///
/// Must be called from within a tokio runtime.
pub fn request_config<T, F>(
    store: Arc<dyn EphemeralStore>,
    config_id: impl Into<String>,
    config: RelayConfig,
    on_delivered: F,
) -> ConfigRequest
where
    T: DeserializeOwned + Send + 'static,
    F: FnOnce(T) + Send + 'static,
{
    let config_id = config_id.into();
    let (state_tx, _) = watch::channel(RelayState::Polling);
    let state = Arc::new(state_tx);
    let cancel = CancellationToken::new();

    tokio::spawn(poll_loop(
        store,
        config_id.clone(),
        config,
        state.clone(),
        cancel.clone(),
        on_delivered,
    ));

    ConfigRequest {
        config_id,
        state,
        cancel,
    }
}

async fn poll_loop<T, F>(
    store: Arc<dyn EphemeralStore>,
    config_id: String,
    config: RelayConfig,
    state: Arc<watch::Sender<RelayState>>,
    cancel: CancellationToken,
    on_delivered: F,
) where
    T: DeserializeOwned + Send + 'static,
    F: FnOnce(T) + Send + 'static,
{
    let started = Instant::now();

    loop {
        if cancel.is_cancelled() {
            return;
        }

        match pull::<T>(store.as_ref(), &config_id).await {
            Pull::NotReady => {}
            Pull::Ready(payload) => {
                if transition(&state, RelayState::Delivered) {
                    debug!(config_id = %config_id, "relay payload delivered");
                    on_delivered(payload);
                }
                return;
            }
            Pull::Malformed(e) => {
                if transition(&state, RelayState::Malformed) {
                    warn!(config_id = %config_id, error = %e, "relay payload could not be decoded");
                }
                return;
            }
        }

        if started.elapsed() >= config.timeout {
            if transition(&state, RelayState::TimedOut) {
                debug!(config_id = %config_id, "relay request timed out");
            }
            return;
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }
}

enum Pull<T> {
    NotReady,
    Ready(T),
    Malformed(serde_json::Error),
}

async fn pull<T: DeserializeOwned>(store: &dyn EphemeralStore, config_id: &str) -> Pull<T> {
    let payload_json = match store.get(config_id.to_string()).await {
        Ok(Some(json)) => json,
        Ok(None) => return Pull::NotReady,
        Err(e) => {
            trace!(config_id = %config_id, error = %e, "relay pull failed");
            return Pull::NotReady;
        }
    };

    match serde_json::from_str(&payload_json) {
        Ok(payload) => Pull::Ready(payload),
        Err(e) => Pull::Malformed(e),
    }
}
