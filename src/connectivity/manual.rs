//! Host-driven connectivity monitor.

use async_trait::async_trait;
use tokio::sync::watch;

use super::{ConnectivityMonitor, NetworkState};

/// Connectivity monitor whose state is set explicitly.
///
/// Embedding hosts forward platform connectivity callbacks to [`set`];
/// tests use it to script online/offline transitions.
///
/// [`set`]: ManualConnectivity::set
pub struct ManualConnectivity {
    tx: watch::Sender<NetworkState>,
}

impl ManualConnectivity {
    /// Create a monitor with the given initial state.
    #[must_use]
    pub fn new(initial: NetworkState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Create a monitor that starts online.
    #[must_use]
    pub fn online() -> Self {
        Self::new(NetworkState::ONLINE)
    }

    /// Create a monitor that starts offline.
    #[must_use]
    pub fn offline() -> Self {
        Self::new(NetworkState::OFFLINE)
    }

    /// Publish a new state to all subscribers.
    pub fn set(&self, state: NetworkState) {
        tracing::debug!(%state, "connectivity changed");
        self.tx.send_replace(state);
    }

    /// Shorthand for publishing [`NetworkState::ONLINE`] or
    /// [`NetworkState::OFFLINE`].
    pub fn set_online(&self, online: bool) {
        self.set(if online {
            NetworkState::ONLINE
        } else {
            NetworkState::OFFLINE
        });
    }

    /// Current state without awaiting.
    #[must_use]
    pub fn current(&self) -> NetworkState {
        *self.tx.borrow()
    }
}

#[async_trait]
impl ConnectivityMonitor for ManualConnectivity {
    async fn fetch_current(&self) -> NetworkState {
        self.current()
    }

    fn subscribe(&self) -> watch::Receiver<NetworkState> {
        self.tx.subscribe()
    }
}
