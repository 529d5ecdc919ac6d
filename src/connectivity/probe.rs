//! TCP reachability probe.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{ConnectivityMonitor, NetworkState};
use crate::config::ConnectivityConfig;

/// Connectivity monitor that opens a TCP connection to a well-known address.
///
/// A successful connect within the timeout means online; anything else means
/// offline. Subscribers are only notified when the result changes.
pub struct TcpProbe {
    address: String,
    timeout: Duration,
    tx: watch::Sender<NetworkState>,
}

impl TcpProbe {
    /// Create a probe. The state is offline until the first probe runs.
    #[must_use]
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        let (tx, _rx) = watch::channel(NetworkState {
            is_connected: false,
            is_internet_reachable: None,
        });
        Self {
            address: address.into(),
            timeout,
            tx,
        }
    }

    /// Create a probe from configuration.
    #[must_use]
    pub fn from_config(config: &ConnectivityConfig) -> Self {
        Self::new(config.probe_address.clone(), config.probe_timeout())
    }

    /// Probe once and publish the result.
    pub async fn probe(&self) -> NetworkState {
        let reachable = matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await,
            Ok(Ok(_))
        );
        let state = if reachable {
            NetworkState::ONLINE
        } else {
            NetworkState::OFFLINE
        };

        tracing::trace!(address = %self.address, %state, "connectivity probe");

        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        state
    }

    /// Probe every `interval` until the probe is dropped or the task aborted.
    pub fn spawn_polling(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let probe: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(probe) = probe.upgrade() else {
                    break;
                };
                probe.probe().await;
            }
        })
    }
}

#[async_trait]
impl ConnectivityMonitor for TcpProbe {
    async fn fetch_current(&self) -> NetworkState {
        self.probe().await
    }

    fn subscribe(&self) -> watch::Receiver<NetworkState> {
        self.tx.subscribe()
    }
}
