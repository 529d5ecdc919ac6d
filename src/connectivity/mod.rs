//! Connectivity monitoring.
//!
//! The queue controller consumes connectivity through the
//! [`ConnectivityMonitor`] trait: an on-demand query plus a stream of state
//! changes. Two monitors are provided:
//! - [`ManualConnectivity`]: state pushed by the host platform (or a test)
//! - [`TcpProbe`]: periodic TCP reachability checks

mod manual;
mod probe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

pub use manual::ManualConnectivity;
pub use probe::TcpProbe;

/// Connectivity as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkState {
    /// A network interface is up.
    pub is_connected: bool,
    /// Whether the internet is reachable; `None` while still unknown.
    pub is_internet_reachable: Option<bool>,
}

impl NetworkState {
    /// Connected with the internet confirmed reachable.
    pub const ONLINE: Self = Self {
        is_connected: true,
        is_internet_reachable: Some(true),
    };

    /// No connectivity at all.
    pub const OFFLINE: Self = Self {
        is_connected: false,
        is_internet_reachable: Some(false),
    };

    /// Whether queued operations may be replayed.
    ///
    /// Unknown reachability counts as online as long as an interface is up;
    /// only an explicit "not reachable" keeps a connected device offline.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        self.is_connected && !matches!(self.is_internet_reachable, Some(false))
    }
}

impl std::fmt::Display for NetworkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_online() {
            write!(f, "online")
        } else {
            write!(f, "offline")
        }
    }
}

/// Source of connectivity state and change notifications.
#[async_trait]
pub trait ConnectivityMonitor: Send + Sync {
    /// Query the current state.
    async fn fetch_current(&self) -> NetworkState;

    /// Subscribe to state changes. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> watch::Receiver<NetworkState>;
}
