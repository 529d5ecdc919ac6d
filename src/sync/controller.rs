//! Queue controller: connectivity tracking and queue draining.
//!
//! The controller caches the latest connectivity snapshot, queues mutations
//! that cannot be sent, and replays the queue when the device comes back
//! online. At most one drain pass runs at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::executor::{OperationExecutor, RegisterApi};
use super::operation::{Mutation, QueueStatus, QueuedOperation};
use super::queue::QueueStore;
use super::report::{DrainOutcome, DrainReport};
use crate::config::QueueConfig;
use crate::connectivity::{ConnectivityMonitor, NetworkState};
use crate::error::QueueError;
use crate::storage::KeyValueStore;

/// Result of [`QueueController::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The API accepted the mutation.
    Sent,
    /// The device is offline; the mutation was queued.
    Queued {
        /// Id of the queued operation
        id: String,
    },
}

/// Offline queue controller.
///
/// Create one per application with [`new`](Self::new), then call
/// [`start`](Self::start) to begin tracking connectivity.
pub struct QueueController {
    store: QueueStore,
    executor: OperationExecutor,
    monitor: Arc<dyn ConnectivityMonitor>,
    config: QueueConfig,
    online: AtomicBool,
    draining: AtomicBool,
    started: AtomicBool,
    listener: Mutex<Option<JoinHandle<()>>>,
    reports: broadcast::Sender<DrainReport>,
}

impl QueueController {
    /// Create a controller. It assumes offline until started.
    ///
    /// A `max_retries` of zero is raised to one so every entry is attempted
    /// at least once.
    #[must_use]
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        api: Arc<dyn RegisterApi>,
        monitor: Arc<dyn ConnectivityMonitor>,
        mut config: QueueConfig,
    ) -> Arc<Self> {
        if config.max_retries == 0 {
            warn!("max_retries of 0 would drop entries unsent, using 1");
            config.max_retries = 1;
        }
        let (reports, _) = broadcast::channel(16);
        Arc::new(Self {
            store: QueueStore::new(kv),
            executor: OperationExecutor::new(api),
            monitor,
            config,
            online: AtomicBool::new(false),
            draining: AtomicBool::new(false),
            started: AtomicBool::new(false),
            listener: Mutex::new(None),
            reports,
        })
    }

    /// Start tracking connectivity.
    ///
    /// Takes an initial snapshot and, if online, drains the queue before
    /// returning. Calling `start` again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial drain hits a storage failure.
    pub async fn start(self: &Arc<Self>) -> Result<(), QueueError> {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("queue controller already started");
            return Ok(());
        }

        let mut changes = self.monitor.subscribe();
        let initial = self.monitor.fetch_current().await;
        self.online.store(initial.is_online(), Ordering::SeqCst);
        info!(state = %initial, "queue controller started");

        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let state = *changes.borrow_and_update();
                let Some(controller) = weak.upgrade() else {
                    break;
                };
                controller.on_connectivity(state);
            }
        });
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        if initial.is_online() {
            self.process_queue().await?;
        }
        Ok(())
    }

    /// Stop tracking connectivity. A drain already running finishes.
    pub fn stop(&self) {
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            handle.abort();
            self.started.store(false, Ordering::SeqCst);
            info!("queue controller stopped");
        }
    }

    /// Latest connectivity snapshot.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Whether a drain pass is running.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Queue a mutation for later replay.
    ///
    /// File attachments are stripped; only their metadata is kept.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::UnknownOperation`] for unrecognized mutations,
    /// or a storage error if the queue cannot be written.
    pub async fn enqueue(&self, mutation: Mutation) -> Result<String, QueueError> {
        if let Mutation::Unrecognized { kind, reason, .. } = &mutation {
            return Err(QueueError::UnknownOperation {
                kind: kind.clone(),
                reason: reason.clone(),
            });
        }

        let operation = QueuedOperation::new(mutation);
        let id = operation.id.clone();
        info!(id = %id, kind = operation.mutation.kind(), "queueing operation");

        self.store.append(operation).await?;
        Ok(id)
    }

    /// Send a mutation now if online, otherwise queue it.
    ///
    /// # Errors
    ///
    /// Returns the API error when online, or a storage error when queueing.
    pub async fn submit(&self, mutation: Mutation) -> Result<Submission, QueueError> {
        if !self.is_connected() {
            let id = self.enqueue(mutation).await?;
            return Ok(Submission::Queued { id });
        }

        self.executor.dispatch(&mutation).await?;
        Ok(Submission::Sent)
    }

    /// Count and summarize the queued operations.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    pub async fn queue_status(&self) -> Result<QueueStatus, QueueError> {
        self.store.status().await
    }

    /// Discard every queued operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be removed.
    pub async fn clear_queue(&self) -> Result<(), QueueError> {
        self.store.clear().await?;
        info!("offline queue cleared");
        Ok(())
    }

    /// Receive a report after every drain pass that ran.
    #[must_use]
    pub fn subscribe_reports(&self) -> broadcast::Receiver<DrainReport> {
        self.reports.subscribe()
    }

    /// Replay the queue in order.
    ///
    /// Returns immediately if another pass is running or the device is
    /// offline. A pass stops early when connectivity is lost.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read or written.
    pub async fn process_queue(&self) -> Result<DrainReport, QueueError> {
        let report = {
            let Some(_guard) = DrainGuard::acquire(&self.draining) else {
                debug!("drain already in progress");
                return Ok(DrainReport::new(DrainOutcome::AlreadyRunning));
            };

            if !self.is_connected() {
                debug!("offline, not draining");
                return Ok(DrainReport::new(DrainOutcome::Offline));
            }

            self.drain().await?
        };

        // Nobody listening is fine
        let _ = self.reports.send(report.clone());
        Ok(report)
    }

    async fn drain(&self) -> Result<DrainReport, QueueError> {
        let queue = self.store.load().await?;
        let mut report = DrainReport::new(DrainOutcome::Completed);

        if queue.is_empty() {
            return Ok(report);
        }

        let total = queue.len();
        info!(count = total, "processing offline queue");

        for (index, operation) in queue.into_iter().enumerate() {
            if !self.is_connected() {
                warn!(remaining = total - index, "connectivity lost, stopping drain");
                report.outcome = DrainOutcome::Interrupted;
                report.skipped = total - index;
                break;
            }

            match self.executor.execute(&operation).await {
                Ok(()) => {
                    self.store.remove(&operation.id).await?;
                    debug!(id = %operation.id, "operation replayed");
                    report.succeeded.push(operation.id);
                },
                Err(err) => self.record_failure(operation, &err, &mut report).await?,
            }
        }

        if report.all_succeeded() {
            info!(succeeded = report.succeeded.len(), "drain finished");
        } else {
            warn!(
                succeeded = report.succeeded.len(),
                retrying = report.retrying.len(),
                dropped = report.dropped.len(),
                "drain finished with failures"
            );
        }
        Ok(report)
    }

    async fn record_failure(
        &self,
        operation: QueuedOperation,
        err: &QueueError,
        report: &mut DrainReport,
    ) -> Result<(), QueueError> {
        let retries = operation.retries + 1;

        if matches!(err, QueueError::UnknownOperation { .. }) {
            error!(id = %operation.id, retries, error = %err, "cannot replay operation");
        } else {
            warn!(id = %operation.id, retries, error = %err, "replay failed");
        }

        if retries >= self.config.max_retries {
            warn!(
                id = %operation.id,
                kind = operation.mutation.kind(),
                retries,
                "max retries reached, dropping operation"
            );
            self.store.remove(&operation.id).await?;
            report.dropped.push(operation.id);
        } else {
            self.store.update_retries(&operation.id, retries).await?;
            report.retrying.push(operation.id);
        }
        Ok(())
    }

    fn on_connectivity(self: &Arc<Self>, state: NetworkState) {
        let online = state.is_online();
        let was_online = self.online.swap(online, Ordering::SeqCst);

        match (was_online, online) {
            (false, true) => {
                info!("connectivity restored, draining offline queue");
                let controller = Arc::clone(self);
                tokio::spawn(async move {
                    if let Err(e) = controller.process_queue().await {
                        error!(error = %e, "background drain failed");
                    }
                });
            },
            (true, false) => info!("connectivity lost"),
            _ => {},
        }
    }
}

impl Drop for QueueController {
    fn drop(&mut self) {
        if let Some(handle) = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

/// Holds the single-flight flag for the duration of a drain.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
