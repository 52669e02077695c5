//! Background delivery of profile change notifications
//!
//! Writes enqueue an event and return immediately. A single worker drains
//! the queue into a [`NotificationSink`]; delivery failures are logged and
//! never undo the write that produced the event.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Something that happened to a profile after it was committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEvent {
    Created { user_id: String },
    Updated { user_id: String },
    HandlesOverridden { user_id: String, admin_id: String },
}

impl ProfileEvent {
    pub fn user_id(&self) -> &str {
        match self {
            ProfileEvent::Created { user_id }
            | ProfileEvent::Updated { user_id }
            | ProfileEvent::HandlesOverridden { user_id, .. } => user_id,
        }
    }
}

/// Destination for profile events (mail, webhooks, ...)
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: &ProfileEvent) -> anyhow::Result<()>;
}

/// Sink that only records events in the log
#[derive(Debug, Default, Clone)]
pub struct LoggingSink;

#[async_trait]
impl NotificationSink for LoggingSink {
    async fn deliver(&self, event: &ProfileEvent) -> anyhow::Result<()> {
        info!("Profile event for user {}: {:?}", event.user_id(), event);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct NotifierMetrics {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of notifier counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifierMetricsSnapshot {
    pub enqueued: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// Non-blocking producer side of the notification queue
#[derive(Clone)]
pub struct ProfileNotifier {
    tx: flume::Sender<ProfileEvent>,
    rx: flume::Receiver<ProfileEvent>,
    metrics: Arc<NotifierMetrics>,
}

impl ProfileNotifier {
    pub fn new(queue_size: usize) -> Self {
        let (tx, rx) = flume::bounded(queue_size.max(1));
        Self {
            tx,
            rx,
            metrics: Arc::new(NotifierMetrics::default()),
        }
    }

    /// Enqueue an event; a full queue drops it with a warning
    pub fn notify(&self, event: ProfileEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.metrics.enqueued.fetch_add(1, AtomicOrdering::Relaxed);
            }
            Err(flume::TrySendError::Full(event)) => {
                self.metrics.dropped.fetch_add(1, AtomicOrdering::Relaxed);
                warn!(
                    "Notification queue full, dropping event for user {}",
                    event.user_id()
                );
            }
            Err(flume::TrySendError::Disconnected(event)) => {
                self.metrics.dropped.fetch_add(1, AtomicOrdering::Relaxed);
                warn!(
                    "Notification queue closed, dropping event for user {}",
                    event.user_id()
                );
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Spawn the worker that drains the queue into `sink`
    pub fn spawn_worker(
        &self,
        sink: Arc<dyn NotificationSink>,
        cancellation_token: CancellationToken,
        task_tracker: &TaskTracker,
    ) {
        let rx = self.rx.clone();
        let metrics = self.metrics.clone();

        task_tracker.spawn(async move {
            debug!("Profile notification worker started");

            loop {
                tokio::select! {
                    result = rx.recv_async() => {
                        match result {
                            Ok(event) => Self::deliver(&*sink, &metrics, event).await,
                            Err(_) => {
                                debug!("Notification worker shutting down - channel closed");
                                break;
                            }
                        }
                    }

                    _ = cancellation_token.cancelled() => {
                        debug!("Notification worker received cancellation signal");
                        break;
                    }
                }
            }

            // Flush whatever was already queued before stopping
            while let Ok(event) = rx.try_recv() {
                Self::deliver(&*sink, &metrics, event).await;
            }

            debug!("Profile notification worker stopped");
        });
    }

    async fn deliver(sink: &dyn NotificationSink, metrics: &NotifierMetrics, event: ProfileEvent) {
        match sink.deliver(&event).await {
            Ok(()) => {
                metrics.delivered.fetch_add(1, AtomicOrdering::Relaxed);
            }
            Err(e) => {
                metrics.failed.fetch_add(1, AtomicOrdering::Relaxed);
                warn!(
                    "Failed to deliver profile event for user {}: {}",
                    event.user_id(),
                    e
                );
            }
        }
    }

    pub fn metrics(&self) -> NotifierMetricsSnapshot {
        NotifierMetricsSnapshot {
            enqueued: self.metrics.enqueued.load(AtomicOrdering::Relaxed),
            dropped: self.metrics.dropped.load(AtomicOrdering::Relaxed),
            delivered: self.metrics.delivered.load(AtomicOrdering::Relaxed),
            failed: self.metrics.failed.load(AtomicOrdering::Relaxed),
        }
    }
}
