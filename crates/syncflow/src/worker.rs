//! Change-notification worker
//!
//! A long-running cooperative loop that drains the task queue and applies
//! each notification through the single-record delta path, acknowledging
//! only after successful application. Anything less than success leaves the
//! message in flight so the queue redelivers it; the loop itself never
//! crashes on one bad record.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::backend::SearchBackend;
use crate::config::WorkerConfig;
use crate::delta::DeltaSyncer;
use crate::queue::TaskQueue;
use crate::record::ChangeNotification;
use crate::store::RecordStore;

/// Pause before re-polling after a queue transport failure.
const PULL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Continuously processes change notifications until the shutdown signal
/// flips.
///
/// Processing order within one pulled batch is not guaranteed to match
/// production order; the idempotent delete-then-insert resolution makes the
/// final state correct regardless.
pub struct ChangeNotificationWorker<'a, Q, B, S>
where
    Q: TaskQueue + ?Sized,
    B: SearchBackend + ?Sized,
    S: RecordStore + ?Sized,
{
    queue: &'a Q,
    syncer: &'a DeltaSyncer<'a, B, S>,
    config: WorkerConfig,
}

impl<'a, Q, B, S> ChangeNotificationWorker<'a, Q, B, S>
where
    Q: TaskQueue + ?Sized,
    B: SearchBackend + ?Sized,
    S: RecordStore + ?Sized,
{
    /// Wire a worker against its queue and syncer.
    pub fn new(queue: &'a Q, syncer: &'a DeltaSyncer<'a, B, S>, config: WorkerConfig) -> Self {
        Self {
            queue,
            syncer,
            config,
        }
    }

    /// Run until `shutdown` carries `true`.
    ///
    /// The signal is checked between pulls and raced against the in-flight
    /// pull, so tests can run a bounded number of cycles deterministically
    /// and shutdown never waits out a long poll.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let pulled = tokio::select! {
                _ = shutdown.changed() => break,
                pulled = self.queue.pull(self.config.pull_limit) => pulled,
            };

            let messages = match pulled {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(error = %e, "queue pull failed");
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        () = tokio::time::sleep(PULL_RETRY_DELAY) => continue,
                    }
                }
            };

            for message in messages {
                self.process(&message.ack_token, &message.payload).await;
            }
        }
        debug!("change notification worker stopped");
    }

    /// Apply one notification and acknowledge on success. Failures are
    /// logged with the record id and leave the message unacknowledged for
    /// redelivery; a malformed payload is logged and also left to the
    /// queue's redelivery policy.
    async fn process(&self, ack_token: &str, payload: &serde_json::Value) {
        let notification = match ChangeNotification::from_payload(payload) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "discarding unparseable notification");
                return;
            }
        };

        if let Err(e) = self.syncer.sync_one(notification.id).await {
            warn!(record_id = notification.id, error = %e, "sync failed, leaving unacknowledged");
            return;
        }

        if let Err(e) = self.queue.acknowledge(ack_token).await {
            // The sync itself succeeded; redelivery will re-run an
            // idempotent resolution.
            warn!(record_id = notification.id, error = %e, "acknowledge failed");
        } else {
            debug!(record_id = notification.id, "notification applied");
        }
    }
}
