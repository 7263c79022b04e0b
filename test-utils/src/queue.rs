//! In-memory task queue with long-poll pull and explicit acknowledgment

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use syncflow::{QueueMessage, Result, TaskQueue};
use tokio::sync::Notify;

#[derive(Default)]
struct QueueState {
    available: VecDeque<QueueMessage>,
    in_flight: BTreeMap<String, QueueMessage>,
    acked: Vec<String>,
    next_token: u64,
}

/// Deterministic, in-process [`TaskQueue`].
///
/// `pull` parks on a notify handle while the queue is empty, matching
/// long-poll semantics; workers racing it against a shutdown signal cancel
/// cleanly. Unacknowledged messages stay in flight until
/// [`redeliver_unacked`](Self::redeliver_unacked) moves them back, modeling
/// the queue's at-least-once redelivery.
#[derive(Default)]
pub struct InMemoryTaskQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

#[allow(clippy::unwrap_used)]
impl InMemoryTaskQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a well-formed change notification, returning its ack token.
    pub fn push_notification(&self, record_id: i64) -> String {
        self.push_raw(json!({ "Id": record_id }))
    }

    /// Enqueue an arbitrary payload, returning its ack token.
    pub fn push_raw(&self, payload: Value) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_token += 1;
        let token = format!("ack-{}", state.next_token);
        state.available.push_back(QueueMessage {
            ack_token: token.clone(),
            payload,
        });
        drop(state);
        self.notify.notify_waiters();
        token
    }

    /// Tokens acknowledged so far, in order.
    #[must_use]
    pub fn acked(&self) -> Vec<String> {
        self.state.lock().unwrap().acked.clone()
    }

    /// Messages pulled but not acknowledged.
    #[must_use]
    pub fn unacked_in_flight(&self) -> usize {
        self.state.lock().unwrap().in_flight.len()
    }

    /// Messages not yet pulled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().available.len()
    }

    /// Move every unacknowledged in-flight message back to the front of the
    /// queue, as the broker does when a visibility window lapses.
    pub fn redeliver_unacked(&self) {
        let mut state = self.state.lock().unwrap();
        let redelivered: Vec<QueueMessage> = std::mem::take(&mut state.in_flight)
            .into_values()
            .collect();
        for message in redelivered.into_iter().rev() {
            state.available.push_front(message);
        }
        drop(state);
        self.notify.notify_waiters();
    }
}

#[allow(clippy::unwrap_used)]
#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn pull(&self, max: usize) -> Result<Vec<QueueMessage>> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock().unwrap();
                if !state.available.is_empty() {
                    let take = max.min(state.available.len());
                    let mut pulled = Vec::with_capacity(take);
                    for _ in 0..take {
                        let message = state.available.pop_front().unwrap();
                        state
                            .in_flight
                            .insert(message.ack_token.clone(), message.clone());
                        pulled.push(message);
                    }
                    return Ok(pulled);
                }
            }
            notified.await;
        }
    }

    async fn acknowledge(&self, ack_token: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.in_flight.remove(ack_token).is_some() {
            state.acked.push(ack_token.to_string());
        }
        Ok(())
    }
}
