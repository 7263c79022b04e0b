//! Task queue abstraction
//!
//! The queue delivers at-least-once notifications of changed record ids.
//! Messages stay in flight until explicitly acknowledged; an unacknowledged
//! message is redelivered, which is what gives the notification pipeline its
//! eventually-consistent semantics.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// One pulled message: an opaque acknowledgment token plus the raw payload.
///
/// The payload is kept raw because a malformed producer message must not
/// fail the pull; the worker parses and quarantines it per message.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    /// Token passed back to [`TaskQueue::acknowledge`].
    pub ack_token: String,
    /// Raw notification payload, expected shape `{"Id": <integer>}`.
    pub payload: Value,
}

/// Interface to the change-notification queue.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Pull up to `max` messages, blocking until at least one is available
    /// (long-poll semantics, not busy-spin). Returning an empty list is
    /// allowed when the implementation's poll window elapses.
    async fn pull(&self, max: usize) -> Result<Vec<QueueMessage>>;

    /// Acknowledge a message so it will not be redelivered.
    async fn acknowledge(&self, ack_token: &str) -> Result<()>;
}
