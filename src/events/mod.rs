//! Change feed for the two watched tables.
//!
//! Handlers publish one event after every successful write; subscribed admin
//! views react by refetching the whole table (coarse-grained by design).
//! Events carry the post-write revision so a subscriber can order them
//! against fetch responses.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Watched tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Members,
    Aspirations,
}

/// Kind of change that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// A single change notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: TableName,
    pub op: ChangeOp,
    /// Revision counter value after the write.
    pub revision_id: i64,
}

/// Broadcast-backed change feed shared across handlers.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all subsequent change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Publish a change event. Delivery is best-effort: with no subscribers
    /// the event is dropped, which is fine because fresh subscribers fetch
    /// the full table on mount anyway.
    pub fn publish(&self, table: TableName, op: ChangeOp, revision_id: i64) {
        let event = ChangeEvent {
            table,
            op,
            revision_id,
        };
        if self.tx.send(event.clone()).is_err() {
            tracing::debug!("No change-feed subscribers for {:?}", event);
        }
    }
}
