//! Value-changed notifications
//!
//! Fan-out of "quantity X changed to value Y" events to any number of live
//! observers. Delivery is best-effort: a publish with no subscribers is not
//! an error, and subscribers that connect later do not see a replay.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

/// Event published after a quantity's current value changed.
#[derive(Debug, Clone, Serialize)]
pub struct ValueChangedEvent {
    pub quantity_id: String,
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

/// Broadcast handle shared by all workers.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<ValueChangedEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a change to all current subscribers.
    pub fn publish(&self, quantity_id: &str, value: &str, timestamp: DateTime<Utc>) {
        let event = ValueChangedEvent {
            quantity_id: quantity_id.to_string(),
            value: value.to_string(),
            timestamp,
        };

        match self.tx.send(event) {
            Ok(receivers) => trace!("published value change to {receivers} receivers"),
            Err(_) => trace!("no receivers for value change (this is OK)"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ValueChangedEvent> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(256)
    }
}
