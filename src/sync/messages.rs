//! Message types for the synchronization engine
//!
//! Commands are request/response messages sent to a specific worker via mpsc;
//! status records are the operator-visible "last known state" per connection.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

/// Commands that can be sent to a SyncWorker
#[derive(Debug)]
pub enum WorkerCommand {
    /// Trigger an immediate fetch-and-apply (bypassing the interval timer)
    PollNow {
        /// Channel to send the result back
        respond_to: oneshot::Sender<anyhow::Result<()>>,
    },

    /// Update the polling interval
    ///
    /// The new interval takes effect immediately.
    UpdateInterval {
        /// New interval in seconds
        interval_secs: u64,
    },

    /// Gracefully shut down the worker
    ///
    /// The ack fires after the worker has left its loop, so once it is
    /// received no further ticks can run.
    Shutdown {
        /// Acknowledged once the loop has exited
        respond_to: oneshot::Sender<()>,
    },
}

/// Last observed outcome for one connection
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub connection_name: String,

    /// Quantity the connection feeds
    pub quantity_id: String,

    /// Whether the most recent attempt succeeded
    pub healthy: bool,

    /// Value delivered by the most recent successful attempt
    pub last_value: Option<String>,

    /// Error message of the most recent failed attempt
    pub message: Option<String>,

    pub last_attempt: DateTime<Utc>,
}
