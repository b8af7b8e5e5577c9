//! SyncWorker - polls one connection's external source
//!
//! Each enabled connection gets its own worker. The worker runs in an
//! infinite loop: on every tick it fetches a value through its adapter,
//! applies it via the update service and publishes the change. The interval
//! ticker fires immediately on start, so a freshly enabled connection
//! reflects data without waiting a full period.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → Adapter.fetch → UpdateService.apply → Notifier.publish
//!     ↑
//!     └─── Commands (PollNow, UpdateInterval, Shutdown)
//! ```
//!
//! Fetch and apply failures are recorded in the status map and retried on
//! the next regular tick; they never crash the worker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, instrument, trace, warn};

use crate::adapters::Adapter;
use crate::config::ConnectionConfig;
use crate::notify::Notifier;
use crate::update::UpdateService;

use super::messages::{ConnectionStatus, WorkerCommand};

/// Shared map of per-connection statuses, keyed by connection name.
pub type StatusMap = Arc<RwLock<HashMap<String, ConnectionStatus>>>;

/// Actor that synchronizes a single connection
pub struct SyncWorker {
    /// Connection configuration (read-only; changes arrive as a restart)
    config: ConnectionConfig,

    /// The adapter resolved for this connection's type
    adapter: Box<dyn Adapter>,

    updater: Arc<UpdateService>,

    notifier: Notifier,

    statuses: StatusMap,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<WorkerCommand>,

    /// Current polling interval
    interval_duration: Duration,
}

impl SyncWorker {
    pub fn new(
        config: ConnectionConfig,
        adapter: Box<dyn Adapter>,
        updater: Arc<UpdateService>,
        notifier: Notifier,
        statuses: StatusMap,
        command_rx: mpsc::Receiver<WorkerCommand>,
    ) -> Self {
        let interval_duration = Duration::from_secs(config.polling_period_seconds.max(1) as u64);

        Self {
            config,
            adapter,
            updater,
            notifier,
            statuses,
            command_rx,
            interval_duration,
        }
    }

    /// Run the worker's main loop
    ///
    /// Runs until a Shutdown command is received or the command channel is
    /// closed. The first tick fires immediately.
    #[instrument(skip(self), fields(connection = %self.config.name))]
    pub async fn run(mut self) {
        debug!(
            "starting sync worker ({}, every {}s)",
            self.adapter.kind(),
            self.interval_duration.as_secs()
        );

        let mut ticker = interval(self.interval_duration);

        loop {
            tokio::select! {
                // Timer tick - one fetch-apply-publish step, run to completion
                _ = ticker.tick() => {
                    if let Err(e) = self.sync_once().await {
                        warn!("synchronization failed: {e:#}");
                    }
                }

                // Handle commands
                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        WorkerCommand::PollNow { respond_to } => {
                            debug!("received PollNow command");
                            let result = self.sync_once().await;
                            let _ = respond_to.send(result);
                        }

                        WorkerCommand::UpdateInterval { interval_secs } => {
                            debug!("updating interval to {interval_secs}s");
                            self.interval_duration = Duration::from_secs(interval_secs.max(1));
                            ticker = interval(self.interval_duration);
                        }

                        WorkerCommand::Shutdown { respond_to } => {
                            debug!("received shutdown command");
                            let _ = respond_to.send(());
                            break;
                        }
                    }
                }

                // Command channel closed - exit
                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("sync worker stopped");
    }

    /// One synchronization step: fetch, apply, publish.
    ///
    /// Records the outcome in the shared status map either way. On failure
    /// the quantity's current value stays untouched; the next regular tick is
    /// the retry.
    async fn sync_once(&self) -> Result<()> {
        let result = self.fetch_and_apply().await;

        match &result {
            Ok(value) => self.record_status(true, Some(value.clone()), None).await,
            Err(e) => self.record_status(false, None, Some(format!("{e:#}"))).await,
        }

        result.map(|_| ())
    }

    async fn fetch_and_apply(&self) -> Result<String> {
        trace!("fetching value from {}", self.config.url);

        let value = self
            .adapter
            .fetch(&self.config)
            .await
            .context("adapter fetch failed")?;

        trace!("fetched value {value:?}");

        let quantity = self
            .updater
            .apply(&self.config.element_id, &value)
            .await
            .context("value update skipped")?;

        self.notifier
            .publish(&quantity.id, &value, quantity.last_updated);

        Ok(value)
    }

    async fn record_status(&self, healthy: bool, value: Option<String>, message: Option<String>) {
        let status = ConnectionStatus {
            connection_name: self.config.name.clone(),
            quantity_id: self.config.element_id.clone(),
            healthy,
            last_value: value,
            message,
            last_attempt: Utc::now(),
        };

        self.statuses
            .write()
            .await
            .insert(self.config.name.clone(), status);
    }
}

/// Handle for controlling a SyncWorker
///
/// Can be cloned and shared across tasks.
#[derive(Clone)]
pub struct WorkerHandle {
    sender: mpsc::Sender<WorkerCommand>,

    pub connection_name: String,

    pub quantity_id: String,
}

impl WorkerHandle {
    /// Spawn a new sync worker as a tokio task and return its handle.
    pub fn spawn(
        config: ConnectionConfig,
        adapter: Box<dyn Adapter>,
        updater: Arc<UpdateService>,
        notifier: Notifier,
        statuses: StatusMap,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let connection_name = config.name.clone();
        let quantity_id = config.element_id.clone();

        let actor = SyncWorker::new(config, adapter, updater, notifier, statuses, cmd_rx);

        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            connection_name,
            quantity_id,
        }
    }

    /// Trigger an immediate fetch-and-apply, bypassing the interval timer.
    pub async fn poll_now(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WorkerCommand::PollNow { respond_to: tx })
            .await
            .context("failed to send PollNow command")?;

        rx.await.context("failed to receive response")??;
        Ok(())
    }

    /// Update the polling interval.
    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(WorkerCommand::UpdateInterval { interval_secs })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    /// Shut down the worker.
    ///
    /// Waits for the worker to acknowledge: when this returns, the loop has
    /// exited and no further ticks can fire for this connection. Safe to call
    /// on an already-stopped worker.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(WorkerCommand::Shutdown { respond_to: tx })
            .await
            .is_err()
        {
            // Worker already gone
            return;
        }

        let _ = rx.await;
    }
}
