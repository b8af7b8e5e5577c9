//! Supervisor - owns one sync worker per enabled connection
//!
//! The supervisor is handed an explicitly constructed update service and
//! notifier; it holds no process-wide state. Connections are independent
//! units of concurrency and failure: starting, stopping or restarting one
//! never disturbs the others, and there is no global pause.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, error, trace};

use crate::adapters::{Adapter, resolve_adapter};
use crate::config::{ConnectionConfig, Registry};
use crate::notify::Notifier;
use crate::update::UpdateService;

use super::messages::ConnectionStatus;
use super::worker::{StatusMap, WorkerHandle};

pub struct Supervisor {
    updater: Arc<UpdateService>,

    notifier: Notifier,

    /// Live workers, keyed by connection name. Invariant: at most one worker
    /// per name at any instant.
    workers: HashMap<String, WorkerHandle>,

    statuses: StatusMap,
}

impl Supervisor {
    pub fn new(updater: Arc<UpdateService>, notifier: Notifier) -> Self {
        Self {
            updater,
            notifier,
            workers: HashMap::new(),
            statuses: StatusMap::default(),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Start a worker for every enabled connection in the registry.
    pub async fn start(&mut self, registry: &Registry) {
        for connection in &registry.connections {
            if !connection.enable {
                debug!("connection '{}' is disabled, not scheduled", connection.name);
                continue;
            }

            self.start_worker(connection.clone()).await;
        }

        debug!("{} connection(s) scheduled", self.workers.len());
    }

    /// Apply an incremental create/update for one connection.
    ///
    /// The existing worker (if any) is stopped first; a new one is started
    /// when the connection is enabled. Other connections are untouched.
    pub async fn on_connection_changed(&mut self, connection: &ConnectionConfig) {
        self.stop(&connection.name).await;

        if connection.enable {
            self.start_worker(connection.clone()).await;
        } else {
            debug!("connection '{}' disabled", connection.name);
        }
    }

    /// Handle a connection being deleted from the registry.
    pub async fn on_connection_removed(&mut self, name: &str) {
        self.stop(name).await;
        self.statuses.write().await.remove(name);
    }

    /// Stop one connection's worker.
    ///
    /// When this returns, no further ticks fire for that connection. Calling
    /// it for a connection that is not running is a no-op.
    pub async fn stop(&mut self, name: &str) -> bool {
        match self.workers.remove(name) {
            Some(handle) => {
                debug!("stopping worker for connection '{name}'");
                handle.shutdown().await;
                true
            }
            None => {
                trace!("stop requested for connection '{name}' which is not running");
                false
            }
        }
    }

    /// Stop every worker. Safe to call repeatedly, including from a
    /// termination signal path.
    pub async fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }

        debug!("shutting down {} worker(s)", self.workers.len());

        let handles: Vec<_> = self.workers.drain().map(|(_, handle)| handle).collect();
        join_all(handles.iter().map(|handle| handle.shutdown())).await;
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.workers.contains_key(name)
    }

    pub fn running_connections(&self) -> Vec<String> {
        self.workers.keys().cloned().collect()
    }

    /// Snapshot of the last known status per connection.
    pub async fn statuses(&self) -> HashMap<String, ConnectionStatus> {
        self.statuses.read().await.clone()
    }

    async fn start_worker(&mut self, connection: ConnectionConfig) {
        // Enforce the one-worker-per-name invariant on every path
        self.stop(&connection.name).await;

        let adapter = match resolve_adapter(&connection.kind) {
            Ok(adapter) => adapter,
            Err(err) => {
                error!("connection '{}' not started: {err}", connection.name);

                self.statuses.write().await.insert(
                    connection.name.clone(),
                    ConnectionStatus {
                        connection_name: connection.name.clone(),
                        quantity_id: connection.element_id.clone(),
                        healthy: false,
                        last_value: None,
                        message: Some(err.to_string()),
                        last_attempt: Utc::now(),
                    },
                );
                return;
            }
        };

        debug!(
            "starting worker for connection '{}' ({}, every {}s)",
            connection.name,
            adapter.kind(),
            connection.polling_period_seconds
        );

        let handle = WorkerHandle::spawn(
            connection,
            adapter,
            self.updater.clone(),
            self.notifier.clone(),
            self.statuses.clone(),
        );

        self.workers.insert(handle.connection_name.clone(), handle);
    }
}
