//! Update Service - the single write path for quantity values
//!
//! Every writer (connection polling, manual edits) funnels through
//! [`UpdateService::apply`] so that history is never skipped and never
//! duplicated for a given transition.
//!
//! ## Write ordering
//!
//! `apply` holds a per-quantity async lock across its load-append-save
//! sequence. Concurrent writers for the *same* quantity are serialized in
//! arrival order (each sees the value the previous one wrote); writers for
//! different quantities interleave freely.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::error::UpdateError;
use crate::{HistoryRecord, Quantity};

/// Persistence seam for quantities and their history.
///
/// The engine does not own the document store; it talks to it through this
/// trait. Implementations must be `Send + Sync` as they are shared across
/// worker tasks.
#[async_trait]
pub trait QuantityStore: Send + Sync {
    async fn load_quantity(&self, id: &str) -> Result<Option<Quantity>>;

    async fn save_quantity(&self, quantity: Quantity) -> Result<()>;

    async fn append_history(&self, record: HistoryRecord) -> Result<()>;

    /// History records for one quantity, oldest first.
    async fn history(&self, quantity_id: &str) -> Result<Vec<HistoryRecord>>;
}

/// In-memory store implementation.
///
/// Used by the standalone engine binary and by tests; deployments embed the
/// engine against their own store.
#[derive(Default)]
pub struct MemoryStore {
    quantities: RwLock<HashMap<String, Quantity>>,
    history: RwLock<HashMap<String, Vec<HistoryRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_quantity(&self, quantity: Quantity) {
        self.quantities
            .write()
            .await
            .insert(quantity.id.clone(), quantity);
    }
}

#[async_trait]
impl QuantityStore for MemoryStore {
    async fn load_quantity(&self, id: &str) -> Result<Option<Quantity>> {
        Ok(self.quantities.read().await.get(id).cloned())
    }

    async fn save_quantity(&self, quantity: Quantity) -> Result<()> {
        self.quantities
            .write()
            .await
            .insert(quantity.id.clone(), quantity);
        Ok(())
    }

    async fn append_history(&self, record: HistoryRecord) -> Result<()> {
        self.history
            .write()
            .await
            .entry(record.quantity_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn history(&self, quantity_id: &str) -> Result<Vec<HistoryRecord>> {
        Ok(self
            .history
            .read()
            .await
            .get(quantity_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Applies new raw values to quantities: archive the superseded value, then
/// overwrite the current one.
pub struct UpdateService {
    store: Arc<dyn QuantityStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UpdateService {
    pub fn new(store: Arc<dyn QuantityStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn QuantityStore> {
        &self.store
    }

    async fn quantity_lock(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    /// Apply a new raw value to a quantity.
    ///
    /// The *existing* current value is converted per the quantity's declared
    /// type and appended to history, dated now; then the current value is
    /// overwritten with the new raw text. History therefore always lags the
    /// current value by exactly one write.
    pub async fn apply(&self, quantity_id: &str, new_value: &str) -> Result<Quantity, UpdateError> {
        let lock = self.quantity_lock(quantity_id).await;
        let _guard = lock.lock().await;

        let loaded = self
            .store
            .load_quantity(quantity_id)
            .await
            .map_err(|e| UpdateError::Store(e.to_string()))?;

        let Some(mut quantity) = loaded else {
            return Err(UpdateError::NotFound(quantity_id.to_string()));
        };

        let superseded = quantity.value_type.convert(&quantity.current_value);
        trace!("archiving superseded value {superseded:?} for {quantity_id}");

        self.store
            .append_history(HistoryRecord {
                quantity_id: quantity.id.clone(),
                value: superseded,
                recorded_at: Utc::now(),
            })
            .await
            .map_err(|e| UpdateError::Store(e.to_string()))?;

        quantity.current_value = new_value.to_string();
        quantity.last_updated = Utc::now();

        self.store
            .save_quantity(quantity.clone())
            .await
            .map_err(|e| UpdateError::Store(e.to_string()))?;

        debug!("{quantity_id} updated to {new_value}");
        Ok(quantity)
    }
}
