//! Prediction persistence
//!
//! The store is a simple collaborator: records are written once by the
//! prediction flow and read back per user for history and insights.

use crate::error::{ThermalError, ThermalResult};
use crate::models::{PredictionRecord, User};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Trait for prediction storage implementations
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Persist a record and return it with its assigned id
    async fn insert(&self, record: PredictionRecord) -> ThermalResult<PredictionRecord>;

    /// All records owned by `user_id`, newest first
    async fn list_for_user(&self, user_id: &str) -> ThermalResult<Vec<PredictionRecord>>;

    async fn get(&self, id: u64) -> ThermalResult<Option<PredictionRecord>>;

    /// Remove a record, returning it if it existed
    async fn delete(&self, id: u64) -> ThermalResult<Option<PredictionRecord>>;

    /// Total number of stored records
    async fn count(&self) -> ThermalResult<usize>;
}

/// Fetch a record the user may see. Records of other users are reported
/// as missing unless the user is an admin.
pub async fn fetch_visible(
    store: &dyn PredictionStore,
    user: &User,
    id: u64,
) -> ThermalResult<PredictionRecord> {
    match store.get(id).await? {
        Some(record) if user.can_manage(&record.user_id) => Ok(record),
        _ => Err(ThermalError::NotFound(format!("prediction #{}", id))),
    }
}

/// Delete a record the user may manage
pub async fn delete_visible(
    store: &dyn PredictionStore,
    user: &User,
    id: u64,
) -> ThermalResult<PredictionRecord> {
    fetch_visible(store, user, id).await?;
    store
        .delete(id)
        .await?
        .ok_or_else(|| ThermalError::NotFound(format!("prediction #{}", id)))
}

/// In-process store backed by a concurrent map
#[derive(Debug)]
pub struct InMemoryPredictionStore {
    records: DashMap<u64, PredictionRecord>,
    next_id: AtomicU64,
}

impl Default for InMemoryPredictionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPredictionStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl PredictionStore for InMemoryPredictionStore {
    async fn insert(&self, mut record: PredictionRecord) -> ThermalResult<PredictionRecord> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        record.id = id;
        debug!(prediction_id = id, user_id = %record.user_id, "Storing prediction");
        self.records.insert(id, record.clone());
        Ok(record)
    }

    async fn list_for_user(&self, user_id: &str) -> ThermalResult<Vec<PredictionRecord>> {
        let mut records: Vec<PredictionRecord> = self
            .records
            .iter()
            .filter(|r| r.value().user_id == user_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn get(&self, id: u64) -> ThermalResult<Option<PredictionRecord>> {
        Ok(self.records.get(&id).map(|r| r.clone()))
    }

    async fn delete(&self, id: u64) -> ThermalResult<Option<PredictionRecord>> {
        Ok(self.records.remove(&id).map(|(_, v)| v))
    }

    async fn count(&self) -> ThermalResult<usize> {
        Ok(self.records.len())
    }
}
