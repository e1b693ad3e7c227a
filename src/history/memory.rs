//! In-memory history store.
//!
//! Thread-safe reference implementation of [`HistoryStore`], intended for
//! embedded usage and tests.

use std::sync::RwLock;

use async_trait::async_trait;

use super::record::{HistoryRecord, HistoryRecordId, NewHistoryRecord};
use super::traits::{HistoryStore, StoreError};

fn lock_err(context: &'static str) -> StoreError {
    StoreError::BackendError(format!("poisoned lock: {context}"))
}

/// History store backed by a vector in memory.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
}

impl InMemoryHistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with existing records.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = HistoryRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize, StoreError> {
        let guard = self.records.read().map_err(|_| lock_err("history.len"))?;
        Ok(guard.len())
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn list(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        let guard = self.records.read().map_err(|_| lock_err("history.list"))?;
        let mut out = guard.clone();
        out.sort_by_key(|r| r.timestamp);
        Ok(out)
    }

    async fn append(&self, record: NewHistoryRecord) -> Result<HistoryRecord, StoreError> {
        let mut guard = self.records.write().map_err(|_| lock_err("history.append"))?;
        let stored = record.with_id(HistoryRecordId::new());
        guard.push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: HistoryRecordId) -> Result<(), StoreError> {
        let mut guard = self.records.write().map_err(|_| lock_err("history.delete"))?;
        let before = guard.len();
        guard.retain(|r| r.id != id);
        if guard.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone, Utc};

    use crate::params::ParameterVector;
    use crate::prediction::PredictionResult;

    fn new_record(p: f64, minutes: i64) -> NewHistoryRecord {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes);
        let prediction = PredictionResult::from_probability(p, 0.5).unwrap();
        NewHistoryRecord::from_prediction(&prediction, &ParameterVector::default(), at)
    }

    #[tokio::test]
    async fn append_assigns_ids_and_list_sorts_by_time() {
        let store = InMemoryHistoryStore::new();
        assert!(store.is_empty().unwrap());

        let late = store.append(new_record(0.4, 10)).await.unwrap();
        let early = store.append(new_record(0.2, 0)).await.unwrap();
        assert_ne!(late.id, early.id);

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, early.id);
        assert_eq!(listed[1].id, late.id);
    }

    #[tokio::test]
    async fn delete_removes_once_then_not_found() {
        let store = InMemoryHistoryStore::new();
        let rec = store.append(new_record(0.3, 0)).await.unwrap();

        store.delete(rec.id).await.unwrap();
        assert_eq!(store.len().unwrap(), 0);
        assert_eq!(store.delete(rec.id).await, Err(StoreError::NotFound(rec.id)));
    }

    #[tokio::test]
    async fn seeded_store_lists_records() {
        let seeded = new_record(0.25, 5).with_id(HistoryRecordId::new());
        let store = InMemoryHistoryStore::with_records([seeded.clone()]);
        assert_eq!(store.list().await.unwrap(), vec![seeded]);
    }
}
