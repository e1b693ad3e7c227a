//! Abstract history store contract.
//!
//! The store is an external transactional resource: each call succeeds or
//! fails on its own and nothing beyond that is assumed.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{ExecutionError, RiskError};

use super::record::{HistoryRecord, HistoryRecordId, NewHistoryRecord};

/// Errors that can occur during history store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Record not found.
    #[error("History record not found: {0}")]
    NotFound(HistoryRecordId),

    /// Backend error.
    #[error("History store backend error: {0}")]
    BackendError(String),
}

impl From<StoreError> for RiskError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::Execution(ExecutionError::RecordNotFound { id }),
            StoreError::BackendError(message) => {
                Self::Execution(ExecutionError::HistoryStore { message })
            }
        }
    }
}

/// Storage contract for saved assessments.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// All records. Order is not assumed by callers; they sort by timestamp.
    async fn list(&self) -> Result<Vec<HistoryRecord>, StoreError>;

    /// Persists `record` and returns it with its assigned id.
    async fn append(&self, record: NewHistoryRecord) -> Result<HistoryRecord, StoreError>;

    /// Deletes a record by ID. Returns `NotFound` if it does not exist.
    async fn delete(&self, id: HistoryRecordId) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_into_execution_errors() {
        let id = HistoryRecordId::new();
        let err: RiskError = StoreError::NotFound(id).into();
        assert_eq!(err, RiskError::Execution(ExecutionError::RecordNotFound { id }));
        assert!(!err.is_retryable());

        let err: RiskError = StoreError::BackendError("disk full".to_string()).into();
        assert!(err.is_retryable());
        assert!(format!("{err}").contains("disk full"));
    }
}
