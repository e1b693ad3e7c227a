//! Saved assessments and the history store they live in.
//!
//! The store is authoritative. Records are immutable once appended and are
//! removed only through [`HistoryStore::delete`]. Callers never assume a
//! local copy reflects the store without re-listing it.

mod memory;
mod record;
mod traits;
pub mod tracker;

pub use memory::InMemoryHistoryStore;
pub use record::{HistoryRecord, HistoryRecordId, NewHistoryRecord};
pub use traits::{HistoryStore, StoreError};
pub use tracker::{HistorySnapshot, TrendTracker};
