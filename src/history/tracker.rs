//! History refresh and trend notification.
//!
//! The tracker never caches: every operation re-lists the store and derives
//! the summary, forecast and chart series from that listing.

use std::cmp::Reverse;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SimulatorConfig;
use crate::error::{RiskError, RiskResult};
use crate::events::{EventBus, SimulationEvent};
use crate::trend::{self, ForecastResult, TrendOutcome, TrendPoint, TrendSummary};

use super::record::{HistoryRecord, HistoryRecordId, NewHistoryRecord};
use super::traits::HistoryStore;

/// Everything a history view renders from one store listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySnapshot {
    /// Records, newest first.
    pub records: Vec<HistoryRecord>,
    /// Chart series, oldest first.
    pub chart: Vec<TrendPoint>,
    /// Earliest-to-latest summary.
    pub summary: TrendOutcome<TrendSummary>,
    /// Linear forecast at the configured horizon.
    pub forecast: TrendOutcome<ForecastResult>,
}

impl HistorySnapshot {
    /// Derives a snapshot from an unordered listing.
    #[must_use]
    pub fn from_records(mut records: Vec<HistoryRecord>, horizon_steps: u32) -> Self {
        let summary = trend::summarize(&records);
        let forecast = trend::forecast(&records, horizon_steps);
        let chart = trend::chart_points(&records);
        records.sort_by_key(|r| Reverse(r.timestamp));
        Self {
            records,
            chart,
            summary,
            forecast,
        }
    }
}

/// Keeps a history view in sync with the store.
#[derive(Clone)]
pub struct TrendTracker {
    store: Arc<dyn HistoryStore>,
    events: EventBus,
    horizon_steps: u32,
}

impl std::fmt::Debug for TrendTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrendTracker")
            .field("horizon_steps", &self.horizon_steps)
            .finish_non_exhaustive()
    }
}

impl TrendTracker {
    /// Creates a tracker forecasting `horizon_steps` past the latest record.
    #[must_use]
    pub fn new(store: Arc<dyn HistoryStore>, events: EventBus, horizon_steps: u32) -> Self {
        Self {
            store,
            events,
            horizon_steps,
        }
    }

    /// Creates a tracker using the configured horizon.
    #[must_use]
    pub fn from_config(store: Arc<dyn HistoryStore>, events: EventBus, config: &SimulatorConfig) -> Self {
        Self::new(store, events, config.forecast_horizon_steps)
    }

    /// Re-lists the store and publishes `HistoryChanged`.
    ///
    /// # Errors
    ///
    /// `HistoryStore` if listing fails; nothing is published then.
    pub async fn refresh(&self) -> RiskResult<HistorySnapshot> {
        let records = self.store.list().await.map_err(|error| {
            warn!(%error, "history list failed");
            RiskError::from(error)
        })?;

        let snapshot = HistorySnapshot::from_records(records, self.horizon_steps);
        debug!(records = snapshot.records.len(), "history refreshed");
        self.events.publish(&SimulationEvent::HistoryChanged {
            record_count: snapshot.records.len(),
            summary: snapshot.summary,
            forecast: snapshot.forecast,
        });
        Ok(snapshot)
    }

    /// Appends a record, then refreshes.
    ///
    /// # Errors
    ///
    /// `HistoryStore` if the append or the refresh fails.
    pub async fn append(&self, record: NewHistoryRecord) -> RiskResult<HistorySnapshot> {
        self.store.append(record).await.map_err(RiskError::from)?;
        self.refresh().await
    }

    /// Deletes a record, then refreshes.
    ///
    /// # Errors
    ///
    /// `RecordNotFound` if the store has no such record, `HistoryStore` for
    /// other store failures.
    pub async fn delete(&self, id: HistoryRecordId) -> RiskResult<HistorySnapshot> {
        self.store.delete(id).await.map_err(|error| {
            warn!(%id, %error, "history delete failed");
            RiskError::from(error)
        })?;
        self.refresh().await
    }

    /// Forecast horizon in index steps.
    #[must_use]
    pub const fn horizon_steps(&self) -> u32 {
        self.horizon_steps
    }
}
