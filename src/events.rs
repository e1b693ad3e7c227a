//! Notifications for the UI layer.
//!
//! Engines publish [`SimulationEvent`]s into an [`EventBus`]; each subscriber
//! gets a bounded [`EventStream`]. Publishing never blocks: a full stream
//! drops the event and bumps a counter, and disconnected streams are pruned
//! on the next publish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};

use crate::error::RiskError;
use crate::prediction::{PredictionResult, RiskDelta};
use crate::trend::{ForecastResult, TrendOutcome, TrendSummary};

/// Default per-subscriber buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Something the UI layer may want to re-render for.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEvent {
    /// An oracle response was applied as the current prediction.
    PredictionChanged {
        /// Request sequence number of the applied response.
        sequence: u64,
        /// The new current prediction.
        current: PredictionResult,
        /// Delta of `current` against baseline.
        delta: RiskDelta,
    },
    /// A debounced oracle call failed; the previous prediction stays.
    PredictionFailed {
        /// Request sequence number of the failed call.
        sequence: u64,
        /// What went wrong.
        error: RiskError,
    },
    /// The history store was re-listed.
    HistoryChanged {
        /// Number of records listed.
        record_count: usize,
        /// Earliest-to-latest summary.
        summary: TrendOutcome<TrendSummary>,
        /// Linear forecast.
        forecast: TrendOutcome<ForecastResult>,
    },
}

#[derive(Debug)]
struct BusInner {
    capacity: usize,
    subscribers: Mutex<Vec<Sender<SimulationEvent>>>,
    published: AtomicU64,
    dropped: AtomicU64,
}

/// Fan-out of events to any number of subscribers.
///
/// Cloning yields another handle to the same bus.
#[derive(Debug, Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Creates a bus whose streams buffer up to `capacity` events each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                capacity: capacity.max(1),
                subscribers: Mutex::new(Vec::new()),
                published: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Opens a new stream receiving every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        let (tx, rx) = bounded(self.inner.capacity);
        match self.inner.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        EventStream { rx }
    }

    /// Delivers `event` to every live subscriber without blocking.
    pub fn publish(&self, event: &SimulationEvent) {
        self.inner.published.fetch_add(1, Ordering::Relaxed);
        let mut subs = match self.inner.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subs.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Events published so far.
    #[must_use]
    pub fn published_events(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    /// Deliveries dropped because a subscriber's buffer was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Live subscriber count as of the last publish.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        match self.inner.subscribers.lock() {
            Ok(subs) => subs.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// A subscriber's view of the bus. Dropping it unsubscribes.
#[derive(Debug)]
pub struct EventStream {
    rx: Receiver<SimulationEvent>,
}

impl EventStream {
    /// Next buffered event, if any.
    #[must_use]
    pub fn try_next(&self) -> Option<SimulationEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Waits up to `timeout` for the next event (blocking the thread).
    #[must_use]
    pub fn next_timeout(&self, timeout: Duration) -> Option<SimulationEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drains every buffered event.
    #[must_use]
    pub fn drain(&self) -> Vec<SimulationEvent> {
        self.rx.try_iter().collect()
    }
}
