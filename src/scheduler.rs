//! Trailing-debounce scheduler.
//!
//! Each [`DebounceScheduler::schedule`] call arms a timer carrying the latest
//! payload and cancels the timer armed before it. Only a timer that survives
//! a full quiet interval fires. Firing hands the payload to a detached task,
//! so later events can never cancel a call already in flight.
//!
//! The pending timer is a field of the scheduler instance; dropping the
//! scheduler cancels it.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{ExecutionError, RiskError, RiskResult};

type FireFn<T> = Arc<dyn Fn(T) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

const ARMED: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Events accepted by `schedule`.
    pub scheduled: u64,
    /// Timers that survived the quiet interval and fired.
    pub fired: u64,
    /// Timers cancelled before firing (superseded or torn down).
    pub cancelled: u64,
}

#[derive(Debug, Default)]
struct Shared {
    // Armed timers plus running fire tasks.
    outstanding: AtomicUsize,
    idle: Notify,
    scheduled: AtomicU64,
    fired: AtomicU64,
    cancelled: AtomicU64,
}

impl Shared {
    fn finish_one(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

struct OutstandingGuard(Arc<Shared>);

impl Drop for OutstandingGuard {
    fn drop(&mut self) {
        self.0.finish_one();
    }
}

struct PendingTimer {
    state: Arc<AtomicU8>,
    handle: JoinHandle<()>,
}

/// Coalesces bursts of events into one call with the latest payload.
pub struct DebounceScheduler<T> {
    quiet: Duration,
    runtime: Handle,
    on_fire: FireFn<T>,
    pending: Mutex<Option<PendingTimer>>,
    shared: Arc<Shared>,
}

impl<T> std::fmt::Debug for DebounceScheduler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebounceScheduler")
            .field("quiet", &self.quiet)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> DebounceScheduler<T> {
    /// Creates a scheduler bound to the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `NoRuntime` when called outside a tokio runtime.
    pub fn new<F, Fut>(quiet: Duration, on_fire: F) -> RiskResult<Self>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|e| {
            RiskError::Execution(ExecutionError::NoRuntime {
                message: e.to_string(),
            })
        })?;
        let on_fire: FireFn<T> = Arc::new(
            move |payload| -> Pin<Box<dyn Future<Output = ()> + Send>> { Box::pin(on_fire(payload)) },
        );
        Ok(Self {
            quiet,
            runtime,
            on_fire,
            pending: Mutex::new(None),
            shared: Arc::new(Shared::default()),
        })
    }

    /// Arms a timer for `payload`, cancelling any timer not yet fired.
    pub fn schedule(&self, payload: T) {
        let mut pending = self.lock_pending();
        if let Some(previous) = pending.take() {
            self.cancel_timer(previous);
        }

        self.shared.scheduled.fetch_add(1, Ordering::Relaxed);
        self.shared.outstanding.fetch_add(1, Ordering::AcqRel);

        let state = Arc::new(AtomicU8::new(ARMED));
        let timer_state = Arc::clone(&state);
        let shared = Arc::clone(&self.shared);
        let on_fire = Arc::clone(&self.on_fire);
        let runtime = self.runtime.clone();
        let quiet = self.quiet;

        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(quiet).await;
            if timer_state
                .compare_exchange(ARMED, FIRED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            shared.fired.fetch_add(1, Ordering::Relaxed);
            trace!(quiet_ms = quiet.as_millis() as u64, "debounce timer fired");
            let guard = OutstandingGuard(shared);
            let call = on_fire(payload);
            runtime.spawn(async move {
                call.await;
                drop(guard);
            });
        });

        *pending = Some(PendingTimer { state, handle });
    }

    /// Cancels the pending timer, if it has not fired yet.
    ///
    /// Returns true if a timer was cancelled.
    pub fn cancel_pending(&self) -> bool {
        let mut pending = self.lock_pending();
        pending.take().is_some_and(|timer| self.cancel_timer(timer))
    }

    /// Returns true while a timer is armed and has not fired.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.lock_pending()
            .as_ref()
            .is_some_and(|timer| timer.state.load(Ordering::Acquire) == ARMED)
    }

    /// Waits until no timer is armed and no fired call is still running.
    pub async fn flush(&self) {
        loop {
            let idle = self.shared.idle.notified();
            if self.shared.outstanding.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }

    fn cancel_timer(&self, timer: PendingTimer) -> bool {
        let won = timer
            .state
            .compare_exchange(ARMED, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            timer.handle.abort();
            self.shared.cancelled.fetch_add(1, Ordering::Relaxed);
            self.shared.finish_one();
            debug!("debounce timer superseded before firing");
        }
        won
    }
}

impl<T> DebounceScheduler<T> {
    /// Snapshot of the diagnostic counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            scheduled: self.shared.scheduled.load(Ordering::Relaxed),
            fired: self.shared.fired.load(Ordering::Relaxed),
            cancelled: self.shared.cancelled.load(Ordering::Relaxed),
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<PendingTimer>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<T> Drop for DebounceScheduler<T> {
    fn drop(&mut self) {
        let timer = match self.pending.get_mut() {
            Ok(slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(timer) = timer {
            if timer
                .state
                .compare_exchange(ARMED, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                timer.handle.abort();
                self.shared.cancelled.fetch_add(1, Ordering::Relaxed);
                self.shared.finish_one();
            }
        }
    }
}
