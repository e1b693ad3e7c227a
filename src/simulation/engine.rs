//! The simulation engine.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::SimulatorConfig;
use crate::error::{ExecutionError, RiskError, RiskResult};
use crate::events::{EventBus, EventStream, SimulationEvent};
use crate::history::{HistoryRecord, HistoryStore, NewHistoryRecord};
use crate::oracle::PredictionOracle;
use crate::params::{Field, ParameterVector};
use crate::prediction::{PredictionResult, RiskDelta};
use crate::scheduler::{DebounceScheduler, SchedulerStats};

use super::sequence::{ApplyOutcome, RequestSequence};
use super::EngineState;

#[derive(Debug)]
struct Session {
    vector: ParameterVector,
    baseline_vector: Option<ParameterVector>,
    baseline: Option<PredictionResult>,
    current: Option<PredictionResult>,
}

impl Session {
    const fn state(&self) -> EngineState {
        if self.baseline.is_some() {
            EngineState::Ready
        } else {
            EngineState::Uninitialized
        }
    }

    fn ensure_ready(&self) -> RiskResult<()> {
        match self.state() {
            EngineState::Ready => Ok(()),
            EngineState::Uninitialized => Err(ExecutionError::NotInitialized.into()),
        }
    }

    fn ensure_uninitialized(&self) -> RiskResult<()> {
        match self.state() {
            EngineState::Uninitialized => Ok(()),
            EngineState::Ready => Err(ExecutionError::AlreadyInitialized.into()),
        }
    }
}

// State shared with the debounce scheduler's fire tasks.
struct Core {
    oracle: Arc<dyn PredictionOracle>,
    config: SimulatorConfig,
    session: Mutex<Session>,
    sequence: RequestSequence,
    events: EventBus,
}

impl Core {
    fn lock(&self) -> MutexGuard<'_, Session> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Calls the oracle for a request already holding `sequence`.
    async fn request(&self, sequence: u64, vector: &ParameterVector) -> RiskResult<PredictionResult> {
        debug!(sequence, "oracle request issued");
        match self.oracle.predict(vector).await {
            Ok(prediction) => match prediction.validate() {
                Ok(()) => Ok(prediction),
                Err(e) => Err(RiskError::oracle_unavailable(format!("invalid response: {e}"))),
            },
            Err(e) => Err(RiskError::oracle_unavailable(e.to_string())),
        }
    }

    /// Applies `prediction` as current if `sequence` is still the latest.
    fn apply(&self, sequence: u64, prediction: PredictionResult) -> ApplyOutcome {
        let mut session = self.lock();
        let outcome = self.sequence.admit(sequence);
        if !outcome.is_applied() {
            debug!(
                sequence,
                latest = self.sequence.latest(),
                "stale oracle response discarded"
            );
            return outcome;
        }

        let delta = session
            .baseline
            .as_ref()
            .map(|baseline| RiskDelta::between(baseline, &prediction, self.config.delta_dead_zone_pp));
        session.current = Some(prediction.clone());

        // Published under the lock so event order matches the order of `current` writes.
        if let Some(delta) = delta {
            self.events.publish(&SimulationEvent::PredictionChanged {
                sequence,
                current: prediction,
                delta,
            });
        }
        drop(session);
        outcome
    }

    /// Fire path of the debounce scheduler. Nobody awaits it, so failures
    /// are published instead of returned.
    async fn refresh(&self, sequence: u64, vector: ParameterVector) {
        match self.request(sequence, &vector).await {
            Ok(prediction) => {
                self.apply(sequence, prediction);
            }
            Err(error) => {
                let session = self.lock();
                if self.sequence.admit(sequence).is_applied() {
                    warn!(sequence, %error, "debounced oracle call failed; keeping previous prediction");
                    self.events
                        .publish(&SimulationEvent::PredictionFailed { sequence, error });
                } else {
                    debug!(sequence, %error, "stale oracle failure discarded");
                }
                drop(session);
            }
        }
    }
}

/// Explores what-if parameter changes against a fixed baseline prediction.
///
/// Must be created inside a tokio runtime. Edits made with
/// [`SimulationEngine::set_field`] are coalesced by a trailing debounce;
/// [`SimulationEngine::initialize`] and [`SimulationEngine::reset`] call the
/// oracle immediately.
pub struct SimulationEngine {
    core: Arc<Core>,
    scheduler: DebounceScheduler<(u64, ParameterVector)>,
    history: Arc<dyn HistoryStore>,
}

impl std::fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("state", &self.state())
            .field("config", &self.core.config)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl SimulationEngine {
    /// Creates an uninitialized engine with its own event bus.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an invalid configuration and `NoRuntime`
    /// when called outside a tokio runtime.
    pub fn new(
        oracle: Arc<dyn PredictionOracle>,
        history: Arc<dyn HistoryStore>,
        config: SimulatorConfig,
    ) -> RiskResult<Self> {
        let events = EventBus::new(config.event_capacity);
        Self::with_event_bus(oracle, history, config, events)
    }

    /// Creates an uninitialized engine publishing into an existing bus.
    ///
    /// # Errors
    ///
    /// Same as [`SimulationEngine::new`].
    pub fn with_event_bus(
        oracle: Arc<dyn PredictionOracle>,
        history: Arc<dyn HistoryStore>,
        config: SimulatorConfig,
        events: EventBus,
    ) -> RiskResult<Self> {
        config.validate()?;

        let core = Arc::new(Core {
            oracle,
            config,
            session: Mutex::new(Session {
                vector: ParameterVector::default(),
                baseline_vector: None,
                baseline: None,
                current: None,
            }),
            sequence: RequestSequence::new(),
            events,
        });

        let fire_core = Arc::clone(&core);
        let scheduler = DebounceScheduler::new(
            config.quiet_interval(),
            move |(sequence, vector): (u64, ParameterVector)| {
                let core = Arc::clone(&fire_core);
                async move { core.refresh(sequence, vector).await }
            },
        )?;

        Ok(Self {
            core,
            scheduler,
            history,
        })
    }

    /// Establishes the baseline from `default_vector`.
    ///
    /// Calls the oracle immediately. On success the result becomes both
    /// baseline and current and the engine is Ready.
    ///
    /// # Errors
    ///
    /// - `InvalidDomain` if the vector fails validation.
    /// - `OracleUnavailable` if the call fails; the engine stays uninitialized.
    /// - `AlreadyInitialized` if a baseline already exists.
    pub async fn initialize(&self, default_vector: ParameterVector) -> RiskResult<PredictionResult> {
        default_vector.validate()?;
        let sequence = {
            let session = self.core.lock();
            session.ensure_uninitialized()?;
            self.core.sequence.issue()
        };

        let result = self.core.request(sequence, &default_vector).await;
        let baseline = result.inspect_err(|error| {
            warn!(sequence, %error, "baseline oracle call failed");
        })?;

        let mut session = self.core.lock();
        session.ensure_uninitialized()?;
        session.vector = default_vector.clone();
        session.baseline_vector = Some(default_vector);
        session.baseline = Some(baseline.clone());
        session.current = Some(baseline.clone());

        let delta = RiskDelta::between(&baseline, &baseline, self.core.config.delta_dead_zone_pp);
        self.core.events.publish(&SimulationEvent::PredictionChanged {
            sequence,
            current: baseline.clone(),
            delta,
        });
        drop(session);

        info!(
            sequence,
            probability = baseline.probability,
            risk_level = %baseline.risk_level,
            "baseline established"
        );
        Ok(baseline)
    }

    /// Sets one field and schedules a debounced oracle call.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` before a baseline exists.
    /// - `InvalidDomain` if `value` is outside the field's domain; nothing
    ///   is mutated or scheduled.
    pub fn set_field(&self, field: Field, value: f64) -> RiskResult<()> {
        self.set_fields([(field, value)])
    }

    /// [`SimulationEngine::set_field`] addressed by wire name (`"age"`, `"cp"`, …).
    ///
    /// # Errors
    ///
    /// `UnknownField` for an unrecognized name, otherwise as `set_field`.
    pub fn set_field_by_name(&self, name: &str, value: f64) -> RiskResult<()> {
        let field: Field = name.parse()?;
        self.set_field(field, value)
    }

    /// Applies several edits atomically and schedules one oracle call.
    ///
    /// Either every edit is valid and applied, or none is. An empty batch
    /// changes nothing and schedules nothing.
    ///
    /// # Errors
    ///
    /// As [`SimulationEngine::set_field`], for the first invalid edit.
    pub fn set_fields(&self, edits: impl IntoIterator<Item = (Field, f64)>) -> RiskResult<()> {
        let mut session = self.core.lock();
        session.ensure_ready()?;

        let mut next = session.vector.clone();
        let mut edited = false;
        for (field, value) in edits {
            next.set(field, value)?;
            edited = true;
        }
        if !edited {
            return Ok(());
        }
        session.vector = next.clone();

        // Sequence taken and scheduled under the session lock, so a later
        // reset or edit always outranks this call.
        let sequence = self.core.sequence.issue();
        self.scheduler.schedule((sequence, next));
        Ok(())
    }

    /// Restores the baseline-defining vector and re-predicts immediately.
    ///
    /// Cancels any pending debounced call. Replaces `current`, never the
    /// baseline.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` before a baseline exists.
    /// - `OracleUnavailable` if the call fails; `current` is left unchanged.
    pub async fn reset(&self) -> RiskResult<ApplyOutcome> {
        let (sequence, vector) = {
            let mut session = self.core.lock();
            session.ensure_ready()?;
            let Some(baseline_vector) = session.baseline_vector.clone() else {
                return Err(ExecutionError::NotInitialized.into());
            };
            if self.scheduler.cancel_pending() {
                debug!("pending debounced call cancelled by reset");
            }
            session.vector = baseline_vector.clone();
            (self.core.sequence.issue(), baseline_vector)
        };

        let result = self.core.request(sequence, &vector).await;
        let prediction = result.inspect_err(|error| {
            warn!(sequence, %error, "reset oracle call failed; keeping previous prediction");
        })?;
        Ok(self.core.apply(sequence, prediction))
    }

    /// Signed change of current risk against baseline.
    ///
    /// # Errors
    ///
    /// `NotInitialized` unless both baseline and current exist.
    pub fn delta(&self) -> RiskResult<RiskDelta> {
        let session = self.core.lock();
        match (&session.baseline, &session.current) {
            (Some(baseline), Some(current)) => Ok(RiskDelta::between(
                baseline,
                current,
                self.core.config.delta_dead_zone_pp,
            )),
            _ => Err(ExecutionError::NotInitialized.into()),
        }
    }

    /// Saves the current prediction with the live parameters to history.
    ///
    /// # Errors
    ///
    /// - `NoCurrentPrediction` if nothing has been predicted yet.
    /// - `HistoryStore` if the store rejects the append.
    pub async fn commit_to_history(&self) -> RiskResult<HistoryRecord> {
        let record = {
            let session = self.core.lock();
            let Some(current) = session.current.as_ref() else {
                return Err(ExecutionError::NoCurrentPrediction.into());
            };
            NewHistoryRecord::from_prediction(current, &session.vector, Utc::now())
        };

        let stored = self.history.append(record).await.map_err(|error| {
            warn!(%error, "history append failed");
            RiskError::from(error)
        })?;
        info!(id = %stored.id, probability = stored.probability, "assessment saved to history");
        Ok(stored)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.core.lock().state()
    }

    /// Live parameter vector.
    #[must_use]
    pub fn parameters(&self) -> ParameterVector {
        self.core.lock().vector.clone()
    }

    /// Vector the baseline was computed from.
    #[must_use]
    pub fn baseline_parameters(&self) -> Option<ParameterVector> {
        self.core.lock().baseline_vector.clone()
    }

    /// Baseline prediction.
    #[must_use]
    pub fn baseline(&self) -> Option<PredictionResult> {
        self.core.lock().baseline.clone()
    }

    /// Latest applied prediction.
    #[must_use]
    pub fn current(&self) -> Option<PredictionResult> {
        self.core.lock().current.clone()
    }

    /// Opens a stream of engine events.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        self.core.events.subscribe()
    }

    /// The bus this engine publishes into.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.core.events
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &SimulatorConfig {
        &self.core.config
    }

    /// Debounce counters.
    #[must_use]
    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Oracle responses dropped as stale so far.
    #[must_use]
    pub fn discarded_responses(&self) -> u64 {
        self.core.sequence.discarded()
    }

    /// Waits until any pending debounce has fired and its call resolved.
    pub async fn flush(&self) {
        self.scheduler.flush().await;
    }

    /// Cancels a pending debounced call. In-flight calls still resolve.
    pub fn shutdown(&self) {
        if self.scheduler.cancel_pending() {
            debug!("pending debounced call cancelled by shutdown");
        }
    }
}
