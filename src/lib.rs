//! # riskscope - what-if cardiovascular risk exploration
//!
//! riskscope is the decision-support core behind a risk simulator. It lets a
//! user change clinical parameters and watch an external prediction oracle's
//! answer move against a fixed baseline, and it projects future risk from a
//! series of saved assessments.
//!
//! ## Core Concepts
//!
//! - **ParameterVector**: the complete set of clinical inputs, every field
//!   validated against its declared domain
//! - **SimulationEngine**: baseline + current prediction, debounced oracle
//!   calls, last-writer-wins application of responses, signed risk delta
//! - **Trend projection**: earliest-to-latest summary and a least-squares
//!   forecast over saved assessments
//! - **Collaborators**: a [`PredictionOracle`] and a [`HistoryStore`], both
//!   async traits supplied by the embedding application
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use riskscope::{Field, InMemoryHistoryStore, ParameterVector, SimulationEngine, SimulatorConfig};
//!
//! let engine = SimulationEngine::new(oracle, Arc::new(InMemoryHistoryStore::new()), SimulatorConfig::default())?;
//! engine.initialize(ParameterVector::default()).await?;
//!
//! engine.set_field(Field::Cholesterol, 240.0)?;
//! engine.flush().await;
//! println!("risk change: {}", engine.delta()?);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Data model
pub mod error;
pub mod params;
pub mod prediction;

// Collaborators
pub mod history;
pub mod oracle;

// Engines
pub mod config;
pub mod events;
pub mod scheduler;
pub mod simulation;
pub mod trend;

// Re-export primary types at crate root for convenience
pub use config::SimulatorConfig;
pub use error::{ExecutionError, RiskError, RiskResult, ValidationError};
pub use events::{EventBus, EventStream, SimulationEvent};
pub use history::{
    HistoryRecord, HistoryRecordId, HistorySnapshot, HistoryStore, InMemoryHistoryStore,
    NewHistoryRecord, StoreError, TrendTracker,
};
pub use oracle::{FnOracle, OracleError, PredictionOracle, ProbabilityOracle};
pub use params::{Field, FieldDomain, ParameterVector};
pub use prediction::{DeltaBand, PredictedClass, PredictionResult, RiskDelta, RiskLevel};
pub use scheduler::{DebounceScheduler, SchedulerStats};
pub use simulation::{ApplyOutcome, EngineState, SimulationEngine};
pub use trend::{
    forecast, summarize, ForecastResult, ForecastTrend, TrendDirection, TrendOutcome, TrendPoint,
    TrendSummary,
};
