//! What-if simulation over the prediction oracle.
//!
//! The engine holds a mutable parameter vector, a fixed baseline prediction
//! and the latest applied prediction. Edits are debounced into oracle calls;
//! responses are applied last-writer-wins by request sequence number.

mod engine;
mod sequence;

pub use engine::SimulationEngine;
pub use sequence::{ApplyOutcome, RequestSequence};

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`SimulationEngine`].
///
/// There is no terminal state; an engine lives for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// No baseline yet.
    Uninitialized,
    /// Baseline established; edits, resets and commits are allowed.
    Ready,
}
