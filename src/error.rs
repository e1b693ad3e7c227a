//! Error types for riskscope.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! the exact failure. Outcomes that are expected in normal operation
//! (too little history, superseded oracle responses) are not errors; see
//! [`crate::trend::TrendOutcome`] and [`crate::simulation::ApplyOutcome`].

use thiserror::Error;

use crate::history::HistoryRecordId;
use crate::params::{Field, FieldDomain};

/// Validation errors raised before anything is sent to a collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Value {value} for field '{field}' is outside its domain {domain}")]
    InvalidDomain {
        field: Field,
        value: f64,
        domain: FieldDomain,
    },

    #[error("Unknown parameter field '{name}'")]
    UnknownField {
        name: String,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Probability {value} is out of range [0.0, 1.0]")]
    ProbabilityOutOfRange {
        value: f64,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Execution errors raised while running an engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Prediction oracle unavailable: {reason}")]
    OracleUnavailable {
        reason: String,
    },

    #[error("Simulation engine is not initialized")]
    NotInitialized,

    #[error("Simulation engine already has a baseline")]
    AlreadyInitialized,

    #[error("No current prediction to commit")]
    NoCurrentPrediction,

    #[error("History store error: {message}")]
    HistoryStore {
        message: String,
    },

    #[error("History record not found: {id}")]
    RecordNotFound {
        id: HistoryRecordId,
    },

    #[error("No async runtime available: {message}")]
    NoRuntime {
        message: String,
    },
}

/// Top-level error type for riskscope.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

impl RiskError {
    /// Creates an `OracleUnavailable` execution error.
    #[must_use]
    pub fn oracle_unavailable(reason: impl Into<String>) -> Self {
        Self::Execution(ExecutionError::OracleUnavailable {
            reason: reason.into(),
        })
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if the operation was rejected for an out-of-domain value.
    #[must_use]
    pub const fn is_invalid_domain(&self) -> bool {
        matches!(self, Self::Validation(ValidationError::InvalidDomain { .. }))
    }

    /// Returns true if the operation needs a baseline that does not exist yet.
    #[must_use]
    pub const fn is_not_initialized(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::NotInitialized))
    }

    /// Returns true if the prediction oracle failed.
    #[must_use]
    pub const fn is_oracle_unavailable(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::OracleUnavailable { .. }))
    }

    /// Returns true if this error is retryable.
    ///
    /// Collaborator failures may succeed on retry; contract violations won't.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Execution(e) => matches!(
                e,
                ExecutionError::OracleUnavailable { .. } | ExecutionError::HistoryStore { .. }
            ),
        }
    }
}

/// Result type alias for riskscope operations.
pub type RiskResult<T> = Result<T, RiskError>;
