//! Prediction oracle client.
//!
//! The oracle is an external, side-effect-free function from a
//! [`ParameterVector`] to a [`PredictionResult`]. Independent calls carry no
//! ordering guarantee; the simulation engine handles out-of-order completion.

use std::future::Future;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SimulatorConfig;
use crate::params::ParameterVector;
use crate::prediction::{PredictionResult, DEFAULT_CLASSIFICATION_THRESHOLD};

/// Errors an oracle may report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// The service could not be reached or failed to answer.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    /// The service answered with something that is not a valid prediction.
    #[error("invalid oracle response: {0}")]
    InvalidResponse(String),
}

/// Contract for the external risk-prediction model.
#[async_trait]
pub trait PredictionOracle: Send + Sync {
    /// Predicts risk for `vector`.
    ///
    /// Must be idempotent. Implementations report failure through
    /// `OracleError`; they must not panic on network errors.
    async fn predict(&self, vector: &ParameterVector) -> Result<PredictionResult, OracleError>;
}

/// Adapter turning an async closure into a [`PredictionOracle`].
///
/// ```
/// use riskscope::{FnOracle, PredictionResult};
///
/// let oracle = FnOracle::new(|v: riskscope::ParameterVector| async move {
///     let p = (v.get(riskscope::Field::Age) - 20.0) / 100.0;
///     PredictionResult::from_probability(p, 0.5)
///         .map_err(|e| riskscope::OracleError::InvalidResponse(e.to_string()))
/// });
/// # let _ = oracle;
/// ```
pub struct FnOracle<F> {
    f: F,
}

impl<F> FnOracle<F> {
    /// Wraps `f`.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> std::fmt::Debug for FnOracle<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnOracle").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> PredictionOracle for FnOracle<F>
where
    F: Fn(ParameterVector) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PredictionResult, OracleError>> + Send,
{
    async fn predict(&self, vector: &ParameterVector) -> Result<PredictionResult, OracleError> {
        (self.f)(vector.clone()).await
    }
}

/// Adapter for models that only return a probability.
///
/// Class, band and message are derived with
/// [`PredictionResult::from_probability`] at the configured threshold.
pub struct ProbabilityOracle<F> {
    f: F,
    threshold: f64,
}

impl<F> ProbabilityOracle<F> {
    /// Wraps `f`, classifying at the default threshold.
    pub const fn new(f: F) -> Self {
        Self::with_threshold(f, DEFAULT_CLASSIFICATION_THRESHOLD)
    }

    /// Wraps `f`, classifying at `threshold`.
    pub const fn with_threshold(f: F, threshold: f64) -> Self {
        Self { f, threshold }
    }

    /// Wraps `f`, classifying at `config.classification_threshold`.
    pub const fn from_config(f: F, config: &SimulatorConfig) -> Self {
        Self::with_threshold(f, config.classification_threshold)
    }

    /// Probability cut in use.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl<F> std::fmt::Debug for ProbabilityOracle<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbabilityOracle")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> PredictionOracle for ProbabilityOracle<F>
where
    F: Fn(ParameterVector) -> Fut + Send + Sync,
    Fut: Future<Output = Result<f64, OracleError>> + Send,
{
    async fn predict(&self, vector: &ParameterVector) -> Result<PredictionResult, OracleError> {
        let probability = (self.f)(vector.clone()).await?;
        PredictionResult::from_probability(probability, self.threshold)
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))
    }
}
