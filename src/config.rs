//! Simulator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::prediction::DEFAULT_CLASSIFICATION_THRESHOLD;
use crate::trend::DEFAULT_HORIZON_STEPS;

/// Tunables for the simulation and trend engines.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// let cfg = riskscope::SimulatorConfig::from_json_str(r#"{ "quiet_interval_ms": 250 }"#).unwrap();
/// assert_eq!(cfg.quiet_interval_ms, 250);
/// assert_eq!(cfg.forecast_horizon_steps, 30);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Quiet period after the last edit before the oracle is called.
    pub quiet_interval_ms: u64,
    /// Delta magnitude (percentage points) still shown as unchanged.
    pub delta_dead_zone_pp: f64,
    /// Probability cut used when deriving a class from a bare probability.
    pub classification_threshold: f64,
    /// Index steps past the latest record the forecast is evaluated at.
    pub forecast_horizon_steps: u32,
    /// Per-subscriber event buffer.
    pub event_capacity: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            quiet_interval_ms: 500,
            delta_dead_zone_pp: 0.05,
            classification_threshold: DEFAULT_CLASSIFICATION_THRESHOLD,
            forecast_horizon_steps: DEFAULT_HORIZON_STEPS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SimulatorConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the document does not parse or fails
    /// [`SimulatorConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ValidationError::InvalidConfig {
            reason: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration.
    ///
    /// This must be called before constructing an engine from it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.quiet_interval_ms == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "quiet_interval_ms must be > 0".to_string(),
            });
        }
        if !self.delta_dead_zone_pp.is_finite() || self.delta_dead_zone_pp < 0.0 {
            return Err(ValidationError::InvalidConfig {
                reason: "delta_dead_zone_pp must be finite and >= 0".to_string(),
            });
        }
        if !(self.classification_threshold > 0.0 && self.classification_threshold < 1.0) {
            return Err(ValidationError::InvalidConfig {
                reason: "classification_threshold must be in (0, 1)".to_string(),
            });
        }
        if self.forecast_horizon_steps == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "forecast_horizon_steps must be > 0".to_string(),
            });
        }
        if self.event_capacity == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "event_capacity must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Quiet interval as a `Duration`.
    #[must_use]
    pub const fn quiet_interval(&self) -> Duration {
        Duration::from_millis(self.quiet_interval_ms)
    }
}
