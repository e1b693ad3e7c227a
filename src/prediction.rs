//! Prediction results and the risk delta derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default probability cut separating the two predicted classes.
pub const DEFAULT_CLASSIFICATION_THRESHOLD: f64 = 0.5;

/// Binary class label produced by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PredictedClass {
    /// No heart disease predicted (wire value 0).
    Negative,
    /// Heart disease predicted (wire value 1).
    Positive,
}

impl PredictedClass {
    /// Thresholds `probability`: strictly above the cut is positive.
    #[must_use]
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        if probability > threshold {
            Self::Positive
        } else {
            Self::Negative
        }
    }
}

impl From<PredictedClass> for u8 {
    fn from(class: PredictedClass) -> Self {
        match class {
            PredictedClass::Negative => 0,
            PredictedClass::Positive => 1,
        }
    }
}

impl TryFrom<u8> for PredictedClass {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Negative),
            1 => Ok(Self::Positive),
            other => Err(format!("predicted class must be 0 or 1, got {other}")),
        }
    }
}

/// Ordinal risk category derived from probability bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Probability below 0.2.
    #[serde(rename = "Low Risk")]
    Low,
    /// Probability in [0.2, 0.4).
    #[serde(rename = "Moderate Risk")]
    Moderate,
    /// Probability in [0.4, 0.7).
    #[serde(rename = "High Risk")]
    High,
    /// Probability of 0.7 or more.
    #[serde(rename = "Very High Risk")]
    VeryHigh,
}

impl RiskLevel {
    /// Band for a probability.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability < 0.2 {
            Self::Low
        } else if probability < 0.4 {
            Self::Moderate
        } else if probability < 0.7 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Moderate => "Moderate Risk",
            Self::High => "High Risk",
            Self::VeryHigh => "Very High Risk",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One oracle answer for one parameter vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Probability of the positive class, in [0, 1].
    pub probability: f64,
    /// Class label as stated by the oracle.
    #[serde(rename = "prediction")]
    pub predicted_class: PredictedClass,
    /// Risk band as stated by the oracle.
    pub risk_level: RiskLevel,
    /// Human-readable summary.
    pub message: String,
}

impl PredictionResult {
    /// Derives a complete result from a bare probability.
    ///
    /// Intended for oracles that only expose a probability. Results coming
    /// from a full oracle keep the oracle's own class and band.
    ///
    /// # Errors
    ///
    /// Returns `ProbabilityOutOfRange` if `probability` is not in [0, 1].
    pub fn from_probability(probability: f64, threshold: f64) -> Result<Self, ValidationError> {
        check_probability(probability)?;
        let predicted_class = PredictedClass::from_probability(probability, threshold);
        let risk_level = RiskLevel::from_probability(probability);
        let advice = match predicted_class {
            PredictedClass::Positive => "Please consult with a healthcare professional.",
            PredictedClass::Negative => "Continue maintaining a healthy lifestyle.",
        };
        let message = format!(
            "You have a {} of heart disease. {advice}",
            risk_level.label().to_lowercase()
        );
        Ok(Self {
            probability,
            predicted_class,
            risk_level,
            message,
        })
    }

    /// Checks the probability invariant.
    ///
    /// # Errors
    ///
    /// Returns `ProbabilityOutOfRange` if `probability` is not in [0, 1].
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_probability(self.probability)
    }

    /// Probability expressed in percent.
    #[must_use]
    pub fn risk_percent(&self) -> f64 {
        self.probability * 100.0
    }
}

pub(crate) fn check_probability(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::ProbabilityOutOfRange { value })
    }
}

/// Display banding of a risk delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaBand {
    /// Risk went down past the dead-zone.
    Improved,
    /// Risk went up past the dead-zone.
    Worsened,
    /// Change within the dead-zone.
    Unchanged,
}

/// Signed change of current risk against baseline, in percentage points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskDelta {
    /// `(current - baseline) * 100`. Never rounded or banded.
    pub percentage_points: f64,
    /// Display band; only this uses the dead-zone.
    pub band: DeltaBand,
}

impl RiskDelta {
    /// Computes the delta of `current` against `baseline`.
    ///
    /// `dead_zone` is in percentage points; changes with magnitude up to and
    /// including it are banded as unchanged.
    #[must_use]
    pub fn between(baseline: &PredictionResult, current: &PredictionResult, dead_zone: f64) -> Self {
        let percentage_points = (current.probability - baseline.probability) * 100.0;
        let band = if percentage_points.abs() <= dead_zone {
            DeltaBand::Unchanged
        } else if percentage_points < 0.0 {
            DeltaBand::Improved
        } else {
            DeltaBand::Worsened
        };
        Self {
            percentage_points,
            band,
        }
    }

    /// Returns true if the signed value is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.percentage_points == 0.0
    }
}

impl fmt::Display for RiskDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+.1}%", self.percentage_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(p: f64) -> PredictionResult {
        PredictionResult::from_probability(p, DEFAULT_CLASSIFICATION_THRESHOLD).unwrap()
    }

    #[test]
    fn risk_bands() {
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.19), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.2), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(0.4), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.69), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.7), RiskLevel::VeryHigh);
        assert!(RiskLevel::Low < RiskLevel::VeryHigh);
    }

    #[test]
    fn class_threshold_is_strict() {
        assert_eq!(result(0.5).predicted_class, PredictedClass::Negative);
        assert_eq!(result(0.51).predicted_class, PredictedClass::Positive);
    }

    #[test]
    fn message_follows_class() {
        let high = result(0.85);
        assert!(high.message.contains("very high risk"));
        assert!(high.message.contains("consult"));
        let low = result(0.1);
        assert!(low.message.contains("low risk"));
        assert!(low.message.contains("healthy lifestyle"));
    }

    #[test]
    fn rejects_out_of_range_probability() {
        assert!(PredictionResult::from_probability(1.2, 0.5).is_err());
        assert!(PredictionResult::from_probability(f64::NAN, 0.5).is_err());
        let mut r = result(0.3);
        r.probability = -0.1;
        assert!(r.validate().is_err());
    }

    #[test]
    fn delta_is_signed_percentage_points() {
        let delta = RiskDelta::between(&result(0.30), &result(0.25), 0.05);
        assert!((delta.percentage_points - -5.0).abs() < 1e-9);
        assert_eq!(delta.band, DeltaBand::Improved);
        assert_eq!(delta.to_string(), "-5.0%");

        let delta = RiskDelta::between(&result(0.30), &result(0.45), 0.05);
        assert_eq!(delta.band, DeltaBand::Worsened);
        assert_eq!(delta.to_string(), "+15.0%");
    }

    #[test]
    fn dead_zone_only_affects_band() {
        let delta = RiskDelta::between(&result(0.3000), &result(0.3003), 0.05);
        assert_eq!(delta.band, DeltaBand::Unchanged);
        assert!(delta.percentage_points > 0.0);
        assert!(!delta.is_zero());

        let same = RiskDelta::between(&result(0.3), &result(0.3), 0.05);
        assert!(same.is_zero());
        assert_eq!(same.band, DeltaBand::Unchanged);
    }

    #[test]
    fn wire_format() {
        let json = serde_json::to_value(result(0.85)).unwrap();
        assert_eq!(json["prediction"], serde_json::json!(1));
        assert_eq!(json["risk_level"], serde_json::json!("Very High Risk"));

        let bad = serde_json::json!({
            "probability": 0.4,
            "prediction": 3,
            "risk_level": "High Risk",
            "message": ""
        });
        assert!(serde_json::from_value::<PredictionResult>(bad).is_err());
    }
}
