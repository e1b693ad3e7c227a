//! History record types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::params::ParameterVector;
use crate::prediction::{PredictedClass, PredictionResult, RiskLevel};

/// Store-assigned identifier of a history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryRecordId(Uuid);

impl HistoryRecordId {
    /// Creates a new random record ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for HistoryRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HistoryRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HistoryRecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A saved assessment that has not been given an id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHistoryRecord {
    /// When the assessment was saved.
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    /// Predicted probability, in [0, 1].
    pub probability: f64,
    /// Class label the oracle gave.
    #[serde(rename = "prediction")]
    pub predicted_class: PredictedClass,
    /// Risk band the oracle gave.
    pub risk_level: RiskLevel,
    /// Inputs that produced the prediction.
    #[serde(rename = "inputs")]
    pub input_snapshot: ParameterVector,
}

impl NewHistoryRecord {
    /// Snapshots `prediction` and the `inputs` that produced it.
    #[must_use]
    pub fn from_prediction(
        prediction: &PredictionResult,
        inputs: &ParameterVector,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            probability: prediction.probability,
            predicted_class: prediction.predicted_class,
            risk_level: prediction.risk_level,
            input_snapshot: inputs.clone(),
        }
    }

    /// Attaches the store-assigned `id`.
    #[must_use]
    pub fn with_id(self, id: HistoryRecordId) -> HistoryRecord {
        HistoryRecord {
            id,
            timestamp: self.timestamp,
            probability: self.probability,
            predicted_class: self.predicted_class,
            risk_level: self.risk_level,
            input_snapshot: self.input_snapshot,
        }
    }
}

/// An immutable, persisted assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Identifier assigned by the store.
    pub id: HistoryRecordId,
    /// When the assessment was saved.
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    /// Predicted probability, in [0, 1].
    pub probability: f64,
    /// Class label the oracle gave.
    #[serde(rename = "prediction")]
    pub predicted_class: PredictedClass,
    /// Risk band the oracle gave.
    pub risk_level: RiskLevel,
    /// Inputs that produced the prediction.
    #[serde(rename = "inputs")]
    pub input_snapshot: ParameterVector,
}

impl HistoryRecord {
    /// Probability expressed in percent.
    #[must_use]
    pub fn risk_percent(&self) -> f64 {
        self.probability * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_wire_format_matches_store() {
        let prediction = PredictionResult::from_probability(0.85, 0.5).unwrap();
        let at = DateTime::parse_from_rfc3339("2023-03-31T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let id = HistoryRecordId::new();
        let record = NewHistoryRecord::from_prediction(&prediction, &ParameterVector::default(), at)
            .with_id(id);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], serde_json::json!(id.to_string()));
        assert_eq!(json["prediction"], serde_json::json!(1));
        assert_eq!(json["risk_level"], serde_json::json!("Very High Risk"));
        assert_eq!(json["inputs"]["age"], serde_json::json!(50.0));
        assert!(json["date"].as_str().unwrap().starts_with("2023-03-31T10:30:00"));

        let back: HistoryRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn id_parses_from_string() {
        let id = HistoryRecordId::new();
        assert_eq!(id.to_string().parse::<HistoryRecordId>().unwrap(), id);
        assert!("not-a-uuid".parse::<HistoryRecordId>().is_err());
    }
}
