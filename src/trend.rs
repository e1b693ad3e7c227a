//! Trend projection over saved assessments.
//!
//! Two independent computations over a time-ordered series:
//! - [`summarize`]: direction and magnitude of change from the earliest to
//!   the latest observation. Intermediate observations are ignored.
//! - [`forecast`]: ordinary least-squares line over `(index, probability)`,
//!   extrapolated `horizon_steps` past the last index.
//!
//! Too little data is an expected outcome ([`TrendOutcome::InsufficientData`]),
//! never a zero-valued result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::HistoryRecord;
use crate::prediction::RiskLevel;

/// Minimum observations for [`summarize`].
pub const MIN_SUMMARY_RECORDS: usize = 2;

/// Minimum observations for [`forecast`].
pub const MIN_FORECAST_RECORDS: usize = 3;

/// Default forecast horizon (one observation per day, thirty days out).
pub const DEFAULT_HORIZON_STEPS: u32 = 30;

/// Slopes with magnitude at or below this are classified as stable.
const SLOPE_EPSILON: f64 = 1e-12;

/// A timestamped risk probability.
pub trait Observation {
    /// When the observation was made.
    fn timestamp(&self) -> DateTime<Utc>;
    /// Risk probability in [0, 1].
    fn probability(&self) -> f64;
}

impl Observation for HistoryRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn probability(&self) -> f64 {
        self.probability
    }
}

impl Observation for (DateTime<Utc>, f64) {
    fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    fn probability(&self) -> f64 {
        self.1
    }
}

/// Result of a trend computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrendOutcome<T> {
    /// Enough data; the computed value.
    Computed(T),
    /// Not enough observations to compute anything meaningful.
    InsufficientData {
        /// Observations the computation needs.
        required: usize,
        /// Observations supplied.
        available: usize,
    },
}

impl<T> TrendOutcome<T> {
    /// The computed value, if any.
    #[must_use]
    pub fn computed(self) -> Option<T> {
        match self {
            Self::Computed(value) => Some(value),
            Self::InsufficientData { .. } => None,
        }
    }

    /// Borrowing form of [`TrendOutcome::computed`].
    #[must_use]
    pub const fn as_computed(&self) -> Option<&T> {
        match self {
            Self::Computed(value) => Some(value),
            Self::InsufficientData { .. } => None,
        }
    }

    /// Returns true if there was not enough data.
    #[must_use]
    pub const fn is_insufficient(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

/// Direction of change between the first and last observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Latest risk is higher than earliest.
    Increased,
    /// Latest risk is lower than earliest.
    Decreased,
    /// Latest and earliest risk are equal.
    Unchanged,
}

/// Earliest-to-latest change summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    /// Sign of the change.
    pub direction: TrendDirection,
    /// Absolute change in percentage points.
    pub magnitude: f64,
}

/// Sign of the fitted slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastTrend {
    /// Positive slope.
    Increasing,
    /// Negative slope.
    Decreasing,
    /// Zero slope.
    Stable,
}

/// Linear forecast of risk at a future index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Extrapolated probability, clamped to [0, 1].
    pub horizon_probability: f64,
    /// Sign of the fitted slope.
    pub trend: ForecastTrend,
    /// Fitted slope, probability per index step.
    pub slope: f64,
    /// Fitted intercept at index 0.
    pub intercept: f64,
    /// Index the line was evaluated at.
    pub horizon_index: f64,
}

impl ForecastResult {
    /// Forecast probability in percent.
    #[must_use]
    pub fn horizon_percent(&self) -> f64 {
        self.horizon_probability * 100.0
    }
}

/// One point of the oldest-first chart series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// When the assessment was saved.
    pub timestamp: DateTime<Utc>,
    /// Risk in percent.
    pub risk_percent: f64,
    /// Risk band the oracle gave.
    pub risk_level: RiskLevel,
}

fn sorted_by_time<O: Observation>(observations: &[O]) -> Vec<&O> {
    let mut sorted: Vec<&O> = observations.iter().collect();
    sorted.sort_by_key(|o| o.timestamp());
    sorted
}

/// Summarizes the change from earliest to latest observation.
#[must_use]
pub fn summarize<O: Observation>(observations: &[O]) -> TrendOutcome<TrendSummary> {
    let sorted = sorted_by_time(observations);
    let (first, last) = match sorted.as_slice() {
        [first, .., last] => (first, last),
        _ => {
            return TrendOutcome::InsufficientData {
                required: MIN_SUMMARY_RECORDS,
                available: observations.len(),
            }
        }
    };

    let difference = last.probability() - first.probability();
    let direction = if difference > 0.0 {
        TrendDirection::Increased
    } else if difference < 0.0 {
        TrendDirection::Decreased
    } else {
        TrendDirection::Unchanged
    };

    TrendOutcome::Computed(TrendSummary {
        direction,
        magnitude: (difference * 100.0).abs(),
    })
}

/// Fits a least-squares line over observation index and extrapolates it.
///
/// Indices run `0..n` in time order; the line is evaluated at
/// `n - 1 + horizon_steps`. Uses the closed-form sums, so all-equal
/// probabilities give a zero slope. A degenerate denominator yields
/// `InsufficientData`.
#[must_use]
pub fn forecast<O: Observation>(observations: &[O], horizon_steps: u32) -> TrendOutcome<ForecastResult> {
    let available = observations.len();
    if available < MIN_FORECAST_RECORDS {
        return TrendOutcome::InsufficientData {
            required: MIN_FORECAST_RECORDS,
            available,
        };
    }

    let sorted = sorted_by_time(observations);

    #[allow(clippy::cast_precision_loss)]
    let n = available as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, o) in sorted.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let x = i as f64;
        let y = o.probability();
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator == 0.0 || !denominator.is_finite() {
        return TrendOutcome::InsufficientData {
            required: MIN_FORECAST_RECORDS,
            available,
        };
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    let horizon_index = n - 1.0 + f64::from(horizon_steps);
    let horizon_probability = (intercept + slope * horizon_index).clamp(0.0, 1.0);

    let trend = if slope.abs() <= SLOPE_EPSILON {
        ForecastTrend::Stable
    } else if slope > 0.0 {
        ForecastTrend::Increasing
    } else {
        ForecastTrend::Decreasing
    };

    TrendOutcome::Computed(ForecastResult {
        horizon_probability,
        trend,
        slope,
        intercept,
        horizon_index,
    })
}

/// Oldest-first chart series of saved assessments.
#[must_use]
pub fn chart_points(records: &[HistoryRecord]) -> Vec<TrendPoint> {
    sorted_by_time(records)
        .into_iter()
        .map(|r| TrendPoint {
            timestamp: r.timestamp,
            risk_percent: r.risk_percent(),
            risk_level: r.risk_level,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    fn series(ps: &[f64]) -> Vec<(DateTime<Utc>, f64)> {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        ps.iter()
            .enumerate()
            .map(|(i, &p)| (t0 + Duration::days(i as i64), p))
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn summarize_needs_two_observations() {
        let empty: Vec<(DateTime<Utc>, f64)> = Vec::new();
        assert_eq!(
            summarize(&empty),
            TrendOutcome::InsufficientData {
                required: 2,
                available: 0
            }
        );
        assert_eq!(
            summarize(&series(&[0.4])),
            TrendOutcome::InsufficientData {
                required: 2,
                available: 1
            }
        );
    }

    #[test]
    fn summarize_increase_in_percentage_points() {
        let summary = summarize(&series(&[0.3, 0.5])).computed().unwrap();
        assert_eq!(summary.direction, TrendDirection::Increased);
        assert!(approx(summary.magnitude, 20.0));
    }

    #[test]
    fn summarize_uses_only_endpoints_after_sorting() {
        let mut obs = series(&[0.6, 0.1, 0.9, 0.4]);
        obs.reverse();
        let summary = summarize(&obs).computed().unwrap();
        assert_eq!(summary.direction, TrendDirection::Decreased);
        assert!(approx(summary.magnitude, 20.0));

        let flat = summarize(&series(&[0.5, 0.9, 0.5])).computed().unwrap();
        assert_eq!(flat.direction, TrendDirection::Unchanged);
        assert_eq!(flat.magnitude, 0.0);
    }

    #[test]
    fn forecast_needs_three_observations() {
        assert_eq!(
            forecast(&series(&[0.2, 0.3]), 1),
            TrendOutcome::InsufficientData {
                required: 3,
                available: 2
            }
        );
    }

    #[test]
    fn forecast_linear_series() {
        let f = forecast(&series(&[0.2, 0.3, 0.4]), 1).computed().unwrap();
        assert!(approx(f.slope, 0.1));
        assert!(approx(f.intercept, 0.2));
        assert!(approx(f.horizon_index, 3.0));
        assert!(approx(f.horizon_probability, 0.5));
        assert_eq!(f.trend, ForecastTrend::Increasing);
    }

    #[test]
    fn forecast_flat_series_is_stable() {
        let f = forecast(&series(&[0.5, 0.5, 0.5, 0.5]), 30).computed().unwrap();
        assert_eq!(f.slope, 0.0);
        assert_eq!(f.trend, ForecastTrend::Stable);
        assert!(approx(f.horizon_probability, 0.5));
    }

    #[test]
    fn forecast_clamps_to_unit_interval() {
        let up = forecast(&series(&[0.5, 0.7, 0.9]), 30).computed().unwrap();
        assert_eq!(up.horizon_probability, 1.0);
        assert_eq!(up.trend, ForecastTrend::Increasing);

        let down = forecast(&series(&[0.5, 0.3, 0.1]), 30).computed().unwrap();
        assert_eq!(down.horizon_probability, 0.0);
        assert_eq!(down.trend, ForecastTrend::Decreasing);
    }

    #[test]
    fn forecast_sorts_by_timestamp_first() {
        let mut obs = series(&[0.2, 0.3, 0.4]);
        obs.swap(0, 2);
        let f = forecast(&obs, 1).computed().unwrap();
        assert!(approx(f.horizon_probability, 0.5));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(summarize(&series(&[0.3]))).unwrap();
        assert_eq!(json["status"], serde_json::json!("insufficient_data"));
        assert_eq!(json["available"], serde_json::json!(1));
    }
}
