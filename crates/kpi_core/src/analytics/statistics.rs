//! Aggregate statistics over one indicator's confirmed measurements.
//!
//! # Invariants
//! - Only `MeasurementStatus::Confirmed` rows contribute.
//! - `average` is rounded to 2 decimals, half-up.
//! - Recency is `year DESC, month DESC`.

use crate::model::measurement::{Measurement, MeasurementStatus};
use serde::{Deserialize, Serialize};

/// Direction of change between the two most recent measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

/// Aggregates for one indicator, optionally scoped to a year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorStatistics {
    pub average: Option<f64>,
    pub maximum: Option<f64>,
    pub minimum: Option<f64>,
    pub total_records: usize,
    pub latest_value: Option<f64>,
    pub trend: Option<Trend>,
}

impl IndicatorStatistics {
    /// Result for an empty selection.
    pub fn empty() -> Self {
        Self {
            average: None,
            maximum: None,
            minimum: None,
            total_records: 0,
            latest_value: None,
            trend: None,
        }
    }
}

/// Computes statistics from `measurements`, ignoring non-confirmed rows.
pub fn compute_statistics(measurements: &[Measurement]) -> IndicatorStatistics {
    let mut confirmed: Vec<&Measurement> = measurements
        .iter()
        .filter(|measurement| measurement.status == MeasurementStatus::Confirmed)
        .collect();

    if confirmed.is_empty() {
        return IndicatorStatistics::empty();
    }

    let count = confirmed.len();
    let sum: f64 = confirmed.iter().map(|measurement| measurement.value).sum();
    let maximum = confirmed
        .iter()
        .map(|measurement| measurement.value)
        .fold(f64::NEG_INFINITY, f64::max);
    let minimum = confirmed
        .iter()
        .map(|measurement| measurement.value)
        .fold(f64::INFINITY, f64::min);

    confirmed.sort_by(|a, b| Measurement::cmp_recent_first(a, b));
    let latest = confirmed[0].value;
    let trend = confirmed
        .get(1)
        .map(|previous| classify_trend(latest, previous.value));

    IndicatorStatistics {
        average: Some(round_to_cents(sum / count as f64)),
        maximum: Some(maximum),
        minimum: Some(minimum),
        total_records: count,
        latest_value: Some(latest),
        trend,
    }
}

/// Classifies `latest` against `previous`.
pub fn classify_trend(latest: f64, previous: f64) -> Trend {
    let diff = latest - previous;
    if diff > 0.0 {
        Trend::Rising
    } else if diff < 0.0 {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

/// Rounds to two decimals with ties going toward positive infinity.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

#[cfg(test)]
mod tests {
    use super::{classify_trend, compute_statistics, round_to_cents, Trend};
    use crate::model::measurement::{Measurement, MeasurementStatus};

    fn measurement(year: i32, month: u32, value: f64, status: MeasurementStatus) -> Measurement {
        Measurement {
            id: i64::from(year) * 100 + i64::from(month),
            indicator_id: 1,
            year,
            month,
            value,
            period_target: None,
            numerator: None,
            denominator: None,
            notes: None,
            recorded_by: None,
            status,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn empty_selection_has_no_aggregates() {
        let stats = compute_statistics(&[]);
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.average, None);
        assert_eq!(stats.trend, None);
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        let rows = [
            measurement(2025, 1, 1.0, MeasurementStatus::Confirmed),
            measurement(2025, 2, 2.0, MeasurementStatus::Confirmed),
            measurement(2025, 3, 4.0, MeasurementStatus::Confirmed),
        ];
        let stats = compute_statistics(&rows);
        assert_eq!(stats.average, Some(2.33));
        assert_eq!(stats.maximum, Some(4.0));
        assert_eq!(stats.minimum, Some(1.0));
        assert_eq!(stats.latest_value, Some(4.0));
        assert_eq!(stats.trend, Some(Trend::Rising));
    }

    #[test]
    fn latest_value_orders_across_years() {
        let rows = [
            measurement(2025, 1, 7.0, MeasurementStatus::Confirmed),
            measurement(2024, 12, 9.0, MeasurementStatus::Confirmed),
        ];
        let stats = compute_statistics(&rows);
        assert_eq!(stats.latest_value, Some(7.0));
        assert_eq!(stats.trend, Some(Trend::Falling));
    }

    #[test]
    fn drafts_and_reviewed_rows_are_ignored() {
        let rows = [
            measurement(2025, 1, 10.0, MeasurementStatus::Confirmed),
            measurement(2025, 2, 99.0, MeasurementStatus::Draft),
            measurement(2025, 3, 50.0, MeasurementStatus::Reviewed),
        ];
        let stats = compute_statistics(&rows);
        assert_eq!(stats.total_records, 1);
        assert_eq!(stats.latest_value, Some(10.0));
        assert_eq!(stats.trend, None);
    }

    #[test]
    fn trend_and_rounding_edges() {
        assert_eq!(classify_trend(5.0, 5.0), Trend::Stable);
        assert_eq!(round_to_cents(2.125), 2.13);
        assert_eq!(round_to_cents(-2.125), -2.12);
        assert_eq!(round_to_cents(7.0), 7.0);
    }
}
