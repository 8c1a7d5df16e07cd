//! Twelve-slot monthly series and chart datasets.
//!
//! # Invariants
//! - A monthly series always has exactly 12 slots, January first.
//! - Missing months stay `None`; they are never zero-filled.
//! - Chart labels and both chart series share the same 12-entry axis.

use crate::model::catalog::Indicator;
use crate::model::measurement::{Measurement, MeasurementId, MeasurementStatus, MONTH_LABELS};
use serde::Serialize;

const VALUE_SERIES_LABEL: &str = "Value";
const VALUE_BORDER_COLOR: &str = "#003595";
const VALUE_BACKGROUND_COLOR: &str = "rgba(0, 53, 149, 0.1)";
const TARGET_SERIES_LABEL: &str = "Target";
const TARGET_BORDER_COLOR: &str = "#8BC34A";
const TARGET_BORDER_DASH: [u32; 2] = [5, 5];

/// One month of an indicator's yearly view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySlot {
    /// Short month label, e.g. `"Jan"`.
    pub month: &'static str,
    pub month_number: u32,
    pub value: Option<f64>,
    pub numerator: Option<f64>,
    pub denominator: Option<f64>,
    /// Period-specific target only; the indicator target is applied later.
    pub target: Option<f64>,
    pub id: Option<MeasurementId>,
    pub status: Option<MeasurementStatus>,
}

/// One plotted line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: &'static str,
    pub data: Vec<Option<f64>>,
    pub border_color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_dash: Option<[u32; 2]>,
    pub fill: bool,
}

/// Value and target series over a shared month axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataset {
    pub labels: Vec<&'static str>,
    pub datasets: Vec<ChartSeries>,
}

impl ChartDataset {
    pub fn series(&self, label: &str) -> Option<&ChartSeries> {
        self.datasets.iter().find(|series| series.label == label)
    }
}

/// Builds the January..December view for `year`.
///
/// Rows from other years are ignored; status is not filtered.
pub fn build_monthly_series(year: i32, measurements: &[Measurement]) -> Vec<MonthlySlot> {
    MONTH_LABELS
        .into_iter()
        .zip(1u32..)
        .map(|(label, month_number)| {
            let found = measurements
                .iter()
                .find(|measurement| measurement.year == year && measurement.month == month_number);
            MonthlySlot {
                month: label,
                month_number,
                value: found.map(|measurement| measurement.value),
                numerator: found.and_then(|measurement| measurement.numerator),
                denominator: found.and_then(|measurement| measurement.denominator),
                target: found.and_then(|measurement| measurement.period_target),
                id: found.map(|measurement| measurement.id),
                status: found.map(|measurement| measurement.status),
            }
        })
        .collect()
}

/// Builds the chart payload from a monthly series.
///
/// Target points use the slot target, then the indicator's parsed overall
/// target, then `None`.
pub fn build_chart_dataset(indicator: &Indicator, slots: &[MonthlySlot]) -> ChartDataset {
    let fallback_target = indicator.numeric_target();

    ChartDataset {
        labels: slots.iter().map(|slot| slot.month).collect(),
        datasets: vec![
            ChartSeries {
                label: VALUE_SERIES_LABEL,
                data: slots.iter().map(|slot| slot.value).collect(),
                border_color: VALUE_BORDER_COLOR,
                background_color: Some(VALUE_BACKGROUND_COLOR),
                border_dash: None,
                fill: true,
            },
            ChartSeries {
                label: TARGET_SERIES_LABEL,
                data: slots
                    .iter()
                    .map(|slot| slot.target.or(fallback_target))
                    .collect(),
                border_color: TARGET_BORDER_COLOR,
                background_color: None,
                border_dash: Some(TARGET_BORDER_DASH),
                fill: false,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::{build_chart_dataset, build_monthly_series};
    use crate::model::catalog::{Indicator, IndicatorCategory};
    use crate::model::measurement::{Measurement, MeasurementStatus};

    fn measurement(year: i32, month: u32, value: f64, target: Option<f64>) -> Measurement {
        Measurement {
            id: i64::from(month),
            indicator_id: 1,
            year,
            month,
            value,
            period_target: target,
            numerator: None,
            denominator: None,
            notes: None,
            recorded_by: None,
            status: MeasurementStatus::Draft,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn indicator(target: Option<&str>) -> Indicator {
        Indicator {
            id: 1,
            code: "IND-01".to_string(),
            process_id: None,
            name: "On-time delivery".to_string(),
            formula: "on_time / total".to_string(),
            unit: "%".to_string(),
            frequency: "monthly".to_string(),
            category: IndicatorCategory::Efficacy,
            target: target.map(str::to_string),
            owner: "ops".to_string(),
            description: None,
            display_order: 1,
            is_active: true,
        }
    }

    #[test]
    fn series_always_has_twelve_ordered_slots() {
        let empty = build_monthly_series(2025, &[]);
        assert_eq!(empty.len(), 12);
        assert!(empty.iter().all(|slot| slot.value.is_none()));

        let rows = [
            measurement(2025, 3, 4.5, None),
            measurement(2024, 3, 9.0, None),
        ];
        let slots = build_monthly_series(2025, &rows);
        let numbers: Vec<u32> = slots.iter().map(|slot| slot.month_number).collect();
        assert_eq!(numbers, (1..=12).collect::<Vec<u32>>());
        assert_eq!(slots[0].month, "Jan");
        assert_eq!(slots[2].value, Some(4.5));
        assert_eq!(slots[2].status, Some(MeasurementStatus::Draft));
        assert_eq!(slots[3].id, None);
    }

    #[test]
    fn chart_target_falls_back_to_indicator_target() {
        let rows = [measurement(2025, 2, 80.0, Some(85.0))];
        let slots = build_monthly_series(2025, &rows);
        let chart = build_chart_dataset(&indicator(Some("90%")), &slots);

        assert_eq!(chart.labels.len(), 12);
        let values = &chart.series("Value").unwrap().data;
        assert_eq!(values[0], None);
        assert_eq!(values[1], Some(80.0));

        let targets = &chart.series("Target").unwrap().data;
        assert_eq!(targets[0], Some(90.0));
        assert_eq!(targets[1], Some(85.0));
    }

    #[test]
    fn chart_target_is_absent_without_any_target() {
        let slots = build_monthly_series(2025, &[]);
        let chart = build_chart_dataset(&indicator(Some("n/a")), &slots);
        let targets = &chart.series("Target").unwrap().data;
        assert!(targets.iter().all(Option::is_none));
    }
}
