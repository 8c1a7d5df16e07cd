//! Measurement domain model.
//!
//! # Responsibility
//! - Define the monthly measurement record and its period key.
//! - Own default-filling (`NewMeasurement::into_fields`) and field merging
//!   (`MeasurementPatch::apply_to`) for every write path.
//! - Split upsert input into its create and update shapes.
//!
//! # Invariants
//! - `(indicator_id, year, month)` identifies at most one measurement.
//! - `month` is within `1..=12`; numeric fields are finite.
//! - New measurements default to `MeasurementStatus::Confirmed`.

use crate::model::catalog::IndicatorId;
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type MeasurementId = i64;

pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// Short month labels, January first.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Returns the short label for a 1-based month number.
pub fn month_label(month: u32) -> Option<&'static str> {
    month_index(month).map(|index| MONTH_LABELS[index])
}

fn month_index(month: u32) -> Option<usize> {
    (1..=12).contains(&month).then(|| (month - 1) as usize)
}

/// Review state of a measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementStatus {
    /// Entered but not yet committed for reporting.
    Draft,
    /// Counted by aggregate statistics.
    #[default]
    Confirmed,
    /// Checked after confirmation.
    Reviewed,
}

impl MeasurementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Reviewed => "reviewed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "confirmed" => Some(Self::Confirmed),
            "reviewed" => Some(Self::Reviewed),
            _ => None,
        }
    }
}

impl Display for MeasurementStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniqueness anchor for measurements.
///
/// Derived ordering is `(indicator_id, year, month)`, so keys of one
/// indicator sort chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    pub indicator_id: IndicatorId,
    pub year: i32,
    pub month: u32,
}

impl PeriodKey {
    pub fn new(indicator_id: IndicatorId, year: i32, month: u32) -> Self {
        Self {
            indicator_id,
            year,
            month,
        }
    }
}

impl Display for PeriodKey {
    /// Renders the period part as `month/year`.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}

/// Persisted monthly measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: MeasurementId,
    pub indicator_id: IndicatorId,
    pub year: i32,
    pub month: u32,
    pub value: f64,
    /// Overrides the indicator target for this period only.
    pub period_target: Option<f64>,
    /// Kept for traceability; statistics ignore it.
    pub numerator: Option<f64>,
    /// Kept for traceability; statistics ignore it.
    pub denominator: Option<f64>,
    pub notes: Option<String>,
    pub recorded_by: Option<String>,
    pub status: MeasurementStatus,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Measurement {
    pub fn period_key(&self) -> PeriodKey {
        PeriodKey::new(self.indicator_id, self.year, self.month)
    }

    /// Display label such as `"Mar 2025"`.
    pub fn period_label(&self) -> String {
        match month_label(self.month) {
            Some(label) => format!("{label} {}", self.year),
            None => format!("{}/{}", self.month, self.year),
        }
    }

    /// Orders measurements most recent first (year DESC, month DESC).
    pub fn cmp_recent_first(a: &Measurement, b: &Measurement) -> std::cmp::Ordering {
        b.year.cmp(&a.year).then_with(|| b.month.cmp(&a.month))
    }
}

/// Validation failures for measurement writes.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementValidationError {
    MonthOutOfRange(u32),
    YearOutOfRange(i32),
    NonFiniteNumber { field: &'static str, value: f64 },
    BlankRecorder,
}

impl Display for MeasurementValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MonthOutOfRange(month) => {
                write!(f, "month must be between 1 and 12, got {month}")
            }
            Self::YearOutOfRange(year) => {
                write!(f, "year must be between {MIN_YEAR} and {MAX_YEAR}, got {year}")
            }
            Self::NonFiniteNumber { field, value } => {
                write!(f, "{field} must be a finite number, got {value}")
            }
            Self::BlankRecorder => write!(f, "recorded_by must not be blank when provided"),
        }
    }
}

impl Error for MeasurementValidationError {}

/// Fully resolved column values written by insert and update.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementFields {
    pub year: i32,
    pub month: u32,
    pub value: f64,
    pub period_target: Option<f64>,
    pub numerator: Option<f64>,
    pub denominator: Option<f64>,
    pub notes: Option<String>,
    pub recorded_by: Option<String>,
    pub status: MeasurementStatus,
}

impl MeasurementFields {
    /// Checks range and finiteness rules before any SQL runs.
    pub fn validate(&self) -> Result<(), MeasurementValidationError> {
        if !(1..=12).contains(&self.month) {
            return Err(MeasurementValidationError::MonthOutOfRange(self.month));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&self.year) {
            return Err(MeasurementValidationError::YearOutOfRange(self.year));
        }
        ensure_finite("value", Some(self.value))?;
        ensure_finite("period_target", self.period_target)?;
        ensure_finite("numerator", self.numerator)?;
        ensure_finite("denominator", self.denominator)?;
        if matches!(self.recorded_by.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(MeasurementValidationError::BlankRecorder);
        }
        Ok(())
    }
}

fn ensure_finite(field: &'static str, value: Option<f64>) -> Result<(), MeasurementValidationError> {
    match value {
        Some(value) if !value.is_finite() => {
            Err(MeasurementValidationError::NonFiniteNumber { field, value })
        }
        _ => Ok(()),
    }
}

/// Input for creating one measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMeasurement {
    pub indicator_id: IndicatorId,
    pub year: i32,
    pub month: u32,
    pub value: f64,
    #[serde(default)]
    pub period_target: Option<f64>,
    #[serde(default)]
    pub numerator: Option<f64>,
    #[serde(default)]
    pub denominator: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub recorded_by: Option<String>,
    /// Defaults to `confirmed` when omitted.
    #[serde(default)]
    pub status: Option<MeasurementStatus>,
}

impl NewMeasurement {
    /// Minimal input: every optional field absent, status defaulted later.
    pub fn new(indicator_id: IndicatorId, year: i32, month: u32, value: f64) -> Self {
        Self {
            indicator_id,
            year,
            month,
            value,
            period_target: None,
            numerator: None,
            denominator: None,
            notes: None,
            recorded_by: None,
            status: None,
        }
    }

    pub fn period_key(&self) -> PeriodKey {
        PeriodKey::new(self.indicator_id, self.year, self.month)
    }

    /// Fills defaults. This is the only place creation defaults live.
    pub fn into_fields(self) -> MeasurementFields {
        MeasurementFields {
            year: self.year,
            month: self.month,
            value: self.value,
            period_target: self.period_target,
            numerator: self.numerator,
            denominator: self.denominator,
            notes: self.notes,
            recorded_by: self.recorded_by,
            status: self.status.unwrap_or_default(),
        }
    }
}

/// Partial update input.
///
/// Nullable columns use `Option<Option<T>>`: outer `None` keeps the stored
/// value, `Some(None)` clears it, `Some(Some(v))` replaces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPatch {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub period_target: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub numerator: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub denominator: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub recorded_by: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<MeasurementStatus>,
}

impl MeasurementPatch {
    /// Whether the patch touches the period and needs a uniqueness re-check.
    pub fn changes_period(&self) -> bool {
        self.year.is_some() || self.month.is_some()
    }

    /// Period after applying the patch, falling back per field.
    pub fn effective_period(&self, current: &Measurement) -> PeriodKey {
        PeriodKey::new(
            current.indicator_id,
            self.year.unwrap_or(current.year),
            self.month.unwrap_or(current.month),
        )
    }

    /// Merges supplied fields over the stored record.
    pub fn apply_to(&self, current: &Measurement) -> MeasurementFields {
        MeasurementFields {
            year: self.year.unwrap_or(current.year),
            month: self.month.unwrap_or(current.month),
            value: self.value.unwrap_or(current.value),
            period_target: self.period_target.unwrap_or(current.period_target),
            numerator: self.numerator.unwrap_or(current.numerator),
            denominator: self.denominator.unwrap_or(current.denominator),
            notes: self
                .notes
                .clone()
                .unwrap_or_else(|| current.notes.clone()),
            recorded_by: self
                .recorded_by
                .clone()
                .unwrap_or_else(|| current.recorded_by.clone()),
            status: self.status.unwrap_or(current.status),
        }
    }
}

/// Input for `upsert`: a period key plus fields applied as a create or update.
///
/// Nullable fields keep the patch distinction between omitted and `null`,
/// so updating an existing period only touches what the caller sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertMeasurement {
    pub indicator_id: IndicatorId,
    pub year: i32,
    pub month: u32,
    pub value: f64,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub period_target: Option<Option<f64>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub numerator: Option<Option<f64>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub denominator: Option<Option<f64>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub recorded_by: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MeasurementStatus>,
}

impl UpsertMeasurement {
    pub fn period_key(&self) -> PeriodKey {
        PeriodKey::new(self.indicator_id, self.year, self.month)
    }

    /// Create path: omitted and `null` both leave the column empty.
    pub fn into_new(self) -> NewMeasurement {
        NewMeasurement {
            indicator_id: self.indicator_id,
            year: self.year,
            month: self.month,
            value: self.value,
            period_target: self.period_target.flatten(),
            numerator: self.numerator.flatten(),
            denominator: self.denominator.flatten(),
            notes: self.notes.flatten(),
            recorded_by: self.recorded_by.flatten(),
            status: self.status,
        }
    }

    /// Update path: period and value always apply, the rest only when sent.
    pub fn into_patch(self) -> MeasurementPatch {
        MeasurementPatch {
            year: Some(self.year),
            month: Some(self.month),
            value: Some(self.value),
            period_target: self.period_target,
            numerator: self.numerator,
            denominator: self.denominator,
            notes: self.notes,
            recorded_by: self.recorded_by,
            status: self.status,
        }
    }
}

impl From<NewMeasurement> for UpsertMeasurement {
    /// Absent fields count as omitted, so they never clear stored values.
    fn from(value: NewMeasurement) -> Self {
        Self {
            indicator_id: value.indicator_id,
            year: value.year,
            month: value.month,
            value: value.value,
            period_target: value.period_target.map(Some),
            numerator: value.numerator.map(Some),
            denominator: value.denominator.map(Some),
            notes: value.notes.map(Some),
            recorded_by: value.recorded_by.map(Some),
            status: value.status,
        }
    }
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Measurement {
        Measurement {
            id: 7,
            indicator_id: 3,
            year: 2025,
            month: 4,
            value: 80.0,
            period_target: Some(90.0),
            numerator: Some(8.0),
            denominator: Some(10.0),
            notes: Some("april".to_string()),
            recorded_by: Some("ana".to_string()),
            status: MeasurementStatus::Reviewed,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn new_measurement_defaults_to_confirmed() {
        let fields = NewMeasurement::new(1, 2025, 3, 5.0).into_fields();
        assert_eq!(fields.status, MeasurementStatus::Confirmed);
        assert_eq!(fields.period_target, None);
        assert_eq!(fields.notes, None);
    }

    #[test]
    fn patch_keeps_unsupplied_and_clears_explicit_null() {
        let patch: MeasurementPatch =
            serde_json::from_str(r#"{"value": 85.5, "period_target": null}"#).unwrap();
        let merged = patch.apply_to(&stored());

        assert_eq!(merged.value, 85.5);
        assert_eq!(merged.period_target, None);
        assert_eq!(merged.numerator, Some(8.0));
        assert_eq!(merged.notes.as_deref(), Some("april"));
        assert_eq!(merged.status, MeasurementStatus::Reviewed);
        assert!(!patch.changes_period());
    }

    #[test]
    fn effective_period_falls_back_per_field() {
        let patch = MeasurementPatch {
            month: Some(9),
            ..MeasurementPatch::default()
        };
        let period = patch.effective_period(&stored());
        assert_eq!(period, PeriodKey::new(3, 2025, 9));
        assert!(patch.changes_period());
    }

    #[test]
    fn upsert_patch_keeps_omitted_fields() {
        let input: UpsertMeasurement =
            serde_json::from_str(r#"{"indicator_id": 3, "year": 2025, "month": 4, "value": 70.0}"#)
                .unwrap();
        let merged = input.into_patch().apply_to(&stored());

        assert_eq!(merged.value, 70.0);
        assert_eq!(merged.period_target, Some(90.0));
        assert_eq!(merged.notes.as_deref(), Some("april"));
        assert_eq!(merged.recorded_by.as_deref(), Some("ana"));
        assert_eq!(merged.status, MeasurementStatus::Reviewed);
    }

    #[test]
    fn upsert_patch_clears_explicit_null() {
        let input: UpsertMeasurement = serde_json::from_str(
            r#"{"indicator_id": 3, "year": 2025, "month": 4, "value": 70.0, "notes": null}"#,
        )
        .unwrap();
        let merged = input.into_patch().apply_to(&stored());

        assert_eq!(merged.notes, None);
        assert_eq!(merged.period_target, Some(90.0));
    }

    #[test]
    fn upsert_create_path_collapses_null_and_omitted() {
        let input: UpsertMeasurement = serde_json::from_str(
            r#"{"indicator_id": 3, "year": 2025, "month": 4, "value": 70.0, "notes": null, "numerator": 4.0}"#,
        )
        .unwrap();
        let fields = input.into_new().into_fields();

        assert_eq!(fields.notes, None);
        assert_eq!(fields.period_target, None);
        assert_eq!(fields.numerator, Some(4.0));
        assert_eq!(fields.status, MeasurementStatus::Confirmed);
    }

    #[test]
    fn validate_rejects_out_of_range_month_and_nan() {
        let mut fields = NewMeasurement::new(1, 2025, 13, 1.0).into_fields();
        assert_eq!(
            fields.validate(),
            Err(MeasurementValidationError::MonthOutOfRange(13))
        );

        fields.month = 1;
        fields.numerator = Some(f64::NAN);
        assert!(matches!(
            fields.validate(),
            Err(MeasurementValidationError::NonFiniteNumber {
                field: "numerator",
                ..
            })
        ));
    }

    #[test]
    fn period_key_displays_month_over_year() {
        assert_eq!(PeriodKey::new(1, 2025, 3).to_string(), "3/2025");
        assert_eq!(stored().period_label(), "Apr 2025");
        assert_eq!(month_label(12), Some("Dec"));
        assert_eq!(month_label(0), None);
    }
}
