//! Read-side reports over one indicator's measurements.
//!
//! # Responsibility
//! - Load measurements and hand them to the pure analytics functions.
//! - Assemble the composite indicator summary.
//!
//! # Invariants
//! - Statistics read confirmed rows only; series and charts read every status.
//! - Chart and summary fail with `NotFound` for an unknown indicator.

use crate::analytics::series::{self, ChartDataset, MonthlySlot};
use crate::analytics::statistics::{self, IndicatorStatistics};
use crate::model::catalog::{IndicatorCategory, IndicatorId, IndicatorWithAncestry};
use crate::model::measurement::{Measurement, MeasurementStatus};
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::measurement_repo::{MeasurementFilter, MeasurementRepository};
use crate::service::error::{ServiceError, ServiceResult};
use serde::Serialize;

/// Indicator identity block shown above a summary.
///
/// Process and macroprocess names are empty when the indicator is detached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorHeader {
    pub id: IndicatorId,
    pub code: String,
    pub name: String,
    pub formula: String,
    pub unit: String,
    pub frequency: String,
    pub category: IndicatorCategory,
    pub target: Option<String>,
    pub owner: String,
    pub macroprocess: String,
    pub process: String,
}

impl From<&IndicatorWithAncestry> for IndicatorHeader {
    fn from(item: &IndicatorWithAncestry) -> Self {
        let indicator = &item.indicator;
        Self {
            id: indicator.id,
            code: indicator.code.clone(),
            name: indicator.name.clone(),
            formula: indicator.formula.clone(),
            unit: indicator.unit.clone(),
            frequency: indicator.frequency.clone(),
            category: indicator.category,
            target: indicator.target.clone(),
            owner: indicator.owner.clone(),
            macroprocess: item.macroprocess_name().unwrap_or_default().to_string(),
            process: item.process_name().unwrap_or_default().to_string(),
        }
    }
}

/// Everything a single-indicator dashboard needs for one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSummary {
    pub indicator: IndicatorHeader,
    pub statistics: IndicatorStatistics,
    pub monthly: Vec<MonthlySlot>,
    pub chart: ChartDataset,
    pub year: i32,
}

/// Report service facade over repository implementations.
pub struct ReportService<M: MeasurementRepository, C: CatalogRepository> {
    measurements: M,
    catalog: C,
}

impl<M: MeasurementRepository, C: CatalogRepository> ReportService<M, C> {
    pub fn new(measurements: M, catalog: C) -> Self {
        Self {
            measurements,
            catalog,
        }
    }

    /// Aggregates confirmed measurements, optionally scoped to one year.
    pub fn compute_statistics(
        &self,
        indicator_id: IndicatorId,
        year: Option<i32>,
    ) -> ServiceResult<IndicatorStatistics> {
        let rows = self.measurements.query(&MeasurementFilter {
            indicator_id: Some(indicator_id),
            year,
            month: None,
            status: Some(MeasurementStatus::Confirmed),
        })?;
        Ok(statistics::compute_statistics(&rows))
    }

    /// Twelve monthly slots for `year`. Unknown indicators yield empty slots.
    pub fn build_monthly_series(
        &self,
        indicator_id: IndicatorId,
        year: i32,
    ) -> ServiceResult<Vec<MonthlySlot>> {
        let rows = self.year_rows(indicator_id, year)?;
        Ok(series::build_monthly_series(year, &rows))
    }

    /// Value and target lines for `year`.
    pub fn build_chart_dataset(
        &self,
        indicator_id: IndicatorId,
        year: i32,
    ) -> ServiceResult<ChartDataset> {
        let item = self.require_indicator(indicator_id)?;
        let slots = self.build_monthly_series(indicator_id, year)?;
        Ok(series::build_chart_dataset(&item.indicator, &slots))
    }

    /// Header, statistics, monthly series and chart for one indicator-year.
    pub fn summarize_indicator(
        &self,
        indicator_id: IndicatorId,
        year: i32,
    ) -> ServiceResult<IndicatorSummary> {
        let item = self.require_indicator(indicator_id)?;
        let rows = self.year_rows(indicator_id, year)?;
        let monthly = series::build_monthly_series(year, &rows);
        let chart = series::build_chart_dataset(&item.indicator, &monthly);

        Ok(IndicatorSummary {
            indicator: IndicatorHeader::from(&item),
            statistics: statistics::compute_statistics(&rows),
            monthly,
            chart,
            year,
        })
    }

    fn year_rows(&self, indicator_id: IndicatorId, year: i32) -> ServiceResult<Vec<Measurement>> {
        let rows = self.measurements.query(&MeasurementFilter {
            indicator_id: Some(indicator_id),
            year: Some(year),
            ..MeasurementFilter::default()
        })?;
        Ok(rows)
    }

    fn require_indicator(&self, indicator_id: IndicatorId) -> ServiceResult<IndicatorWithAncestry> {
        self.catalog
            .find_indicator(indicator_id)?
            .ok_or_else(|| ServiceError::indicator_not_found(indicator_id))
    }
}
