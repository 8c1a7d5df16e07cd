//! Indicator lookup and dashboard grouping.
//!
//! # Responsibility
//! - Project catalog rows into flat table rows.
//! - Feed active indicators to the grouping and tally functions.

use crate::analytics::grouping::{self, IndicatorTally, MacroprocessGroup};
use crate::model::catalog::{
    IndicatorCategory, IndicatorId, IndicatorWithAncestry, MacroprocessId, ProcessId,
};
use crate::repo::catalog_repo::{CatalogRepository, IndicatorFilter};
use crate::service::error::ServiceResult;
use serde::Serialize;

/// Color used when a macroprocess has none configured.
pub const DEFAULT_MACROPROCESS_COLOR: &str = "#003595";

/// Flat indicator row for catalog tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorRow {
    pub id: IndicatorId,
    pub code: String,
    pub macroprocess: Option<String>,
    pub macroprocess_id: Option<MacroprocessId>,
    pub macroprocess_color: String,
    pub process: Option<String>,
    pub process_id: Option<ProcessId>,
    pub name: String,
    pub formula: String,
    pub unit: String,
    pub frequency: String,
    pub category: IndicatorCategory,
    pub target: Option<String>,
    pub owner: String,
    pub description: Option<String>,
}

impl From<IndicatorWithAncestry> for IndicatorRow {
    fn from(item: IndicatorWithAncestry) -> Self {
        let IndicatorWithAncestry {
            indicator,
            process,
            macroprocess,
        } = item;
        let macroprocess_color = macroprocess
            .as_ref()
            .and_then(|m| m.color.clone())
            .unwrap_or_else(|| DEFAULT_MACROPROCESS_COLOR.to_string());

        Self {
            id: indicator.id,
            code: indicator.code,
            macroprocess_id: macroprocess.as_ref().map(|m| m.id),
            macroprocess: macroprocess.map(|m| m.name),
            macroprocess_color,
            process_id: process.as_ref().map(|p| p.id),
            process: process.map(|p| p.name),
            name: indicator.name,
            formula: indicator.formula,
            unit: indicator.unit,
            frequency: indicator.frequency,
            category: indicator.category,
            target: indicator.target,
            owner: indicator.owner,
            description: indicator.description,
        }
    }
}

pub struct IndicatorService<C: CatalogRepository> {
    catalog: C,
}

impl<C: CatalogRepository> IndicatorService<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Lists indicators as table rows, active only unless the filter says otherwise.
    pub fn list_indicators(&self, filter: &IndicatorFilter) -> ServiceResult<Vec<IndicatorRow>> {
        let items = self.catalog.list_indicators(filter)?;
        Ok(items.into_iter().map(IndicatorRow::from).collect())
    }

    pub fn find_indicator(&self, id: IndicatorId) -> ServiceResult<Option<IndicatorRow>> {
        Ok(self.catalog.find_indicator(id)?.map(IndicatorRow::from))
    }

    /// Active indicators folded into macroprocess -> process groups.
    pub fn group_indicators(&self) -> ServiceResult<Vec<MacroprocessGroup>> {
        let items = self.catalog.list_active_indicators_with_ancestry()?;
        Ok(grouping::group_indicators(&items))
    }

    /// Active indicator counts overall, per category and per macroprocess.
    pub fn compute_indicator_stats(&self) -> ServiceResult<IndicatorTally> {
        let items = self.catalog.list_active_indicators_with_ancestry()?;
        Ok(grouping::tally_indicators(&items))
    }
}
