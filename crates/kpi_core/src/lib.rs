//! Core domain logic for KPI measurement tracking.
//! Owns the catalog and measurement invariants; boundary crates only adapt.

pub mod analytics;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{current_year, open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::catalog::{
    Indicator, IndicatorCategory, IndicatorId, IndicatorWithAncestry, Macroprocess, Process,
};
pub use model::measurement::{
    Measurement, MeasurementId, MeasurementPatch, MeasurementStatus, NewMeasurement, PeriodKey,
    UpsertMeasurement,
};
pub use repo::catalog_repo::{CatalogRepository, IndicatorFilter, SqliteCatalogRepository};
pub use repo::measurement_repo::{
    MeasurementFilter, MeasurementRepository, SqliteMeasurementRepository,
};
pub use repo::{RepoError, RepoResult};
pub use service::error::{ServiceError, ServiceResult};
pub use service::indicator_service::{IndicatorRow, IndicatorService};
pub use service::measurement_service::{MeasurementDetail, MeasurementService};
pub use service::report_service::{IndicatorSummary, ReportService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
