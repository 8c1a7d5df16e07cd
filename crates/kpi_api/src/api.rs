//! Route-level API over the KPI core.
//!
//! # Responsibility
//! - Expose one function per route, each returning a status and JSON envelope.
//! - Translate service errors into HTTP-like status codes.
//!
//! # Invariants
//! - Functions never panic and never return `Err`; failures become replies.
//! - Unexpected errors are logged with detail; bodies carry only a generic message.
//! - Absent envelope keys are omitted from serialized output.

use kpi_core::db::current_year;
use kpi_core::model::catalog::ProcessId;
use kpi_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, IndicatorFilter,
    IndicatorId, IndicatorService, MeasurementFilter, MeasurementId, MeasurementPatch,
    MeasurementService, NewMeasurement, ReportService, ServiceError, SqliteCatalogRepository,
    SqliteMeasurementRepository, UpsertMeasurement,
};
use log::{error, warn};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// JSON body shared by every route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

/// Status code plus envelope, as a transport layer would send them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiReply {
    pub status: u16,
    pub body: ApiResponse,
}

impl ApiReply {
    fn data<T: Serialize>(route: &'static str, status: u16, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                status,
                body: ApiResponse {
                    success: true,
                    data: Some(value),
                    message: None,
                    error: None,
                    total: None,
                },
            },
            Err(err) => {
                error!("event=api_encode module=api route={route} status=error error={err}");
                Self::failure(STATUS_INTERNAL_ERROR, "Error encoding response", None)
            }
        }
    }

    fn list<T: Serialize>(route: &'static str, items: &[T]) -> Self {
        let mut reply = Self::data(route, STATUS_OK, &items);
        if reply.body.success {
            reply.body.total = Some(items.len());
        }
        reply
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        if self.body.success {
            self.body.message = Some(message.into());
        }
        self
    }

    fn failure(status: u16, message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            status,
            body: ApiResponse {
                success: false,
                data: None,
                message: Some(message.into()),
                error,
                total: None,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.body.success
    }

    /// Serializes the envelope only, as the response body.
    pub fn body_json(&self) -> String {
        serde_json::to_string(&self.body).unwrap_or_else(|_| {
            r#"{"success":false,"message":"Error encoding response"}"#.to_string()
        })
    }
}

/// Returns the core crate version.
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Starts core logging; empty string on success, error text otherwise.
pub fn init_logging(level: &str, log_dir: &str) -> String {
    match init_logging_inner(level, log_dir) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Decodes a JSON request body, or returns the 400 reply to send instead.
pub fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiReply> {
    serde_json::from_str(body).map_err(|err| {
        warn!("event=api_decode module=api status=rejected error={err}");
        ApiReply::failure(
            STATUS_BAD_REQUEST,
            "Invalid request body",
            Some(err.to_string()),
        )
    })
}

/// GET /indicadores
pub fn list_indicators(conn: &Connection, filter: &IndicatorFilter) -> ApiReply {
    match indicator_service(conn).list_indicators(filter) {
        Ok(rows) => ApiReply::list("list_indicators", &rows),
        Err(err) => read_failure("list_indicators", "Error fetching indicators", err),
    }
}

/// GET /indicadores/stats
pub fn indicator_stats(conn: &Connection) -> ApiReply {
    match indicator_service(conn).compute_indicator_stats() {
        Ok(tally) => ApiReply::data("indicator_stats", STATUS_OK, &tally),
        Err(err) => read_failure("indicator_stats", "Error fetching indicator statistics", err),
    }
}

/// GET /indicadores/grouped
pub fn grouped_indicators(conn: &Connection) -> ApiReply {
    match indicator_service(conn).group_indicators() {
        Ok(groups) => ApiReply::data("grouped_indicators", STATUS_OK, &groups),
        Err(err) => read_failure("grouped_indicators", "Error fetching grouped indicators", err),
    }
}

/// GET /indicadores/:id; inactive indicators are still returned.
pub fn get_indicator(conn: &Connection, id: IndicatorId) -> ApiReply {
    match indicator_service(conn).find_indicator(id) {
        Ok(Some(row)) => ApiReply::data("get_indicator", STATUS_OK, &row),
        Ok(None) => ApiReply::failure(STATUS_NOT_FOUND, "Indicator not found", None),
        Err(err) => read_failure("get_indicator", "Error fetching indicator", err),
    }
}

/// GET /indicadores/por-proceso/:procesoId; active indicators in display order.
pub fn indicators_by_process(conn: &Connection, process_id: ProcessId) -> ApiReply {
    let filter = IndicatorFilter {
        process_id: Some(process_id),
        ..IndicatorFilter::default()
    };
    match indicator_service(conn).list_indicators(&filter) {
        Ok(rows) => ApiReply::list("indicators_by_process", &rows),
        Err(err) => read_failure("indicators_by_process", "Error fetching indicators", err),
    }
}

/// GET /mediciones
pub fn list_measurements(conn: &Connection, filter: &MeasurementFilter) -> ApiReply {
    match measurement_service(conn).list(filter) {
        Ok(rows) => ApiReply::list("list_measurements", &rows),
        Err(err) => read_failure("list_measurements", "Error fetching measurements", err),
    }
}

/// POST /mediciones
pub fn create_measurement(conn: &Connection, input: NewMeasurement) -> ApiReply {
    match measurement_service(conn).create(input) {
        Ok(created) => ApiReply::data("create_measurement", STATUS_CREATED, &created)
            .with_message("Measurement recorded"),
        Err(err) => write_failure("create_measurement", "Error creating measurement", err),
    }
}

/// POST /mediciones/upsert
pub fn upsert_measurement(conn: &Connection, input: UpsertMeasurement) -> ApiReply {
    match measurement_service(conn).upsert(input) {
        Ok(stored) => ApiReply::data("upsert_measurement", STATUS_OK, &stored)
            .with_message("Measurement saved"),
        Err(err) => write_failure("upsert_measurement", "Error saving measurement", err),
    }
}

/// GET /mediciones/:id
pub fn get_measurement(conn: &Connection, id: MeasurementId) -> ApiReply {
    match measurement_service(conn).get_by_id(id) {
        Ok(Some(detail)) => ApiReply::data("get_measurement", STATUS_OK, &detail),
        Ok(None) => ApiReply::failure(STATUS_NOT_FOUND, "Measurement not found", None),
        Err(err) => read_failure("get_measurement", "Error fetching measurement", err),
    }
}

/// PUT /mediciones/:id
pub fn update_measurement(
    conn: &Connection,
    id: MeasurementId,
    patch: &MeasurementPatch,
) -> ApiReply {
    match measurement_service(conn).update(id, patch) {
        Ok(updated) => ApiReply::data("update_measurement", STATUS_OK, &updated)
            .with_message("Measurement updated"),
        Err(err) => write_failure("update_measurement", "Error updating measurement", err),
    }
}

/// DELETE /mediciones/:id
pub fn delete_measurement(conn: &Connection, id: MeasurementId) -> ApiReply {
    match measurement_service(conn).delete(id) {
        Ok(()) => ApiReply {
            status: STATUS_OK,
            body: ApiResponse {
                success: true,
                data: None,
                message: Some("Measurement deleted".to_string()),
                error: None,
                total: None,
            },
        },
        Err(err) => write_failure("delete_measurement", "Error deleting measurement", err),
    }
}

/// GET /mediciones/indicador/:id/anio/:anio
pub fn monthly_series(conn: &Connection, indicator_id: IndicatorId, year: i32) -> ApiReply {
    match report_service(conn).build_monthly_series(indicator_id, year) {
        Ok(slots) => ApiReply::data("monthly_series", STATUS_OK, &slots),
        Err(err) => read_failure("monthly_series", "Error fetching monthly series", err),
    }
}

/// GET /mediciones/indicador/:id/estadisticas, optionally scoped by year.
pub fn indicator_statistics(
    conn: &Connection,
    indicator_id: IndicatorId,
    year: Option<i32>,
) -> ApiReply {
    match report_service(conn).compute_statistics(indicator_id, year) {
        Ok(stats) => ApiReply::data("indicator_statistics", STATUS_OK, &stats),
        Err(err) => read_failure("indicator_statistics", "Error computing statistics", err),
    }
}

/// GET /mediciones/indicador/:id/grafico; `year` defaults to the current year.
pub fn chart_dataset(conn: &Connection, indicator_id: IndicatorId, year: Option<i32>) -> ApiReply {
    const ROUTE: &str = "chart_dataset";
    const FAILURE: &str = "Error building chart data";
    let year = match resolve_year(conn, year) {
        Ok(year) => year,
        Err(err) => return read_failure(ROUTE, FAILURE, err),
    };
    match report_service(conn).build_chart_dataset(indicator_id, year) {
        Ok(chart) => ApiReply::data(ROUTE, STATUS_OK, &chart),
        Err(err) => read_failure(ROUTE, FAILURE, err),
    }
}

/// GET /mediciones/indicador/:id/resumen; `year` defaults to the current year.
pub fn indicator_summary(
    conn: &Connection,
    indicator_id: IndicatorId,
    year: Option<i32>,
) -> ApiReply {
    const ROUTE: &str = "indicator_summary";
    const FAILURE: &str = "Error building indicator summary";
    let year = match resolve_year(conn, year) {
        Ok(year) => year,
        Err(err) => return read_failure(ROUTE, FAILURE, err),
    };
    match report_service(conn).summarize_indicator(indicator_id, year) {
        Ok(summary) => ApiReply::data(ROUTE, STATUS_OK, &summary),
        Err(err) => read_failure(ROUTE, FAILURE, err),
    }
}

/// GET /mediciones/indicador/:id/anios
pub fn available_years(conn: &Connection, indicator_id: IndicatorId) -> ApiReply {
    match measurement_service(conn).available_years(indicator_id) {
        Ok(years) => ApiReply::data("available_years", STATUS_OK, &years),
        Err(err) => read_failure("available_years", "Error fetching available years", err),
    }
}

fn indicator_service(conn: &Connection) -> IndicatorService<SqliteCatalogRepository<'_>> {
    IndicatorService::new(SqliteCatalogRepository::new(conn))
}

fn measurement_service(
    conn: &Connection,
) -> MeasurementService<SqliteMeasurementRepository<'_>, SqliteCatalogRepository<'_>> {
    MeasurementService::new(
        SqliteMeasurementRepository::new(conn),
        SqliteCatalogRepository::new(conn),
    )
}

fn report_service(
    conn: &Connection,
) -> ReportService<SqliteMeasurementRepository<'_>, SqliteCatalogRepository<'_>> {
    ReportService::new(
        SqliteMeasurementRepository::new(conn),
        SqliteCatalogRepository::new(conn),
    )
}

fn resolve_year(conn: &Connection, year: Option<i32>) -> Result<i32, ServiceError> {
    match year {
        Some(year) => Ok(year),
        None => current_year(conn).map_err(|err| ServiceError::Unexpected(err.into())),
    }
}

/// Writes reject every expected failure with 400.
fn write_failure(route: &'static str, failure: &str, err: ServiceError) -> ApiReply {
    if err.is_unexpected() {
        return unexpected(route, failure, &err);
    }
    ApiReply::failure(STATUS_BAD_REQUEST, err.to_string(), Some(err.code().to_string()))
}

fn read_failure(route: &'static str, failure: &str, err: ServiceError) -> ApiReply {
    match err {
        ServiceError::NotFound { .. } => ApiReply::failure(
            STATUS_NOT_FOUND,
            err.to_string(),
            Some(err.code().to_string()),
        ),
        ServiceError::Validation(_) | ServiceError::Conflict(_) => ApiReply::failure(
            STATUS_BAD_REQUEST,
            err.to_string(),
            Some(err.code().to_string()),
        ),
        ServiceError::Unexpected(_) => unexpected(route, failure, &err),
    }
}

fn unexpected(route: &'static str, failure: &str, err: &ServiceError) -> ApiReply {
    error!(
        "event=api_request module=api route={route} status=error error_code={} error={err}",
        err.code()
    );
    ApiReply::failure(STATUS_INTERNAL_ERROR, failure, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kpi_core::db::open_db_in_memory;
    use kpi_core::model::catalog::{IndicatorCategory, NewIndicator, NewMacroprocess, NewProcess};
    use kpi_core::CatalogRepository;

    fn seeded() -> (Connection, IndicatorId) {
        let conn = open_db_in_memory().unwrap();
        let id = {
            let catalog = SqliteCatalogRepository::new(&conn);
            let macroprocess = catalog
                .insert_macroprocess(&NewMacroprocess::new("MP-1", "Strategic"))
                .unwrap();
            let process = catalog
                .insert_process(&NewProcess::new("PR-1", "Planning", Some(macroprocess.id)))
                .unwrap();
            let mut indicator = NewIndicator::new(
                "IND-1",
                "Plan compliance",
                Some(process.id),
                IndicatorCategory::Efficacy,
            );
            indicator.target = Some("95%".to_string());
            catalog.insert_indicator(&indicator).unwrap().id
        };
        (conn, id)
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_relative_log_dir() {
        let error = init_logging("info", "relative/logs");
        assert!(error.contains("not absolute"));
    }

    #[test]
    fn create_returns_201_and_duplicate_returns_400() {
        let (conn, id) = seeded();

        let created = create_measurement(&conn, NewMeasurement::new(id, 2025, 1, 90.0));
        assert_eq!(created.status, STATUS_CREATED);
        assert!(created.is_success());
        assert_eq!(created.body.data.as_ref().unwrap()["month"], 1);

        let duplicate = create_measurement(&conn, NewMeasurement::new(id, 2025, 1, 91.0));
        assert_eq!(duplicate.status, STATUS_BAD_REQUEST);
        assert_eq!(duplicate.body.error.as_deref(), Some("conflict"));
        assert_eq!(
            duplicate.body.message.as_deref(),
            Some("a measurement already exists for 1/2025")
        );
    }

    #[test]
    fn writes_against_missing_rows_return_400() {
        let (conn, _) = seeded();

        let unknown_indicator = create_measurement(&conn, NewMeasurement::new(999, 2025, 1, 1.0));
        assert_eq!(unknown_indicator.status, STATUS_BAD_REQUEST);

        let update = update_measurement(&conn, 999, &MeasurementPatch::default());
        assert_eq!(update.status, STATUS_BAD_REQUEST);
        assert_eq!(delete_measurement(&conn, 999).status, STATUS_BAD_REQUEST);
    }

    #[test]
    fn get_measurement_returns_404_when_missing() {
        let (conn, id) = seeded();
        assert_eq!(get_measurement(&conn, 1).status, STATUS_NOT_FOUND);

        let created = create_measurement(&conn, NewMeasurement::new(id, 2025, 2, 88.0));
        let measurement_id = created.body.data.unwrap()["id"].as_i64().unwrap();
        let found = get_measurement(&conn, measurement_id);
        assert_eq!(found.status, STATUS_OK);
        assert_eq!(
            found.body.data.unwrap()["indicator"]["indicator"]["code"],
            "IND-1"
        );
    }

    #[test]
    fn list_routes_report_total() {
        let (conn, id) = seeded();
        create_measurement(&conn, NewMeasurement::new(id, 2025, 1, 1.0));
        create_measurement(&conn, NewMeasurement::new(id, 2025, 2, 2.0));

        let measurements = list_measurements(&conn, &MeasurementFilter::for_indicator(id));
        assert_eq!(measurements.body.total, Some(2));
        let first = &measurements.body.data.unwrap()[0];
        assert_eq!(first["month"], 2);
        assert_eq!(first["indicator"]["indicator"]["name"], "Plan compliance");

        let indicators = list_indicators(&conn, &IndicatorFilter::default());
        assert_eq!(indicators.body.total, Some(1));
        let row = &indicators.body.data.unwrap()[0];
        assert_eq!(row["macroprocess"], "Strategic");
        assert_eq!(row["macroprocess_color"], "#003595");
    }

    #[test]
    fn get_indicator_returns_row_or_404() {
        let (conn, id) = seeded();

        let found = get_indicator(&conn, id);
        assert_eq!(found.status, STATUS_OK);
        let row = found.body.data.unwrap();
        assert_eq!(row["code"], "IND-1");
        assert_eq!(row["process"], "Planning");
        assert!(row.get("description").is_some());

        let missing = get_indicator(&conn, 999);
        assert_eq!(missing.status, STATUS_NOT_FOUND);
        assert_eq!(missing.body.message.as_deref(), Some("Indicator not found"));
    }

    #[test]
    fn indicators_by_process_lists_active_in_display_order() {
        let (conn, _) = seeded();
        let catalog = SqliteCatalogRepository::new(&conn);
        let process = catalog
            .insert_process(&NewProcess::new("PR-2", "Budgeting", None))
            .unwrap();
        let mut second = NewIndicator::new(
            "IND-3",
            "Budget variance",
            Some(process.id),
            IndicatorCategory::Efficiency,
        );
        second.display_order = 2;
        let mut first = NewIndicator::new(
            "IND-2",
            "Budget approval",
            Some(process.id),
            IndicatorCategory::Efficacy,
        );
        first.display_order = 1;
        let mut retired = NewIndicator::new(
            "IND-4",
            "Legacy ratio",
            Some(process.id),
            IndicatorCategory::Efficacy,
        );
        retired.is_active = false;
        catalog.insert_indicator(&second).unwrap();
        catalog.insert_indicator(&first).unwrap();
        catalog.insert_indicator(&retired).unwrap();

        let reply = indicators_by_process(&conn, process.id);
        assert_eq!(reply.status, STATUS_OK);
        assert_eq!(reply.body.total, Some(2));
        let codes: Vec<String> = reply
            .body
            .data
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["code"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(codes, vec!["IND-2", "IND-3"]);

        assert_eq!(indicators_by_process(&conn, 999).body.total, Some(0));
    }

    #[test]
    fn composites_return_404_for_unknown_indicator() {
        let (conn, _) = seeded();
        assert_eq!(chart_dataset(&conn, 999, Some(2025)).status, STATUS_NOT_FOUND);
        assert_eq!(indicator_summary(&conn, 999, None).status, STATUS_NOT_FOUND);
    }

    #[test]
    fn summary_defaults_to_current_year() {
        let (conn, id) = seeded();
        let year = current_year(&conn).unwrap();

        let reply = indicator_summary(&conn, id, None);
        assert_eq!(reply.status, STATUS_OK);
        let data = reply.body.data.unwrap();
        assert_eq!(data["year"], year);
        assert_eq!(data["monthly"].as_array().unwrap().len(), 12);
        assert_eq!(data["chart"]["datasets"][1]["data"][0], 95.0);
    }

    #[test]
    fn upsert_and_years_routes() {
        let (conn, id) = seeded();
        assert_eq!(
            upsert_measurement(&conn, NewMeasurement::new(id, 2024, 3, 1.0).into()).status,
            STATUS_OK
        );
        assert_eq!(
            upsert_measurement(&conn, NewMeasurement::new(id, 2024, 3, 2.0).into()).status,
            STATUS_OK
        );

        let years = available_years(&conn, id);
        assert_eq!(years.body.data.unwrap(), serde_json::json!([2024]));

        let stats = indicator_statistics(&conn, id, Some(2024));
        assert_eq!(stats.body.data.unwrap()["latest_value"], 2.0);
    }

    #[test]
    fn envelope_omits_absent_keys() {
        let (conn, _) = seeded();
        let grouped = grouped_indicators(&conn);
        let json: Value = serde_json::from_str(&grouped.body_json()).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert!(json.get("total").is_none());

        let stats = indicator_stats(&conn);
        assert_eq!(stats.body.data.unwrap()["total"], 1);
    }

    #[test]
    fn decode_body_rejects_malformed_json() {
        let reply = decode_body::<NewMeasurement>("{\"indicator_id\": 1}").unwrap_err();
        assert_eq!(reply.status, STATUS_BAD_REQUEST);

        let patch: MeasurementPatch = decode_body("{\"notes\": null}").unwrap();
        assert_eq!(patch.notes, Some(None));

        let upsert: UpsertMeasurement = decode_body(
            "{\"indicator_id\": 1, \"year\": 2025, \"month\": 1, \"value\": 2.0}",
        )
        .unwrap();
        assert_eq!(upsert.notes, None);
    }
}
