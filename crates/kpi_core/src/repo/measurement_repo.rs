//! Measurement repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide point, period and filtered lookups over `measurements`.
//! - Persist fully resolved `MeasurementFields` on insert and update.
//! - Offer a write scope so check-then-write sequences run atomically.
//!
//! # Invariants
//! - Write paths call `MeasurementFields::validate()` before SQL mutations.
//! - Listings are ordered `year DESC, month DESC, indicator_id ASC`.
//! - A `UNIQUE(indicator_id, year, month)` violation surfaces as
//!   `RepoError::UniqueViolation`, never as a raw SQLite error.

use crate::model::catalog::IndicatorId;
use crate::model::measurement::{
    Measurement, MeasurementFields, MeasurementId, MeasurementStatus, PeriodKey,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const MEASUREMENT_SELECT_SQL: &str = "SELECT
    id,
    indicator_id,
    year,
    month,
    value,
    period_target,
    numerator,
    denominator,
    notes,
    recorded_by,
    status,
    created_at,
    updated_at
FROM measurements";

/// Independent, ANDed filters for measurement listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementFilter {
    pub indicator_id: Option<IndicatorId>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub status: Option<MeasurementStatus>,
}

impl MeasurementFilter {
    pub fn for_indicator(indicator_id: IndicatorId) -> Self {
        Self {
            indicator_id: Some(indicator_id),
            ..Self::default()
        }
    }
}

/// Repository interface for measurement persistence.
pub trait MeasurementRepository {
    /// Loads the measurement recorded for one period, if any.
    fn find_by_period(&self, key: PeriodKey) -> RepoResult<Option<Measurement>>;
    /// Loads one measurement by id.
    fn find_by_id(&self, id: MeasurementId) -> RepoResult<Option<Measurement>>;
    /// Inserts a new row and returns it as stored.
    fn insert(&self, indicator_id: IndicatorId, fields: &MeasurementFields)
        -> RepoResult<Measurement>;
    /// Overwrites every mutable column of one row and returns it as stored.
    fn update(&self, id: MeasurementId, fields: &MeasurementFields) -> RepoResult<Measurement>;
    /// Hard-deletes one row.
    fn delete(&self, id: MeasurementId) -> RepoResult<()>;
    /// Lists rows matching all supplied filters, most recent first.
    fn query(&self, filter: &MeasurementFilter) -> RepoResult<Vec<Measurement>>;
    /// Distinct years with at least one row for the indicator, descending.
    fn distinct_years(&self, indicator_id: IndicatorId) -> RepoResult<Vec<i32>>;
    /// Runs `work` so that its reads and writes commit or roll back together.
    fn write_scope<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>;
}

/// SQLite-backed measurement repository.
pub struct SqliteMeasurementRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMeasurementRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MeasurementRepository for SqliteMeasurementRepository<'_> {
    fn find_by_period(&self, key: PeriodKey) -> RepoResult<Option<Measurement>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEASUREMENT_SELECT_SQL}
             WHERE indicator_id = ?1
               AND year = ?2
               AND month = ?3;"
        ))?;
        let mut rows = stmt.query(params![key.indicator_id, key.year, key.month])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_measurement_row(row)?));
        }
        Ok(None)
    }

    fn find_by_id(&self, id: MeasurementId) -> RepoResult<Option<Measurement>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEASUREMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_measurement_row(row)?));
        }
        Ok(None)
    }

    fn insert(
        &self,
        indicator_id: IndicatorId,
        fields: &MeasurementFields,
    ) -> RepoResult<Measurement> {
        fields.validate()?;

        self.conn.execute(
            "INSERT INTO measurements (
                indicator_id,
                year,
                month,
                value,
                period_target,
                numerator,
                denominator,
                notes,
                recorded_by,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                indicator_id,
                fields.year,
                fields.month,
                fields.value,
                fields.period_target,
                fields.numerator,
                fields.denominator,
                fields.notes.as_deref(),
                fields.recorded_by.as_deref(),
                fields.status.as_str(),
            ],
        )?;

        load_required(self.conn, self.conn.last_insert_rowid())
    }

    fn update(&self, id: MeasurementId, fields: &MeasurementFields) -> RepoResult<Measurement> {
        fields.validate()?;

        let changed = self.conn.execute(
            "UPDATE measurements
             SET
                year = ?2,
                month = ?3,
                value = ?4,
                period_target = ?5,
                numerator = ?6,
                denominator = ?7,
                notes = ?8,
                recorded_by = ?9,
                status = ?10,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id,
                fields.year,
                fields.month,
                fields.value,
                fields.period_target,
                fields.numerator,
                fields.denominator,
                fields.notes.as_deref(),
                fields.recorded_by.as_deref(),
                fields.status.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "measurement",
                id,
            });
        }

        load_required(self.conn, id)
    }

    fn delete(&self, id: MeasurementId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM measurements WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "measurement",
                id,
            });
        }
        Ok(())
    }

    fn query(&self, filter: &MeasurementFilter) -> RepoResult<Vec<Measurement>> {
        let mut sql = format!("{MEASUREMENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(indicator_id) = filter.indicator_id {
            sql.push_str(" AND indicator_id = ?");
            bind_values.push(Value::Integer(indicator_id));
        }

        if let Some(year) = filter.year {
            sql.push_str(" AND year = ?");
            bind_values.push(Value::Integer(i64::from(year)));
        }

        if let Some(month) = filter.month {
            sql.push_str(" AND month = ?");
            bind_values.push(Value::Integer(i64::from(month)));
        }

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }

        sql.push_str(" ORDER BY year DESC, month DESC, indicator_id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_measurement_row(row)?);
        }
        Ok(items)
    }

    fn distinct_years(&self, indicator_id: IndicatorId) -> RepoResult<Vec<i32>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT year
             FROM measurements
             WHERE indicator_id = ?1
             ORDER BY year DESC;",
        )?;
        let mut rows = stmt.query([indicator_id])?;
        let mut years = Vec::new();
        while let Some(row) = rows.next()? {
            years.push(row.get(0)?);
        }
        Ok(years)
    }

    fn write_scope<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        // Dropping `tx` on the error path rolls the work back.
        let output = work()?;
        tx.commit().map_err(RepoError::from)?;
        Ok(output)
    }
}

fn load_required(conn: &Connection, id: MeasurementId) -> RepoResult<Measurement> {
    let mut stmt = conn.prepare(&format!("{MEASUREMENT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return parse_measurement_row(row);
    }
    Err(RepoError::NotFound {
        entity: "measurement",
        id,
    })
}

fn parse_measurement_row(row: &Row<'_>) -> RepoResult<Measurement> {
    let status_text: String = row.get("status")?;
    let status = MeasurementStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid measurement status `{status_text}` in measurements.status"
        ))
    })?;

    Ok(Measurement {
        id: row.get("id")?,
        indicator_id: row.get("indicator_id")?,
        year: row.get("year")?,
        month: row.get("month")?,
        value: row.get("value")?,
        period_target: row.get("period_target")?,
        numerator: row.get("numerator")?,
        denominator: row.get("denominator")?,
        notes: row.get("notes")?,
        recorded_by: row.get("recorded_by")?,
        status,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
