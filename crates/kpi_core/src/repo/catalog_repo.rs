//! Catalog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Resolve indicators together with their process and macroprocess.
//! - Provide filtered indicator listings for lookup and grouping.
//! - Administer catalog rows for seeding code and tests.
//!
//! # Invariants
//! - Indicator listings are ordered `process_id ASC, display_order ASC, id ASC`.
//! - Listings default to active indicators only.
//! - Deleting a parent row cascades to every descendant, measurements included.

use crate::model::catalog::{
    Indicator, IndicatorCategory, IndicatorId, IndicatorWithAncestry, Macroprocess,
    MacroprocessId, NewIndicator, NewMacroprocess, NewProcess, Process, ProcessId,
};
use crate::repo::{bool_to_int, int_to_bool, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const INDICATOR_WITH_ANCESTRY_SQL: &str = "SELECT
    i.id AS i_id,
    i.code AS i_code,
    i.process_id AS i_process_id,
    i.name AS i_name,
    i.formula AS i_formula,
    i.unit AS i_unit,
    i.frequency AS i_frequency,
    i.category AS i_category,
    i.target AS i_target,
    i.owner AS i_owner,
    i.description AS i_description,
    i.display_order AS i_display_order,
    i.is_active AS i_is_active,
    p.id AS p_id,
    p.code AS p_code,
    p.name AS p_name,
    p.macroprocess_id AS p_macroprocess_id,
    p.owner AS p_owner,
    p.description AS p_description,
    p.display_order AS p_display_order,
    p.is_active AS p_is_active,
    m.id AS m_id,
    m.code AS m_code,
    m.name AS m_name,
    m.color AS m_color,
    m.icon AS m_icon,
    m.display_order AS m_display_order,
    m.is_active AS m_is_active
FROM indicators i
LEFT JOIN processes p ON p.id = i.process_id
LEFT JOIN macroprocesses m ON m.id = p.macroprocess_id";

/// Query options for indicator listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorFilter {
    pub macroprocess_id: Option<MacroprocessId>,
    pub process_id: Option<ProcessId>,
    pub category: Option<IndicatorCategory>,
    /// `None` means active indicators only.
    pub is_active: Option<bool>,
}

/// Repository interface for catalog reads and administration.
pub trait CatalogRepository {
    /// Inserts one macroprocess.
    fn insert_macroprocess(&self, input: &NewMacroprocess) -> RepoResult<Macroprocess>;
    /// Inserts one process.
    fn insert_process(&self, input: &NewProcess) -> RepoResult<Process>;
    /// Inserts one indicator.
    fn insert_indicator(&self, input: &NewIndicator) -> RepoResult<Indicator>;
    /// Deletes a macroprocess and, by cascade, its processes and below.
    fn delete_macroprocess(&self, id: MacroprocessId) -> RepoResult<()>;
    /// Deletes a process and, by cascade, its indicators and below.
    fn delete_process(&self, id: ProcessId) -> RepoResult<()>;
    /// Deletes an indicator and, by cascade, its measurements.
    fn delete_indicator(&self, id: IndicatorId) -> RepoResult<()>;
    /// Loads one indicator (active or not) with resolved ancestry.
    fn find_indicator(&self, id: IndicatorId) -> RepoResult<Option<IndicatorWithAncestry>>;
    /// Existence check used before measurement writes.
    fn indicator_exists(&self, id: IndicatorId) -> RepoResult<bool>;
    /// Lists indicators with ancestry using optional filters.
    fn list_indicators(&self, filter: &IndicatorFilter) -> RepoResult<Vec<IndicatorWithAncestry>>;

    /// Lists every active indicator, sorted by process then display order.
    fn list_active_indicators_with_ancestry(&self) -> RepoResult<Vec<IndicatorWithAncestry>> {
        self.list_indicators(&IndicatorFilter::default())
    }
}

/// SQLite-backed catalog repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn insert_macroprocess(&self, input: &NewMacroprocess) -> RepoResult<Macroprocess> {
        self.conn.execute(
            "INSERT INTO macroprocesses (
                code,
                name,
                color,
                icon,
                display_order,
                is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                input.code.as_str(),
                input.name.as_str(),
                input.color.as_deref(),
                input.icon.as_deref(),
                input.display_order,
                bool_to_int(input.is_active),
            ],
        )?;

        Ok(Macroprocess {
            id: self.conn.last_insert_rowid(),
            code: input.code.clone(),
            name: input.name.clone(),
            color: input.color.clone(),
            icon: input.icon.clone(),
            display_order: input.display_order,
            is_active: input.is_active,
        })
    }

    fn insert_process(&self, input: &NewProcess) -> RepoResult<Process> {
        self.conn.execute(
            "INSERT INTO processes (
                code,
                name,
                macroprocess_id,
                owner,
                description,
                display_order,
                is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                input.code.as_str(),
                input.name.as_str(),
                input.macroprocess_id,
                input.owner.as_deref(),
                input.description.as_deref(),
                input.display_order,
                bool_to_int(input.is_active),
            ],
        )?;

        Ok(Process {
            id: self.conn.last_insert_rowid(),
            code: input.code.clone(),
            name: input.name.clone(),
            macroprocess_id: input.macroprocess_id,
            owner: input.owner.clone(),
            description: input.description.clone(),
            display_order: input.display_order,
            is_active: input.is_active,
        })
    }

    fn insert_indicator(&self, input: &NewIndicator) -> RepoResult<Indicator> {
        self.conn.execute(
            "INSERT INTO indicators (
                code,
                process_id,
                name,
                formula,
                unit,
                frequency,
                category,
                target,
                owner,
                description,
                display_order,
                is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                input.code.as_str(),
                input.process_id,
                input.name.as_str(),
                input.formula.as_str(),
                input.unit.as_str(),
                input.frequency.as_str(),
                input.category.as_str(),
                input.target.as_deref(),
                input.owner.as_str(),
                input.description.as_deref(),
                input.display_order,
                bool_to_int(input.is_active),
            ],
        )?;

        Ok(Indicator {
            id: self.conn.last_insert_rowid(),
            code: input.code.clone(),
            process_id: input.process_id,
            name: input.name.clone(),
            formula: input.formula.clone(),
            unit: input.unit.clone(),
            frequency: input.frequency.clone(),
            category: input.category,
            target: input.target.clone(),
            owner: input.owner.clone(),
            description: input.description.clone(),
            display_order: input.display_order,
            is_active: input.is_active,
        })
    }

    fn delete_macroprocess(&self, id: MacroprocessId) -> RepoResult<()> {
        delete_by_id(self.conn, "macroprocesses", "macroprocess", id)
    }

    fn delete_process(&self, id: ProcessId) -> RepoResult<()> {
        delete_by_id(self.conn, "processes", "process", id)
    }

    fn delete_indicator(&self, id: IndicatorId) -> RepoResult<()> {
        delete_by_id(self.conn, "indicators", "indicator", id)
    }

    fn find_indicator(&self, id: IndicatorId) -> RepoResult<Option<IndicatorWithAncestry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{INDICATOR_WITH_ANCESTRY_SQL} WHERE i.id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_indicator_with_ancestry(row)?));
        }
        Ok(None)
    }

    fn indicator_exists(&self, id: IndicatorId) -> RepoResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM indicators WHERE id = ?1;", [id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn list_indicators(&self, filter: &IndicatorFilter) -> RepoResult<Vec<IndicatorWithAncestry>> {
        let mut sql = format!("{INDICATOR_WITH_ANCESTRY_SQL} WHERE i.is_active = ?");
        let mut bind_values: Vec<Value> =
            vec![Value::Integer(bool_to_int(filter.is_active.unwrap_or(true)))];

        if let Some(process_id) = filter.process_id {
            sql.push_str(" AND i.process_id = ?");
            bind_values.push(Value::Integer(process_id));
        }

        if let Some(macroprocess_id) = filter.macroprocess_id {
            sql.push_str(" AND p.macroprocess_id = ?");
            bind_values.push(Value::Integer(macroprocess_id));
        }

        if let Some(category) = filter.category {
            sql.push_str(" AND i.category = ?");
            bind_values.push(Value::Text(category.as_str().to_string()));
        }

        sql.push_str(" ORDER BY i.process_id ASC, i.display_order ASC, i.id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_indicator_with_ancestry(row)?);
        }
        Ok(items)
    }
}

fn delete_by_id(conn: &Connection, table: &str, entity: &'static str, id: i64) -> RepoResult<()> {
    let changed = conn.execute(&format!("DELETE FROM {table} WHERE id = ?1;"), [id])?;
    if changed == 0 {
        return Err(RepoError::NotFound { entity, id });
    }
    Ok(())
}

fn parse_indicator_with_ancestry(row: &Row<'_>) -> RepoResult<IndicatorWithAncestry> {
    let category_text: String = row.get("i_category")?;
    let category = IndicatorCategory::parse(&category_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid indicator category `{category_text}` in indicators.category"
        ))
    })?;

    let indicator = Indicator {
        id: row.get("i_id")?,
        code: row.get("i_code")?,
        process_id: row.get("i_process_id")?,
        name: row.get("i_name")?,
        formula: row.get("i_formula")?,
        unit: row.get("i_unit")?,
        frequency: row.get("i_frequency")?,
        category,
        target: row.get("i_target")?,
        owner: row.get("i_owner")?,
        description: row.get("i_description")?,
        display_order: row.get("i_display_order")?,
        is_active: int_to_bool(row.get("i_is_active")?, "indicators.is_active")?,
    };

    let process = match row.get::<_, Option<i64>>("p_id")? {
        Some(id) => Some(Process {
            id,
            code: row.get("p_code")?,
            name: row.get("p_name")?,
            macroprocess_id: row.get("p_macroprocess_id")?,
            owner: row.get("p_owner")?,
            description: row.get("p_description")?,
            display_order: row.get("p_display_order")?,
            is_active: int_to_bool(row.get("p_is_active")?, "processes.is_active")?,
        }),
        None => None,
    };

    let macroprocess = match row.get::<_, Option<i64>>("m_id")? {
        Some(id) => Some(Macroprocess {
            id,
            code: row.get("m_code")?,
            name: row.get("m_name")?,
            color: row.get("m_color")?,
            icon: row.get("m_icon")?,
            display_order: row.get("m_display_order")?,
            is_active: int_to_bool(row.get("m_is_active")?, "macroprocesses.is_active")?,
        }),
        None => None,
    };

    Ok(IndicatorWithAncestry {
        indicator,
        process,
        macroprocess,
    })
}
