//! Smoke CLI for the KPI core.
//!
//! # Responsibility
//! - Print the core version to verify crate wiring.
//! - Given a database, print read-only route replies as JSON.
//! - Optionally start file logging before touching the database.

use clap::Parser;
use kpi_core::db::open_db;
use std::path::PathBuf;
use std::process::ExitCode;

/// Read-only smoke check over a KPI database.
#[derive(Parser, Debug)]
#[command(name = "kpi_cli", version, about)]
struct Args {
    /// SQLite database file; only the version is printed without one
    #[arg(value_name = "DB_PATH", env = "KPI_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Indicator to summarize; grouped indicators are printed when omitted
    #[arg(value_name = "INDICATOR_ID")]
    indicator_id: Option<i64>,

    /// Summary year [default: current year]
    #[arg(value_name = "YEAR", requires = "indicator_id")]
    year: Option<i32>,

    /// Absolute directory for rolling log files
    #[arg(long, value_name = "DIR", env = "KPI_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error [default: debug in debug builds, info otherwise]
    #[arg(long, value_name = "LEVEL", requires = "log_dir")]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    println!("kpi_core version={}", kpi_api::core_version());

    if let Some(log_dir) = &args.log_dir {
        let level = args
            .log_level
            .as_deref()
            .unwrap_or_else(|| kpi_core::default_log_level());
        if let Err(err) = kpi_core::init_logging(level, &log_dir.to_string_lossy()) {
            eprintln!("failed to start logging: {err}");
            return ExitCode::FAILURE;
        }
    }

    let Some(db_path) = args.db_path else {
        return ExitCode::SUCCESS;
    };

    let conn = match open_db(&db_path) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("failed to open `{}`: {err}", db_path.display());
            return ExitCode::FAILURE;
        }
    };

    let reply = match args.indicator_id {
        Some(indicator_id) => kpi_api::indicator_summary(&conn, indicator_id, args.year),
        None => kpi_api::grouped_indicators(&conn),
    };

    println!("status={}", reply.status);
    println!("{}", reply.body_json());
    if reply.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_indicator_and_year_after_db_path() {
        let args = Args::try_parse_from(["kpi_cli", "/tmp/kpi.db", "7", "2024"]).unwrap();
        assert_eq!(args.db_path, Some(PathBuf::from("/tmp/kpi.db")));
        assert_eq!(args.indicator_id, Some(7));
        assert_eq!(args.year, Some(2024));
    }

    #[test]
    fn rejects_non_numeric_indicator_id() {
        assert!(Args::try_parse_from(["kpi_cli", "/tmp/kpi.db", "seven"]).is_err());
    }

    #[test]
    fn log_level_requires_log_dir() {
        assert!(Args::try_parse_from(["kpi_cli", "--log-level", "info"]).is_err());
        let args =
            Args::try_parse_from(["kpi_cli", "--log-dir", "/tmp/kpi-logs", "--log-level", "warn"])
                .unwrap();
        assert_eq!(args.log_level.as_deref(), Some("warn"));
    }
}
