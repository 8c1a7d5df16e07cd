//! Domain model for the KPI catalog and its monthly measurements.
//!
//! # Responsibility
//! - Define plain data records shared by repositories and services.
//! - Centralize default-filling and validation for measurement writes.
//!
//! # Invariants
//! - Hierarchy is macroprocess -> process -> indicator -> measurement.
//! - At most one measurement exists per `PeriodKey`.

pub mod catalog;
pub mod measurement;
