//! Derived views over measurements and the indicator catalog.
//!
//! # Responsibility
//! - Aggregate statistics and trend classification.
//! - Gap-filled monthly series and chart datasets.
//! - Macroprocess/process grouping and catalog tallies.
//!
//! # Invariants
//! - Functions here are pure: no storage access, no logging.

pub mod grouping;
pub mod series;
pub mod statistics;
