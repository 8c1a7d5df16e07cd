//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Translate repository failures into the `ServiceError` taxonomy.
//! - Keep transport layers decoupled from storage details.

pub mod error;
pub mod indicator_service;
pub mod measurement_service;
pub mod report_service;
