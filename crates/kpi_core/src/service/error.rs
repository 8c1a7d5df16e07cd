//! Service error taxonomy shared by every use-case service.
//!
//! # Invariants
//! - Each failure maps to exactly one kind: not found, conflict, validation
//!   or unexpected.
//! - Unexpected errors keep their repository source for logging; callers
//!   must not forward their text to end users.

use crate::model::measurement::{MeasurementValidationError, PeriodKey};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    /// Referenced indicator or measurement does not exist.
    NotFound { entity: &'static str, id: i64 },
    /// Another measurement already occupies the period.
    Conflict(PeriodKey),
    /// Input failed model validation.
    Validation(MeasurementValidationError),
    /// Storage or consistency failure.
    Unexpected(RepoError),
}

impl ServiceError {
    pub fn indicator_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "indicator",
            id,
        }
    }

    pub fn measurement_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "measurement",
            id,
        }
    }

    /// Stable machine-readable code used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Validation(_) => "validation",
            Self::Unexpected(_) => "unexpected",
        }
    }

    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Unexpected(_))
    }

    /// Maps a write-time unique violation onto the period conflict.
    pub(crate) fn from_write(err: RepoError, key: PeriodKey) -> Self {
        match err {
            RepoError::UniqueViolation(_) => Self::Conflict(key),
            other => Self::from(other),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict(key) => write!(f, "a measurement already exists for {key}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Unexpected(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Unexpected(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Unexpected(other),
        }
    }
}

impl From<MeasurementValidationError> for ServiceError {
    fn from(value: MeasurementValidationError) -> Self {
        Self::Validation(value)
    }
}
