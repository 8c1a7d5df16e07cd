//! Measurement use-case service.
//!
//! # Responsibility
//! - Create, update, delete, look up and list monthly measurements.
//! - Attach indicator ancestry to every read that returns measurements.
//! - Enforce the one-measurement-per-period invariant before every write.
//! - Provide idempotent `upsert` keyed by period.
//!
//! # Invariants
//! - Existence and uniqueness checks run in the same write scope as the
//!   write they guard.
//! - A unique violation raised by storage is reported as `Conflict`, same as
//!   the pre-check.
//! - Defaults are filled only by `NewMeasurement::into_fields`.

use crate::model::catalog::{IndicatorId, IndicatorWithAncestry};
use crate::model::measurement::{
    Measurement, MeasurementId, MeasurementPatch, NewMeasurement, UpsertMeasurement,
};
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::measurement_repo::{MeasurementFilter, MeasurementRepository};
use crate::repo::RepoError;
use crate::service::error::{ServiceError, ServiceResult};
use log::{error, info, warn};
use serde::Serialize;
use std::collections::HashMap;

/// Measurement joined with its indicator -> process -> macroprocess chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementDetail {
    #[serde(flatten)]
    pub measurement: Measurement,
    pub indicator: IndicatorWithAncestry,
}

/// Measurement service facade over repository implementations.
pub struct MeasurementService<M: MeasurementRepository, C: CatalogRepository> {
    measurements: M,
    catalog: C,
}

impl<M: MeasurementRepository, C: CatalogRepository> MeasurementService<M, C> {
    /// Creates a service using the provided repository implementations.
    pub fn new(measurements: M, catalog: C) -> Self {
        Self {
            measurements,
            catalog,
        }
    }

    /// Records a measurement for a free period.
    ///
    /// # Errors
    /// - `NotFound` when the indicator does not exist.
    /// - `Conflict` when the period already has a measurement.
    /// - `Validation` when the input breaks model rules.
    pub fn create(&self, input: NewMeasurement) -> ServiceResult<Measurement> {
        let key = input.period_key();
        let result = self.create_inner(input);
        log_write("measurement_create", &result, || {
            format!("indicator_id={} period={key}", key.indicator_id)
        });
        result
    }

    fn create_inner(&self, input: NewMeasurement) -> ServiceResult<Measurement> {
        let key = input.period_key();
        let fields = input.into_fields();
        fields.validate()?;

        self.measurements.write_scope(|| {
            if !self.catalog.indicator_exists(key.indicator_id)? {
                return Err(ServiceError::indicator_not_found(key.indicator_id));
            }
            if self.measurements.find_by_period(key)?.is_some() {
                return Err(ServiceError::Conflict(key));
            }
            self.measurements
                .insert(key.indicator_id, &fields)
                .map_err(|err| ServiceError::from_write(err, key))
        })
    }

    /// Applies a partial update to one measurement.
    ///
    /// When the patch moves the period, the target period must be free of
    /// every other measurement of the same indicator.
    pub fn update(&self, id: MeasurementId, patch: &MeasurementPatch) -> ServiceResult<Measurement> {
        let result = self.measurements.write_scope(|| {
            let current = self
                .measurements
                .find_by_id(id)?
                .ok_or_else(|| ServiceError::measurement_not_found(id))?;

            let key = patch.effective_period(&current);
            if patch.changes_period() {
                if let Some(other) = self.measurements.find_by_period(key)? {
                    if other.id != id {
                        return Err(ServiceError::Conflict(key));
                    }
                }
            }

            let fields = patch.apply_to(&current);
            fields.validate()?;
            self.measurements
                .update(id, &fields)
                .map_err(|err| ServiceError::from_write(err, key))
        });
        log_write("measurement_update", &result, || format!("measurement_id={id}"));
        result
    }

    /// Hard-deletes one measurement.
    pub fn delete(&self, id: MeasurementId) -> ServiceResult<()> {
        let result = self.measurements.write_scope(|| {
            if self.measurements.find_by_id(id)?.is_none() {
                return Err(ServiceError::measurement_not_found(id));
            }
            self.measurements.delete(id).map_err(ServiceError::from)
        });
        log_write("measurement_delete", &result, || format!("measurement_id={id}"));
        result
    }

    /// Loads one measurement with its full catalog ancestry.
    pub fn get_by_id(&self, id: MeasurementId) -> ServiceResult<Option<MeasurementDetail>> {
        let Some(measurement) = self.measurements.find_by_id(id)? else {
            return Ok(None);
        };
        let indicator = self.load_indicator(&measurement)?;
        Ok(Some(MeasurementDetail {
            measurement,
            indicator,
        }))
    }

    /// Lists measurements matching every supplied filter, most recent first,
    /// each with its indicator attached.
    pub fn list(&self, filter: &MeasurementFilter) -> ServiceResult<Vec<MeasurementDetail>> {
        let rows = self.measurements.query(filter)?;
        let mut indicators: HashMap<IndicatorId, IndicatorWithAncestry> = HashMap::new();
        let mut details = Vec::with_capacity(rows.len());
        for measurement in rows {
            let indicator = match indicators.get(&measurement.indicator_id) {
                Some(indicator) => indicator.clone(),
                None => {
                    let indicator = self.load_indicator(&measurement)?;
                    indicators.insert(measurement.indicator_id, indicator.clone());
                    indicator
                }
            };
            details.push(MeasurementDetail {
                measurement,
                indicator,
            });
        }
        Ok(details)
    }

    /// Creates the period's measurement, or updates it in place when present.
    ///
    /// The update path only touches fields the input supplied; an explicit
    /// `null` clears a stored value. Repeated submissions converge on one row.
    pub fn upsert(&self, input: UpsertMeasurement) -> ServiceResult<Measurement> {
        match self.measurements.find_by_period(input.period_key())? {
            Some(existing) => self.update(existing.id, &input.into_patch()),
            None => self.create(input.into_new()),
        }
    }

    /// Distinct years with recorded measurements, newest first.
    pub fn available_years(&self, indicator_id: IndicatorId) -> ServiceResult<Vec<i32>> {
        self.measurements
            .distinct_years(indicator_id)
            .map_err(Into::into)
    }

    fn load_indicator(&self, measurement: &Measurement) -> ServiceResult<IndicatorWithAncestry> {
        self.catalog
            .find_indicator(measurement.indicator_id)?
            .ok_or_else(|| {
                ServiceError::Unexpected(RepoError::InvalidData(format!(
                    "measurement {} references missing indicator {}",
                    measurement.id, measurement.indicator_id
                )))
            })
    }
}

fn log_write<T>(event: &str, result: &ServiceResult<T>, subject: impl FnOnce() -> String) {
    match result {
        Ok(_) => info!("event={event} module=measurement status=ok {}", subject()),
        Err(err) if err.is_unexpected() => error!(
            "event={event} module=measurement status=error error_code={} {} error={err}",
            err.code(),
            subject()
        ),
        Err(err) => warn!(
            "event={event} module=measurement status=rejected error_code={} {} reason={err}",
            err.code(),
            subject()
        ),
    }
}
