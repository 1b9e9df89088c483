use std::fmt;

use chrono::{NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::Serialize;
use ts_rs::TS;

use crate::form::{Field, FormValues, DATE_FORMAT, TIME_FORMAT};

/// Inline error shown next to a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    fn new(field: Field, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

/// All field errors of one validation pass, in form order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FieldErrors {
    pub errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn contains(&self, field: Field) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.errors.iter().map(|e| e.field.as_str()).collect();
        write!(f, "Invalid fields: {}", fields.join(", "))
    }
}

impl std::error::Error for FieldErrors {}

/// Values that passed validation, already coerced to their target types
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedForm {
    /// Epoch milliseconds
    pub time: i64,
    pub latitude: f64,
    pub longitude: f64,
}

fn parse_coordinate(value: &str, min: f64, max: f64) -> Option<f64> {
    let parsed = value.trim().parse::<f64>().ok()?;
    (parsed.is_finite() && (min..=max).contains(&parsed)).then_some(parsed)
}

/// Latitude must be a finite number in [-90, 90]
pub fn validate_latitude(value: &str) -> Result<f64, FieldError> {
    parse_coordinate(value, -90.0, 90.0)
        .ok_or_else(|| FieldError::new(Field::Latitude, "Invalid latitude"))
}

/// Longitude must be a finite number in [-180, 180]
pub fn validate_longitude(value: &str) -> Result<f64, FieldError> {
    parse_coordinate(value, -180.0, 180.0)
        .ok_or_else(|| FieldError::new(Field::Longitude, "Invalid longitude"))
}

pub fn validate_date(value: &str) -> Result<NaiveDate, FieldError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| FieldError::new(Field::Date, "Invalid date"))
}

/// Accepts `HH:MM` and `HH:MM:SS`
pub fn validate_time(value: &str) -> Result<NaiveTime, FieldError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| FieldError::new(Field::Time, "Invalid time"))
}

/// Combine a date and a time field into epoch milliseconds in `tz`.
///
/// A wall-clock time repeated by a DST fall-back resolves to its earlier
/// instant. A time skipped by a spring-forward gap is invalid.
pub fn combine_timestamp(date: &str, time: &str, tz: Tz) -> Result<i64, FieldErrors> {
    let mut errors = FieldErrors::default();
    let date = validate_date(date).map_err(|e| errors.push(e)).ok();
    let time = validate_time(time).map_err(|e| errors.push(e)).ok();

    match (date, time) {
        (Some(date), Some(time)) => tz
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|dt| dt.timestamp_millis())
            .ok_or_else(|| FieldErrors {
                errors: vec![FieldError::new(Field::Time, "Invalid time")],
            }),
        _ => Err(errors),
    }
}

/// Validate every constrained field of the form at once
pub fn validate_form(values: &FormValues, tz: Tz) -> Result<ValidatedForm, FieldErrors> {
    let mut errors = FieldErrors::default();

    let time = combine_timestamp(&values.date, &values.time, tz)
        .map_err(|e| errors.errors.extend(e.errors))
        .ok();
    let latitude = validate_latitude(&values.latitude)
        .map_err(|e| errors.push(e))
        .ok();
    let longitude = validate_longitude(&values.longitude)
        .map_err(|e| errors.push(e))
        .ok();

    match (time, latitude, longitude) {
        (Some(time), Some(latitude), Some(longitude)) => Ok(ValidatedForm {
            time,
            latitude,
            longitude,
        }),
        _ => Err(errors),
    }
}
