use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::admission::AdmissionKey;
use crate::domain::patient::PatientCode;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("discharge date {discharge_date} precedes admission date {admission_date}")]
pub struct InvalidIntervalError {
    pub admission_date: NaiveDate,
    pub discharge_date: NaiveDate,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed admission for patient {patient_code} admitted at {admitted_at}: {source}")]
    MalformedAdmission {
        patient_code: PatientCode,
        admitted_at: NaiveDateTime,
        #[source]
        source: InvalidIntervalError,
    },
    #[error("duplicate effective-from date {effective_from} in price schedule `{item}`")]
    DuplicateEffectiveDate { item: String, effective_from: NaiveDate },
    #[error("negative price {price} in price schedule `{item}` effective from {effective_from}")]
    NegativePrice { item: String, price: Decimal, effective_from: NaiveDate },
    #[error("{cost} cost total overflowed for patient {patient_code} admitted at {admitted_at}")]
    CostOverflow { cost: &'static str, patient_code: PatientCode, admitted_at: NaiveDateTime },
    #[error("duplicate patient code `{0}` in patient dimension")]
    DuplicatePatientCode(PatientCode),
    #[error("invalid calendar range: start {start} is after end {end}")]
    InvalidCalendarRange { start: NaiveDate, end: NaiveDate },
}

/// Failure reported by a source or warehouse collaborator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage decode failure: {0}")]
    Decode(String),
    #[error("storage write failure: {0}")]
    Write(String),
}

impl DomainError {
    pub fn cost_overflow(cost: &'static str, key: AdmissionKey) -> Self {
        Self::CostOverflow { cost, patient_code: key.patient_code, admitted_at: key.admitted_at }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::MalformedAdmission { .. } => "malformed_interval",
            Self::DuplicateEffectiveDate { .. }
            | Self::NegativePrice { .. }
            | Self::CostOverflow { .. } => "price_integrity",
            Self::DuplicatePatientCode(_) => "dimension_integrity",
            Self::InvalidCalendarRange { .. } => "calendar_range",
        }
    }
}
