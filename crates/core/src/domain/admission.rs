use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::patient::PatientCode;
use crate::domain::pricing::TestCode;

/// Identifies one hospital stay: a patient is admitted at most once at a given instant.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AdmissionKey {
    pub patient_code: PatientCode,
    pub admitted_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub patient_code: PatientCode,
    pub admitted_at: NaiveDateTime,
    pub discharged_at: NaiveDateTime,
}

impl Admission {
    pub fn key(&self) -> AdmissionKey {
        AdmissionKey { patient_code: self.patient_code.clone(), admitted_at: self.admitted_at }
    }

    pub fn admission_date(&self) -> NaiveDate {
        self.admitted_at.date()
    }

    pub fn discharge_date(&self) -> NaiveDate {
        self.discharged_at.date()
    }
}

/// A lab test performed during an admission, priced as of its own date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEvent {
    pub patient_code: PatientCode,
    pub admitted_at: NaiveDateTime,
    pub test_code: TestCode,
    pub tested_at: NaiveDateTime,
}

impl TestEvent {
    pub fn admission_key(&self) -> AdmissionKey {
        AdmissionKey { patient_code: self.patient_code.clone(), admitted_at: self.admitted_at }
    }

    pub fn test_date(&self) -> NaiveDate {
        self.tested_at.date()
    }
}
