use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::admission::AdmissionKey;
use crate::domain::patient::PatientCode;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactHospitalStay {
    pub patient_code: PatientCode,
    pub admitted_at: NaiveDateTime,
    pub total_stay_cost: Decimal,
    pub total_test_cost: Decimal,
}

impl FactHospitalStay {
    pub fn key(&self) -> AdmissionKey {
        AdmissionKey { patient_code: self.patient_code.clone(), admitted_at: self.admitted_at }
    }

    /// Stay plus test cost, or `None` if the sum leaves the decimal range.
    pub fn total_cost(&self) -> Option<Decimal> {
        self.total_stay_cost.checked_add(self.total_test_cost)
    }
}
