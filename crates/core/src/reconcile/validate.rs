use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::fact::FactHospitalStay;
use crate::domain::patient::{Patient, PatientCode};

/// Patient codes that appear on only one side of the dimension/fact relationship.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReferentialReport {
    pub dimension_codes: usize,
    pub fact_codes: usize,
    /// Patients in the dimension without any fact row.
    pub missing_from_facts: BTreeSet<PatientCode>,
    /// Fact rows pointing at a patient absent from the dimension.
    pub missing_from_dimension: BTreeSet<PatientCode>,
}

impl ReferentialReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_from_facts.is_empty() && self.missing_from_dimension.is_empty()
    }

    pub fn symmetric_difference(&self) -> BTreeSet<PatientCode> {
        self.missing_from_facts.union(&self.missing_from_dimension).cloned().collect()
    }

    /// Human-readable diagnostic line for the operator log.
    pub fn describe(&self) -> String {
        if self.is_consistent() {
            return "all patient codes in fact_hospital_stays match dim_patients".to_string();
        }

        let codes =
            self.symmetric_difference().iter().map(|code| code.0.as_str()).collect::<Vec<_>>().join(", ");
        format!(
            "patient codes out of step between dim_patients and fact_hospital_stays: {codes} \
             ({} without facts, {} without dimension row)",
            self.missing_from_facts.len(),
            self.missing_from_dimension.len()
        )
    }
}

pub fn validate_referential(patients: &[Patient], facts: &[FactHospitalStay]) -> ReferentialReport {
    let dimension: BTreeSet<&PatientCode> = patients.iter().map(|patient| &patient.code).collect();
    let fact_codes: BTreeSet<&PatientCode> = facts.iter().map(|fact| &fact.patient_code).collect();

    ReferentialReport {
        dimension_codes: dimension.len(),
        fact_codes: fact_codes.len(),
        missing_from_facts: dimension.difference(&fact_codes).map(|code| (*code).clone()).collect(),
        missing_from_dimension: fact_codes.difference(&dimension).map(|code| (*code).clone()).collect(),
    }
}
