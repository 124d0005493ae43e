use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatientCode(pub String);

impl fmt::Display for PatientCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatientCode {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A row of the `patient` source table and of the `dim_patients` dimension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub code: PatientCode,
    pub name: String,
    pub phone: Option<String>,
}

/// Orders patients by code and rejects duplicate codes, which would break the dimension key.
pub fn dimension_rows(patients: &[Patient]) -> Result<Vec<Patient>, DomainError> {
    let mut by_code = BTreeMap::new();
    for patient in patients {
        if by_code.insert(patient.code.clone(), patient.clone()).is_some() {
            return Err(DomainError::DuplicatePatientCode(patient.code.clone()));
        }
    }
    Ok(by_code.into_values().collect())
}
