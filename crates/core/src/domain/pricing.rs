use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TestCode(pub String);

impl fmt::Display for TestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestCode {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Daily stay price valid from `effective_from` until superseded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayPriceRecord {
    pub price: Decimal,
    pub effective_from: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPriceRecord {
    pub test_code: TestCode,
    pub price: Decimal,
    pub effective_from: NaiveDate,
}
