pub mod admission;
pub mod calendar;
pub mod fact;
pub mod patient;
pub mod pricing;

use serde::{Deserialize, Serialize};

use self::admission::{Admission, TestEvent};
use self::patient::Patient;
use self::pricing::{StayPriceRecord, TestPriceRecord};

/// Fully materialised extract of the operational tables for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub admissions: Vec<Admission>,
    pub stay_prices: Vec<StayPriceRecord>,
    pub test_prices: Vec<TestPriceRecord>,
    pub test_events: Vec<TestEvent>,
    pub patients: Vec<Patient>,
}
