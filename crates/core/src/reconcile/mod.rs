pub mod interval;
pub mod merge;
pub mod price;
pub mod stay;
pub mod test_cost;
pub mod validate;

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::admission::AdmissionKey;
use crate::domain::fact::FactHospitalStay;
use crate::domain::SourceSnapshot;
use crate::errors::DomainError;

pub use interval::expand_interval;
pub use merge::merge_facts;
pub use price::{stay_schedule, PriceSchedule, TestPriceBook};
pub use stay::{aggregate_stay_costs, SkippedAdmission, StayCosts};
pub use test_cost::{aggregate_test_costs, TestCosts};
pub use validate::{validate_referential, ReferentialReport};

/// Per-admission cost totals, ordered by admission key.
pub type CostTotals = BTreeMap<AdmissionKey, Decimal>;

/// What to do with an admission whose discharge date precedes its admission date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidIntervalPolicy {
    /// Leave the admission out of the stay totals and report it.
    #[default]
    Skip,
    /// Fail the whole run.
    Abort,
}

impl std::str::FromStr for InvalidIntervalPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unsupported invalid interval policy `{other}` (expected skip|abort)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconciliationOutcome {
    pub facts: Vec<FactHospitalStay>,
    pub referential: ReferentialReport,
    pub skipped: Vec<SkippedAdmission>,
    pub stay_priced_admissions: usize,
    pub test_priced_admissions: usize,
    pub unpriced_stay_days: usize,
    pub unpriced_test_events: usize,
}

pub trait ReconciliationEngine: Send + Sync {
    fn reconcile(&self, snapshot: &SourceSnapshot) -> Result<ReconciliationOutcome, DomainError>;
}

#[derive(Default)]
pub struct DeterministicReconciliationEngine {
    policy: InvalidIntervalPolicy,
}

impl DeterministicReconciliationEngine {
    pub fn new(policy: InvalidIntervalPolicy) -> Self {
        Self { policy }
    }
}

impl ReconciliationEngine for DeterministicReconciliationEngine {
    fn reconcile(&self, snapshot: &SourceSnapshot) -> Result<ReconciliationOutcome, DomainError> {
        reconcile(snapshot, self.policy)
    }
}

/// Computes the fact rows for one snapshot and checks them against the patient dimension.
pub fn reconcile(
    snapshot: &SourceSnapshot,
    policy: InvalidIntervalPolicy,
) -> Result<ReconciliationOutcome, DomainError> {
    let schedule = stay_schedule(&snapshot.stay_prices)?;
    let book = TestPriceBook::from_records(&snapshot.test_prices)?;

    let stay = aggregate_stay_costs(&snapshot.admissions, &schedule, policy)?;
    let tests = aggregate_test_costs(&snapshot.test_events, &book)?;

    let facts = merge_facts(&stay.totals, &tests.totals);
    let referential = validate_referential(&snapshot.patients, &facts);

    Ok(ReconciliationOutcome {
        stay_priced_admissions: stay.totals.len(),
        test_priced_admissions: tests.totals.len(),
        unpriced_stay_days: stay.unpriced_days,
        unpriced_test_events: tests.unpriced_events,
        facts,
        referential,
        skipped: stay.skipped,
    })
}
