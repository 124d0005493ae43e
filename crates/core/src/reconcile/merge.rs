use std::collections::BTreeSet;

use rust_decimal::Decimal;

use crate::domain::fact::FactHospitalStay;
use crate::reconcile::CostTotals;

/// Full outer join of stay and test totals on the admission key.
///
/// Every key present on either side yields exactly one fact; the absent side is zero. Output is
/// ordered by (patient code, admission timestamp).
pub fn merge_facts(stay: &CostTotals, tests: &CostTotals) -> Vec<FactHospitalStay> {
    let keys: BTreeSet<_> = stay.keys().chain(tests.keys()).collect();

    keys.into_iter()
        .map(|key| FactHospitalStay {
            patient_code: key.patient_code.clone(),
            admitted_at: key.admitted_at,
            total_stay_cost: stay.get(key).copied().unwrap_or(Decimal::ZERO),
            total_test_cost: tests.get(key).copied().unwrap_or(Decimal::ZERO),
        })
        .collect()
}
