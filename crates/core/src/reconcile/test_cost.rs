use rust_decimal::Decimal;

use crate::domain::admission::TestEvent;
use crate::errors::DomainError;
use crate::reconcile::price::TestPriceBook;
use crate::reconcile::CostTotals;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestCosts {
    pub totals: CostTotals,
    pub unpriced_events: usize,
}

/// Prices each test event as of the day the test was taken and sums per admission.
pub fn aggregate_test_costs(
    events: &[TestEvent],
    book: &TestPriceBook,
) -> Result<TestCosts, DomainError> {
    let mut costs = TestCosts::default();

    for event in events {
        match book.resolve(&event.test_code, event.test_date()) {
            Some(price) => {
                let entry = costs.totals.entry(event.admission_key()).or_insert(Decimal::ZERO);
                *entry = entry
                    .checked_add(price)
                    .ok_or_else(|| DomainError::cost_overflow("test", event.admission_key()))?;
            }
            None => costs.unpriced_events += 1,
        }
    }

    Ok(costs)
}
