use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::pricing::{StayPriceRecord, TestCode, TestPriceRecord};
use crate::errors::DomainError;

pub const STAY_PRICE_ITEM: &str = "stay";

/// Dated price list for a single item.
///
/// A price applies from its effective-from date until the next record takes over, so resolving a
/// date picks the record with the greatest effective-from date not after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceSchedule {
    item: String,
    prices: BTreeMap<NaiveDate, Decimal>,
}

impl PriceSchedule {
    pub fn new(item: impl Into<String>) -> Self {
        Self { item: item.into(), prices: BTreeMap::new() }
    }

    /// Adds a dated price. Two records for the same date are a data-integrity fault.
    pub fn insert(&mut self, effective_from: NaiveDate, price: Decimal) -> Result<(), DomainError> {
        if price < Decimal::ZERO {
            return Err(DomainError::NegativePrice {
                item: self.item.clone(),
                price,
                effective_from,
            });
        }
        if self.prices.contains_key(&effective_from) {
            return Err(DomainError::DuplicateEffectiveDate {
                item: self.item.clone(),
                effective_from,
            });
        }

        self.prices.insert(effective_from, price);
        Ok(())
    }

    pub fn resolve(&self, date: NaiveDate) -> Option<Decimal> {
        self.resolve_record(date).map(|(_, price)| price)
    }

    /// Effective-from date and price in force on `date`, if any record had started by then.
    pub fn resolve_record(&self, date: NaiveDate) -> Option<(NaiveDate, Decimal)> {
        self.prices.range(..=date).next_back().map(|(from, price)| (*from, *price))
    }
}

pub fn stay_schedule(records: &[StayPriceRecord]) -> Result<PriceSchedule, DomainError> {
    let mut schedule = PriceSchedule::new(STAY_PRICE_ITEM);
    for record in records {
        schedule.insert(record.effective_from, record.price)?;
    }
    Ok(schedule)
}

/// Price schedules for every test code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestPriceBook {
    schedules: BTreeMap<TestCode, PriceSchedule>,
}

impl TestPriceBook {
    pub fn from_records(records: &[TestPriceRecord]) -> Result<Self, DomainError> {
        let mut schedules: BTreeMap<TestCode, PriceSchedule> = BTreeMap::new();
        for record in records {
            schedules
                .entry(record.test_code.clone())
                .or_insert_with(|| PriceSchedule::new(record.test_code.0.clone()))
                .insert(record.effective_from, record.price)?;
        }
        Ok(Self { schedules })
    }

    pub fn resolve(&self, test_code: &TestCode, date: NaiveDate) -> Option<Decimal> {
        self.schedules.get(test_code).and_then(|schedule| schedule.resolve(date))
    }
}
