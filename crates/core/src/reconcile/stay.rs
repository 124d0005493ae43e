use rust_decimal::Decimal;

use crate::domain::admission::{Admission, AdmissionKey};
use crate::errors::{DomainError, InvalidIntervalError};
use crate::reconcile::interval::expand_interval;
use crate::reconcile::price::PriceSchedule;
use crate::reconcile::{CostTotals, InvalidIntervalPolicy};

/// Admission left out of the stay totals because its interval could not be expanded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedAdmission {
    pub key: AdmissionKey,
    pub reason: InvalidIntervalError,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StayCosts {
    pub totals: CostTotals,
    pub skipped: Vec<SkippedAdmission>,
    pub unpriced_days: usize,
}

/// Sums the stay price in force on every calendar day of each admission.
///
/// Days without an effective price contribute nothing; an admission with no priced day at all is
/// left out of `totals` and picked up later by the fact merger.
pub fn aggregate_stay_costs(
    admissions: &[Admission],
    schedule: &PriceSchedule,
    policy: InvalidIntervalPolicy,
) -> Result<StayCosts, DomainError> {
    let mut costs = StayCosts::default();

    for admission in admissions {
        let days = match expand_interval(admission.admitted_at, admission.discharged_at) {
            Ok(days) => days,
            Err(reason) => match policy {
                InvalidIntervalPolicy::Abort => {
                    return Err(DomainError::MalformedAdmission {
                        patient_code: admission.patient_code.clone(),
                        admitted_at: admission.admitted_at,
                        source: reason,
                    });
                }
                InvalidIntervalPolicy::Skip => {
                    costs.skipped.push(SkippedAdmission { key: admission.key(), reason });
                    continue;
                }
            },
        };

        let mut total = Decimal::ZERO;
        let mut priced_days = 0usize;
        for day in days {
            match schedule.resolve(day) {
                Some(price) => {
                    total = total
                        .checked_add(price)
                        .ok_or_else(|| DomainError::cost_overflow("stay", admission.key()))?;
                    priced_days += 1;
                }
                None => costs.unpriced_days += 1,
            }
        }

        if priced_days > 0 {
            let entry = costs.totals.entry(admission.key()).or_insert(Decimal::ZERO);
            *entry = entry
                .checked_add(total)
                .ok_or_else(|| DomainError::cost_overflow("stay", admission.key()))?;
        }
    }

    Ok(costs)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal::Decimal;

    use super::aggregate_stay_costs;
    use crate::domain::admission::Admission;
    use crate::domain::patient::PatientCode;
    use crate::errors::DomainError;
    use crate::reconcile::price::PriceSchedule;
    use crate::reconcile::InvalidIntervalPolicy;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, 0, 0).expect("valid time")
    }

    fn admission(code: &str, admitted_at: NaiveDateTime, discharged_at: NaiveDateTime) -> Admission {
        Admission { patient_code: PatientCode::from(code), admitted_at, discharged_at }
    }

    fn schedule(entries: &[(NaiveDate, i64)]) -> PriceSchedule {
        let mut schedule = PriceSchedule::new("stay");
        for (from, price) in entries {
            schedule.insert(*from, Decimal::from(*price)).expect("valid record");
        }
        schedule
    }

    #[test]
    fn three_day_stay_at_flat_rate() {
        let stay = admission("P1", at(2024, 1, 1, 8), at(2024, 1, 3, 10));
        let costs =
            aggregate_stay_costs(&[stay.clone()], &schedule(&[(date(2024, 1, 1), 100)]), InvalidIntervalPolicy::Skip)
                .expect("aggregation succeeds");

        assert_eq!(costs.totals.get(&stay.key()), Some(&Decimal::from(300)));
        assert!(costs.skipped.is_empty());
    }

    #[test]
    fn price_change_mid_stay_applies_per_day() {
        let stay = admission("P1", at(2024, 2, 28, 8), at(2024, 3, 2, 10));
        let prices = schedule(&[(date(2024, 1, 1), 100), (date(2024, 3, 1), 150)]);

        let costs =
            aggregate_stay_costs(&[stay.clone()], &prices, InvalidIntervalPolicy::Skip).expect("aggregation");

        // 02-28 and 02-29 at 100, 03-01 and 03-02 at 150
        assert_eq!(costs.totals.get(&stay.key()), Some(&Decimal::from(500)));
    }

    #[test]
    fn days_before_first_price_contribute_nothing() {
        let stay = admission("P1", at(2023, 12, 30, 8), at(2024, 1, 2, 10));
        let costs = aggregate_stay_costs(
            &[stay.clone()],
            &schedule(&[(date(2024, 1, 1), 100)]),
            InvalidIntervalPolicy::Skip,
        )
        .expect("aggregation");

        assert_eq!(costs.totals.get(&stay.key()), Some(&Decimal::from(200)));
        assert_eq!(costs.unpriced_days, 2);
    }

    #[test]
    fn admission_without_priced_days_is_absent() {
        let stay = admission("P4", at(2019, 6, 1, 8), at(2019, 6, 2, 10));
        let costs = aggregate_stay_costs(&[stay], &schedule(&[(date(2024, 1, 1), 100)]), InvalidIntervalPolicy::Skip)
            .expect("aggregation");

        assert!(costs.totals.is_empty());
    }

    #[test]
    fn skip_policy_records_malformed_admission() {
        let broken = admission("P5", at(2024, 3, 5, 8), at(2024, 3, 1, 10));
        let fine = admission("P6", at(2024, 3, 5, 8), at(2024, 3, 5, 10));
        let costs = aggregate_stay_costs(
            &[broken.clone(), fine.clone()],
            &schedule(&[(date(2024, 1, 1), 100)]),
            InvalidIntervalPolicy::Skip,
        )
        .expect("skip policy does not fail");

        assert_eq!(costs.skipped.len(), 1);
        assert_eq!(costs.skipped[0].key, broken.key());
        assert_eq!(costs.totals.get(&fine.key()), Some(&Decimal::from(100)));
        assert!(!costs.totals.contains_key(&broken.key()));
    }

    #[test]
    fn abort_policy_fails_on_malformed_admission() {
        let broken = admission("P5", at(2024, 3, 5, 8), at(2024, 3, 1, 10));
        let error = aggregate_stay_costs(
            &[broken],
            &schedule(&[(date(2024, 1, 1), 100)]),
            InvalidIntervalPolicy::Abort,
        )
        .expect_err("abort policy fails");

        assert!(matches!(
            error,
            DomainError::MalformedAdmission { ref patient_code, .. } if patient_code.0 == "P5"
        ));
    }
}
