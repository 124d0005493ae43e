use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::admission::Admission;
use crate::domain::calendar::DimDate;
use crate::errors::DomainError;

/// Inclusive date window the `dim_date` dimension is generated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CalendarRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl CalendarRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DomainError> {
        if start > end {
            return Err(DomainError::InvalidCalendarRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |day| *day <= self.end)
    }
}

pub fn build_dim_date(range: &CalendarRange) -> Vec<DimDate> {
    range.days().map(DimDate::from).collect()
}

/// Admissions whose stay is not fully inside the calendar window.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CalendarCoverage {
    pub uncovered_admissions: usize,
    pub earliest_uncovered: Option<NaiveDate>,
    pub latest_uncovered: Option<NaiveDate>,
}

impl CalendarCoverage {
    pub fn is_complete(&self) -> bool {
        self.uncovered_admissions == 0
    }
}

pub fn check_coverage(range: &CalendarRange, admissions: &[Admission]) -> CalendarCoverage {
    let mut coverage = CalendarCoverage::default();

    for admission in admissions {
        let outside: Vec<NaiveDate> = [admission.admission_date(), admission.discharge_date()]
            .into_iter()
            .filter(|day| !range.contains(*day))
            .collect();
        if outside.is_empty() {
            continue;
        }

        coverage.uncovered_admissions += 1;
        for day in outside {
            coverage.earliest_uncovered =
                Some(coverage.earliest_uncovered.map_or(day, |current| current.min(day)));
            coverage.latest_uncovered =
                Some(coverage.latest_uncovered.map_or(day, |current| current.max(day)));
        }
    }

    coverage
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{build_dim_date, check_coverage, CalendarRange};
    use crate::domain::admission::Admission;
    use crate::domain::patient::PatientCode;
    use crate::errors::DomainError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn admission(from: NaiveDate, to: NaiveDate) -> Admission {
        Admission {
            patient_code: PatientCode::from("P1"),
            admitted_at: from.and_hms_opt(8, 0, 0).expect("valid time"),
            discharged_at: to.and_hms_opt(10, 0, 0).expect("valid time"),
        }
    }

    #[test]
    fn default_window_has_one_row_per_day() {
        let range = CalendarRange::new(date(2020, 1, 1), date(2024, 12, 31)).expect("valid range");
        let rows = build_dim_date(&range);

        assert_eq!(rows.len(), 1827, "five years including two leap days");
        assert_eq!(rows.first().map(|row| row.date), Some(date(2020, 1, 1)));
        assert_eq!(rows.last().map(|row| row.date), Some(date(2024, 12, 31)));
    }

    #[test]
    fn single_day_range_is_valid() {
        let range = CalendarRange::new(date(2024, 2, 29), date(2024, 2, 29)).expect("valid range");
        assert_eq!(build_dim_date(&range).len(), 1);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let error = CalendarRange::new(date(2024, 1, 2), date(2024, 1, 1)).expect_err("inverted");
        assert!(matches!(error, DomainError::InvalidCalendarRange { .. }));
    }

    #[test]
    fn coverage_reports_stays_outside_the_window() {
        let range = CalendarRange::new(date(2020, 1, 1), date(2024, 12, 31)).expect("valid range");
        let coverage = check_coverage(
            &range,
            &[
                admission(date(2022, 5, 1), date(2022, 5, 3)),
                admission(date(2024, 12, 30), date(2025, 1, 2)),
                admission(date(2019, 12, 31), date(2020, 1, 1)),
            ],
        );

        assert!(!coverage.is_complete());
        assert_eq!(coverage.uncovered_admissions, 2);
        assert_eq!(coverage.earliest_uncovered, Some(date(2019, 12, 31)));
        assert_eq!(coverage.latest_uncovered, Some(date(2025, 1, 2)));
    }

    #[test]
    fn coverage_is_complete_inside_the_window() {
        let range = CalendarRange::new(date(2024, 1, 1), date(2024, 1, 31)).expect("valid range");
        let coverage = check_coverage(&range, &[admission(date(2024, 1, 1), date(2024, 1, 31))]);

        assert!(coverage.is_complete());
        assert_eq!(coverage.earliest_uncovered, None);
    }
}
