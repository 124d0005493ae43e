use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One row of the `dim_date` dimension.
///
/// `weekday` counts from Monday = 0 and `week` is the ISO-8601 week number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimDate {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub weekday: u32,
    pub week: u32,
}

impl From<NaiveDate> for DimDate {
    fn from(date: NaiveDate) -> Self {
        Self {
            date,
            year: date.year(),
            month: date.month(),
            day: date.day(),
            weekday: date.weekday().num_days_from_monday(),
            week: date.iso_week().week(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::DimDate;

    #[test]
    fn derives_calendar_attributes() {
        let row = DimDate::from(NaiveDate::from_ymd_opt(2024, 12, 30).expect("valid date"));

        assert_eq!((row.year, row.month, row.day), (2024, 12, 30));
        assert_eq!(row.weekday, 0, "2024-12-30 is a Monday");
        assert_eq!(row.week, 1, "ISO week rolls over into 2025-W01");
    }

    #[test]
    fn sunday_is_the_last_weekday() {
        let row = DimDate::from(NaiveDate::from_ymd_opt(2020, 1, 5).expect("valid date"));

        assert_eq!(row.weekday, 6);
        assert_eq!(row.week, 1);
    }
}
