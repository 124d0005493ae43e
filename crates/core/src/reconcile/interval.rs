use chrono::{NaiveDate, NaiveDateTime};

use crate::errors::InvalidIntervalError;

/// Calendar days covered by a stay, from the admission date through the discharge date inclusive.
pub fn expand_interval(
    admitted_at: NaiveDateTime,
    discharged_at: NaiveDateTime,
) -> Result<Vec<NaiveDate>, InvalidIntervalError> {
    let admission_date = admitted_at.date();
    let discharge_date = discharged_at.date();
    if discharge_date < admission_date {
        return Err(InvalidIntervalError { admission_date, discharge_date });
    }

    Ok(admission_date.iter_days().take_while(|day| *day <= discharge_date).collect())
}
