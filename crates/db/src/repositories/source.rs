use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};
use wardhouse_core::domain::admission::{Admission, TestEvent};
use wardhouse_core::domain::patient::{Patient, PatientCode};
use wardhouse_core::domain::pricing::{StayPriceRecord, TestCode, TestPriceRecord};
use wardhouse_core::domain::SourceSnapshot;
use wardhouse_core::errors::StorageError;
use wardhouse_core::pipeline::SourceReader;

use super::{parse_date, parse_decimal, parse_timestamp, RepositoryError};
use crate::DbPool;

/// Reads the operational hospital tables in a stable order so that two runs over the same
/// database see the same snapshot.
pub struct SqlSourceReader {
    pool: DbPool,
}

impl SqlSourceReader {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn patients(&self) -> Result<Vec<Patient>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT patient_code, patient_name, phone_number
            FROM patient
            ORDER BY patient_code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<Patient, RepositoryError> {
                Ok(Patient {
                    code: PatientCode(row.try_get("patient_code")?),
                    name: row.try_get("patient_name")?,
                    phone: row.try_get("phone_number")?,
                })
            })
            .collect()
    }

    pub async fn admissions(&self) -> Result<Vec<Admission>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT patient_code, admission_datetime, discharge_datetime
            FROM admission
            ORDER BY patient_code, admission_datetime
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(admission_from_row).collect()
    }

    pub async fn stay_prices(&self) -> Result<Vec<StayPriceRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT CAST(price AS TEXT) AS price_text, price_date_from
            FROM stay_daily_cost
            ORDER BY price_date_from
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<StayPriceRecord, RepositoryError> {
                let price: String = row.try_get("price_text")?;
                let effective_from: String = row.try_get("price_date_from")?;
                Ok(StayPriceRecord {
                    price: parse_decimal("stay_daily_cost.price", &price)?,
                    effective_from: parse_date("stay_daily_cost.price_date_from", &effective_from)?,
                })
            })
            .collect()
    }

    pub async fn test_prices(&self) -> Result<Vec<TestPriceRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT test_code, CAST(price AS TEXT) AS price_text, price_date_from
            FROM test_cost
            ORDER BY test_code, price_date_from
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<TestPriceRecord, RepositoryError> {
                let price: String = row.try_get("price_text")?;
                let effective_from: String = row.try_get("price_date_from")?;
                Ok(TestPriceRecord {
                    test_code: TestCode(row.try_get("test_code")?),
                    price: parse_decimal("test_cost.price", &price)?,
                    effective_from: parse_date("test_cost.price_date_from", &effective_from)?,
                })
            })
            .collect()
    }

    pub async fn test_events(&self) -> Result<Vec<TestEvent>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT patient_code, admission_datetime, test_code, test_datetime
            FROM test_admission
            ORDER BY patient_code, admission_datetime, test_datetime, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(test_event_from_row).collect()
    }

    async fn load_snapshot(&self) -> Result<SourceSnapshot, RepositoryError> {
        Ok(SourceSnapshot {
            admissions: self.admissions().await?,
            stay_prices: self.stay_prices().await?,
            test_prices: self.test_prices().await?,
            test_events: self.test_events().await?,
            patients: self.patients().await?,
        })
    }
}

#[async_trait]
impl SourceReader for SqlSourceReader {
    async fn read_snapshot(&self) -> Result<SourceSnapshot, StorageError> {
        self.load_snapshot().await.map_err(RepositoryError::into_read_error)
    }
}

fn admission_from_row(row: &SqliteRow) -> Result<Admission, RepositoryError> {
    let admitted_at: String = row.try_get("admission_datetime")?;
    let discharged_at: String = row.try_get("discharge_datetime")?;

    Ok(Admission {
        patient_code: PatientCode(row.try_get("patient_code")?),
        admitted_at: parse_timestamp("admission.admission_datetime", &admitted_at)?,
        discharged_at: parse_timestamp("admission.discharge_datetime", &discharged_at)?,
    })
}

fn test_event_from_row(row: &SqliteRow) -> Result<TestEvent, RepositoryError> {
    let admitted_at: String = row.try_get("admission_datetime")?;
    let tested_at: String = row.try_get("test_datetime")?;

    Ok(TestEvent {
        patient_code: PatientCode(row.try_get("patient_code")?),
        admitted_at: parse_timestamp("test_admission.admission_datetime", &admitted_at)?,
        test_code: TestCode(row.try_get("test_code")?),
        tested_at: parse_timestamp("test_admission.test_datetime", &tested_at)?,
    })
}
