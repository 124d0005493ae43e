use async_trait::async_trait;
use sqlx::{Row, Sqlite, Transaction};
use tracing::debug;
use wardhouse_core::domain::calendar::DimDate;
use wardhouse_core::domain::fact::FactHospitalStay;
use wardhouse_core::domain::patient::{Patient, PatientCode};
use wardhouse_core::errors::StorageError;
use wardhouse_core::pipeline::{WarehouseLoad, WarehouseSink};

use super::{format_date, format_timestamp, parse_decimal, parse_timestamp, RepositoryError};
use crate::DbPool;

/// Rewrites `dim_patients`, `dim_date` and `fact_hospital_stays` inside a single transaction.
pub struct SqlWarehouseSink {
    pool: DbPool,
}

impl SqlWarehouseSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn facts(&self) -> Result<Vec<FactHospitalStay>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                patient_code,
                admission_datetime,
                CAST(total_stay_cost AS TEXT) AS total_stay_cost_text,
                CAST(total_test_cost AS TEXT) AS total_test_cost_text
            FROM fact_hospital_stays
            ORDER BY patient_code, admission_datetime
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<FactHospitalStay, RepositoryError> {
                let admitted_at: String = row.try_get("admission_datetime")?;
                let stay: String = row.try_get("total_stay_cost_text")?;
                let tests: String = row.try_get("total_test_cost_text")?;
                Ok(FactHospitalStay {
                    patient_code: PatientCode(row.try_get("patient_code")?),
                    admitted_at: parse_timestamp("fact_hospital_stays.admission_datetime", &admitted_at)?,
                    total_stay_cost: parse_decimal("fact_hospital_stays.total_stay_cost", &stay)?,
                    total_test_cost: parse_decimal("fact_hospital_stays.total_test_cost", &tests)?,
                })
            })
            .collect()
    }

    pub async fn dim_patients(&self) -> Result<Vec<Patient>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT patient_code, patient_name, phone_number FROM dim_patients ORDER BY patient_code",
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

    pub async fn dim_date_count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM dim_date").fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn write_load(&self, load: &WarehouseLoad) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM fact_hospital_stays").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM dim_patients").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM dim_date").execute(&mut *tx).await?;

        insert_patients(&mut tx, &load.dim_patients).await?;
        insert_dates(&mut tx, &load.dim_dates).await?;
        insert_facts(&mut tx, &load.facts).await?;

        tx.commit().await?;
        debug!(
            event_name = "warehouse.load.committed",
            dim_patients = load.dim_patients.len(),
            dim_dates = load.dim_dates.len(),
            facts = load.facts.len(),
            "warehouse tables replaced"
        );
        Ok(())
    }
}

#[async_trait]
impl WarehouseSink for SqlWarehouseSink {
    async fn replace_all(&self, load: &WarehouseLoad) -> Result<(), StorageError> {
        // Dropping an uncommitted transaction rolls it back, so a failed load keeps the previous tables.
        self.write_load(load).await.map_err(RepositoryError::into_write_error)
    }
}

async fn insert_patients(
    tx: &mut Transaction<'_, Sqlite>,
    patients: &[Patient],
) -> Result<(), RepositoryError> {
    for patient in patients {
        sqlx::query(
            "INSERT INTO dim_patients (patient_code, patient_name, phone_number) VALUES (?, ?, ?)",
        )
        .bind(&patient.code.0)
        .bind(&patient.name)
        .bind(patient.phone.as_deref())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert_dates(
    tx: &mut Transaction<'_, Sqlite>,
    dates: &[DimDate],
) -> Result<(), RepositoryError> {
    for row in dates {
        sqlx::query(
            r#"
            INSERT INTO dim_date (date, year, month, day, weekday, week)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(format_date(row.date))
        .bind(row.year)
        .bind(i64::from(row.month))
        .bind(i64::from(row.day))
        .bind(i64::from(row.weekday))
        .bind(i64::from(row.week))
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert_facts(
    tx: &mut Transaction<'_, Sqlite>,
    facts: &[FactHospitalStay],
) -> Result<(), RepositoryError> {
    for fact in facts {
        sqlx::query(
            r#"
            INSERT INTO fact_hospital_stays
                (patient_code, admission_datetime, total_stay_cost, total_test_cost)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&fact.patient_code.0)
        .bind(format_timestamp(fact.admitted_at))
        .bind(fact.total_stay_cost.to_string())
        .bind(fact.total_test_cost.to_string())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use wardhouse_core::domain::calendar::DimDate;
    use wardhouse_core::domain::fact::FactHospitalStay;
    use wardhouse_core::domain::patient::{Patient, PatientCode};
    use wardhouse_core::errors::StorageError;
    use wardhouse_core::pipeline::{WarehouseLoad, WarehouseSink};

    use super::SqlWarehouseSink;
    use crate::{connect_with_settings, migrations};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn patient(code: &str, name: &str) -> Patient {
        Patient { code: PatientCode::from(code), name: name.to_string(), phone: None }
    }

    fn load() -> WarehouseLoad {
        WarehouseLoad {
            dim_patients: vec![patient("P1", "Ana Souza"), patient("P2", "Bruno Lima")],
            dim_dates: (1..=3).map(|day| DimDate::from(date(2024, 1, day))).collect(),
            facts: vec![
                FactHospitalStay {
                    patient_code: PatientCode::from("P1"),
                    admitted_at: date(2024, 1, 1).and_hms_opt(8, 0, 0).expect("valid time"),
                    total_stay_cost: Decimal::from(300),
                    total_test_cost: Decimal::ZERO,
                },
                FactHospitalStay {
                    patient_code: PatientCode::from("P2"),
                    admitted_at: date(2024, 1, 2).and_hms_opt(9, 30, 0).expect("valid time"),
                    total_stay_cost: Decimal::ZERO,
                    total_test_cost: Decimal::new(12550, 2),
                },
            ],
        }
    }

    async fn sink() -> SqlWarehouseSink {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_warehouse(&pool).await.expect("migrate");
        SqlWarehouseSink::new(pool)
    }

    #[tokio::test]
    async fn replace_all_writes_every_table() {
        let sink = sink().await;
        let expected = load();

        sink.replace_all(&expected).await.expect("load");

        assert_eq!(sink.dim_patients().await.expect("patients"), expected.dim_patients);
        assert_eq!(sink.dim_date_count().await.expect("dates"), 3);
        assert_eq!(sink.facts().await.expect("facts"), expected.facts);
    }

    #[tokio::test]
    async fn reloading_replaces_rather_than_appends() {
        let sink = sink().await;
        sink.replace_all(&load()).await.expect("first load");

        let mut smaller = load();
        smaller.facts.truncate(1);
        smaller.dim_dates.truncate(1);
        sink.replace_all(&smaller).await.expect("second load");

        assert_eq!(sink.facts().await.expect("facts").len(), 1);
        assert_eq!(sink.dim_date_count().await.expect("dates"), 1);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_contents() {
        let sink = sink().await;
        sink.replace_all(&load()).await.expect("first load");

        let mut broken = load();
        broken.facts.clear();
        broken.dim_patients.push(patient("P1", "Duplicate"));
        let error = sink.replace_all(&broken).await.expect_err("primary key violation");

        assert!(matches!(error, StorageError::Write(_)));
        assert_eq!(sink.facts().await.expect("facts"), load().facts);
        assert_eq!(sink.dim_patients().await.expect("patients").len(), 2);
    }
}
