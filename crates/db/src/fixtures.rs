use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_PATIENT_CODES: &[&str] = &["P1", "P2", "P3"];

/// Expected row counts per source table once the demo dataset is loaded.
const SEED_TABLE_COUNTS: &[SeedTableContract] = &[
    SeedTableContract {
        table: "patient",
        label: "patients",
        filter: "patient_code IN ('P1', 'P2', 'P3')",
        expected: 3,
    },
    SeedTableContract {
        table: "admission",
        label: "admissions",
        filter: "patient_code IN ('P1', 'P2', 'P3')",
        expected: 1,
    },
    SeedTableContract {
        table: "stay_daily_cost",
        label: "stay-prices",
        filter: "price_date_from = '2024-01-01'",
        expected: 1,
    },
    SeedTableContract { table: "test_cost", label: "test-prices", filter: "test_code = 'T1'", expected: 2 },
    SeedTableContract {
        table: "test_admission",
        label: "test-events",
        filter: "patient_code IN ('P1', 'P2', 'P3')",
        expected: 2,
    },
];

/// Small operational dataset that exercises every reconciliation path:
///
/// 1. P1 has a three-day stay priced from the stay schedule and no tests.
/// 2. P2 has two tests that straddle a test price change but no matching admission row.
/// 3. P3 is registered but never admitted, so it only appears in `dim_patients`.
pub struct DemoHospitalDataset;

impl DemoHospitalDataset {
    pub const SQL: &'static str = include_str!("../../../fixtures/demo_hospital.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            patient_codes: SEED_PATIENT_CODES.to_vec(),
            tables_seeded: SEED_TABLE_COUNTS.iter().map(|contract| contract.table).collect(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(SEED_TABLE_COUNTS.len() + 1);

        for contract in SEED_TABLE_COUNTS {
            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(1) FROM {} WHERE {}",
                contract.table, contract.filter
            ))
            .fetch_one(pool)
            .await?;
            checks.push((contract.label, count == contract.expected));
        }

        let price_change: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM test_cost WHERE test_code = 'T1' AND price_date_from = '2024-02-02')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("test-price-change", price_change == 1));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        for contract in SEED_TABLE_COUNTS.iter().rev() {
            sqlx::query(&format!("DELETE FROM {} WHERE {}", contract.table, contract.filter))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedTableContract {
    table: &'static str,
    label: &'static str,
    filter: &'static str,
    expected: i64,
}

#[derive(Debug)]
pub struct SeedResult {
    pub patient_codes: Vec<&'static str>,
    pub tables_seeded: Vec<&'static str>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use wardhouse_core::domain::patient::PatientCode;
    use wardhouse_core::pipeline::SourceReader;
    use wardhouse_core::{reconcile, InvalidIntervalPolicy};

    use super::DemoHospitalDataset;
    use crate::repositories::SqlSourceReader;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn migrated_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_source(&pool).await.expect("run migrations");
        pool
    }

    #[tokio::test]
    async fn seed_is_verifiable_and_idempotent() {
        let pool = migrated_pool().await;

        let first = DemoHospitalDataset::load(&pool).await.expect("load seed");
        let first_verification = DemoHospitalDataset::verify(&pool).await.expect("verify seed");
        assert!(first_verification.all_present, "{:?}", first_verification.checks);
        assert_eq!(first.patient_codes, vec!["P1", "P2", "P3"]);

        DemoHospitalDataset::load(&pool).await.expect("reload seed");
        let second_verification = DemoHospitalDataset::verify(&pool).await.expect("re-verify seed");
        assert!(second_verification.all_present, "{:?}", second_verification.checks);
        assert_eq!(first_verification.checks, second_verification.checks);
    }

    #[tokio::test]
    async fn clean_removes_seeded_rows() {
        let pool = migrated_pool().await;
        DemoHospitalDataset::load(&pool).await.expect("load seed");

        DemoHospitalDataset::clean(&pool).await.expect("clean seed");

        let verification = DemoHospitalDataset::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
        let (patients,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM patient").fetch_one(&pool).await.expect("count");
        assert_eq!(patients, 0);
    }

    #[tokio::test]
    async fn seeded_source_reconciles_to_known_totals() {
        let pool = migrated_pool().await;
        DemoHospitalDataset::load(&pool).await.expect("load seed");

        let snapshot = SqlSourceReader::new(pool).read_snapshot().await.expect("read snapshot");
        let outcome = reconcile(&snapshot, InvalidIntervalPolicy::Skip).expect("reconcile");

        let totals: Vec<_> = outcome
            .facts
            .iter()
            .map(|fact| (fact.patient_code.0.as_str(), fact.total_stay_cost, fact.total_test_cost))
            .collect();
        assert_eq!(
            totals,
            vec![("P1", Decimal::from(300), Decimal::ZERO), ("P2", Decimal::ZERO, Decimal::from(125))]
        );
        assert!(outcome.referential.missing_from_facts.contains(&PatientCode::from("P3")));
    }
}
