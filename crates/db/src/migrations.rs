use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub const SOURCE_TABLES: &[&str] =
    &["patient", "admission", "stay_daily_cost", "test_cost", "test_admission"];

pub const WAREHOUSE_TABLES: &[&str] = &["dim_patients", "dim_date", "fact_hospital_stays"];

/// Operational tables read by the pipeline. Only `migrate` and `seed` apply these.
pub fn source_migrator() -> Migrator {
    shared_file_migrator(sqlx::migrate!("../../migrations/source"))
}

/// Star schema written by every run.
pub fn warehouse_migrator() -> Migrator {
    shared_file_migrator(sqlx::migrate!("../../migrations/warehouse"))
}

// Source and warehouse may live in one SQLite file, so each migrator tolerates the other's
// versions in `_sqlx_migrations`.
fn shared_file_migrator(mut migrator: Migrator) -> Migrator {
    migrator.set_ignore_missing(true);
    migrator
}

pub async fn run_source(pool: &DbPool) -> Result<(), MigrateError> {
    source_migrator().run(pool).await
}

pub async fn run_warehouse(pool: &DbPool) -> Result<(), MigrateError> {
    warehouse_migrator().run(pool).await
}

/// Names from `tables` that do not exist yet, in the order given.
pub async fn missing_tables(
    pool: &DbPool,
    tables: &[&'static str],
) -> Result<Vec<&'static str>, sqlx::Error> {
    let mut missing = Vec::new();
    for table in tables {
        let present: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        )
        .bind(*table)
        .fetch_one(pool)
        .await?;
        if present == 0 {
            missing.push(*table);
        }
    }
    Ok(missing)
}
