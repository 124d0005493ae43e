use chrono::NaiveDate;
use rust_decimal::Decimal;
use secrecy::SecretString;
use tempfile::TempDir;
use wardhouse_core::config::{DatabaseConfig, PipelineConfig};
use wardhouse_core::InvalidIntervalPolicy;
use wardhouse_db::{
    connect_with_settings, migrations, run_etl, DbPool, DemoHospitalDataset, SqlWarehouseSink,
};

fn database(url: String) -> DatabaseConfig {
    DatabaseConfig { url: SecretString::from(url), max_connections: 1, timeout_secs: 5 }
}

fn config(dir: &TempDir, policy: InvalidIntervalPolicy) -> PipelineConfig {
    PipelineConfig {
        source: database(format!("sqlite://{}", dir.path().join("hospital.db").display())),
        sink: database(format!("sqlite://{}", dir.path().join("warehouse.db").display())),
        calendar_range_start: NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date"),
        calendar_range_end: NaiveDate::from_ymd_opt(2024, 12, 31).expect("valid date"),
        invalid_interval_policy: policy,
        strict_referential: false,
    }
}

async fn seeded_source(config: &PipelineConfig) -> DbPool {
    let pool = connect_with_settings(config.source_dsn(), 1, 5).await.expect("connect source");
    migrations::run_source(&pool).await.expect("migrate source");
    DemoHospitalDataset::load(&pool).await.expect("seed source");
    pool
}

async fn execute(pool: &DbPool, sql: &str) {
    sqlx::query(sql).execute(pool).await.expect("statement");
}

#[tokio::test]
async fn repeated_runs_leave_identical_warehouse() {
    let dir = TempDir::new().expect("temp dir");
    let config = config(&dir, InvalidIntervalPolicy::Skip);
    seeded_source(&config).await.close().await;

    let first = run_etl(&config).await.expect("first run");
    let sink = SqlWarehouseSink::new(
        connect_with_settings(config.sink_dsn(), 1, 5).await.expect("connect sink"),
    );
    let facts_after_first = sink.facts().await.expect("facts");
    let patients_after_first = sink.dim_patients().await.expect("patients");

    let second = run_etl(&config).await.expect("second run");

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(sink.facts().await.expect("facts"), facts_after_first);
    assert_eq!(sink.dim_patients().await.expect("patients"), patients_after_first);
    assert_eq!(sink.dim_date_count().await.expect("dates"), 1827);
    assert_eq!(first.referential, second.referential);
}

#[tokio::test]
async fn inverted_admission_is_skipped_or_fatal_by_policy() {
    let dir = TempDir::new().expect("temp dir");
    let skip = config(&dir, InvalidIntervalPolicy::Skip);
    let source = seeded_source(&skip).await;
    execute(
        &source,
        "INSERT INTO patient (patient_code, patient_name) VALUES ('P9', 'Inverted Stay')",
    )
    .await;
    execute(
        &source,
        "INSERT INTO admission (patient_code, admission_datetime, discharge_datetime)
         VALUES ('P9', '2024-03-05 08:00:00', '2024-03-01 08:00:00')",
    )
    .await;
    source.close().await;

    let summary = run_etl(&skip).await.expect("skip policy keeps going");
    assert_eq!(summary.skipped_admissions, 1);
    assert_eq!(summary.facts, 2);

    let abort = PipelineConfig { invalid_interval_policy: InvalidIntervalPolicy::Abort, ..skip };
    let error = run_etl(&abort).await.expect_err("abort policy fails the run");
    assert_eq!(error.error_class(), "malformed_interval");
}

#[tokio::test]
async fn tests_on_admission_days_add_to_stay_fact() {
    let dir = TempDir::new().expect("temp dir");
    let config = config(&dir, InvalidIntervalPolicy::Skip);
    let source = seeded_source(&config).await;
    execute(
        &source,
        "INSERT INTO test_admission (patient_code, admission_datetime, test_code, test_datetime)
         VALUES ('P1', '2024-01-01 08:00:00', 'T1', '2024-01-02 09:00:00')",
    )
    .await;
    source.close().await;

    run_etl(&config).await.expect("run");

    let sink = SqlWarehouseSink::new(
        connect_with_settings(config.sink_dsn(), 1, 5).await.expect("connect sink"),
    );
    let facts = sink.facts().await.expect("facts");
    let p1 = facts.iter().find(|fact| fact.patient_code.0 == "P1").expect("P1 fact");
    assert_eq!(p1.total_stay_cost, Decimal::from(300));
    assert_eq!(p1.total_test_cost, Decimal::from(50));
    assert_eq!(p1.total_cost(), Some(Decimal::from(350)));
}
