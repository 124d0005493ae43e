use thiserror::Error;
use tracing::{error, info};
use wardhouse_core::config::{ConfigError, PipelineConfig};
use wardhouse_core::pipeline::{EtlPipeline, PipelineError, RunSummary};

use crate::connection::connect_database;
use crate::migrations;
use crate::repositories::{SqlSourceReader, SqlWarehouseSink};

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("invalid pipeline configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to connect to source database: {0}")]
    SourceConnect(#[source] sqlx::Error),
    #[error("failed to connect to warehouse database: {0}")]
    SinkConnect(#[source] sqlx::Error),
    #[error("failed to migrate warehouse schema: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl EtlError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_validation",
            Self::SourceConnect(_) | Self::SinkConnect(_) => "db_connectivity",
            Self::Migration(_) => "migration",
            Self::Pipeline(error) => error.error_class(),
        }
    }
}

/// Connects both databases, brings the warehouse schema up to date and runs one full rebuild.
///
/// The source schema is owned by the operational system and is never migrated here.
pub async fn run_etl(config: &PipelineConfig) -> Result<RunSummary, EtlError> {
    let options = config.run_options()?;

    let source = connect_database(&config.source).await.map_err(EtlError::SourceConnect)?;
    let sink = connect_database(&config.sink).await.map_err(EtlError::SinkConnect)?;
    info!(
        event_name = "etl.bootstrap.connected",
        source_max_connections = config.source.max_connections,
        sink_max_connections = config.sink.max_connections,
        "source and warehouse pools ready"
    );

    migrations::run_warehouse(&sink).await?;
    info!(event_name = "etl.bootstrap.migrated", "warehouse schema up to date");

    let pipeline = EtlPipeline::new(
        SqlSourceReader::new(source.clone()),
        SqlWarehouseSink::new(sink.clone()),
        options,
    );
    let result = pipeline.run().await;

    source.close().await;
    sink.close().await;

    match result {
        Ok(summary) => Ok(summary),
        Err(pipeline_error) => {
            error!(
                event_name = "etl.run.failed",
                error_class = pipeline_error.error_class(),
                error = %pipeline_error,
                "warehouse rebuild failed"
            );
            Err(pipeline_error.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use tempfile::TempDir;
    use wardhouse_core::config::{DatabaseConfig, PipelineConfig};
    use wardhouse_core::InvalidIntervalPolicy;

    use super::{run_etl, EtlError};
    use crate::repositories::SqlWarehouseSink;
    use crate::{connect_with_settings, migrations, DemoHospitalDataset};

    fn database(url: &str) -> DatabaseConfig {
        DatabaseConfig { url: SecretString::from(url.to_string()), max_connections: 1, timeout_secs: 5 }
    }

    fn pipeline_config(dir: &TempDir, strict_referential: bool) -> PipelineConfig {
        let source = format!("sqlite://{}", dir.path().join("hospital.db").display());
        let sink = format!("sqlite://{}", dir.path().join("warehouse.db").display());
        PipelineConfig {
            source: database(&source),
            sink: database(&sink),
            calendar_range_start: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            calendar_range_end: NaiveDate::from_ymd_opt(2024, 12, 31).expect("valid date"),
            invalid_interval_policy: InvalidIntervalPolicy::Skip,
            strict_referential,
        }
    }

    async fn seed_source(config: &PipelineConfig) {
        let pool = connect_with_settings(config.source_dsn(), 1, 5).await.expect("connect source");
        migrations::run_source(&pool).await.expect("migrate source");
        DemoHospitalDataset::load(&pool).await.expect("seed source");
        pool.close().await;
    }

    #[tokio::test]
    async fn rebuilds_warehouse_from_seeded_source() {
        let dir = TempDir::new().expect("temp dir");
        let config = pipeline_config(&dir, false);
        seed_source(&config).await;

        let summary = run_etl(&config).await.expect("run etl");

        assert_eq!(summary.dim_patients, 3);
        assert_eq!(summary.dim_dates, 366);
        assert_eq!(summary.facts, 2);

        let pool = connect_with_settings(config.sink_dsn(), 1, 5).await.expect("connect sink");
        let facts = SqlWarehouseSink::new(pool).facts().await.expect("read facts");
        assert_eq!(facts[0].total_stay_cost, Decimal::from(300));
        assert_eq!(facts[1].total_test_cost, Decimal::from(125));
    }

    #[tokio::test]
    async fn warehouse_database_gets_only_the_star_schema() {
        let dir = TempDir::new().expect("temp dir");
        let config = pipeline_config(&dir, false);
        seed_source(&config).await;

        run_etl(&config).await.expect("run etl");

        let pool = connect_with_settings(config.sink_dsn(), 1, 5).await.expect("connect sink");
        let missing = migrations::missing_tables(&pool, migrations::SOURCE_TABLES)
            .await
            .expect("inspect sink schema");
        assert_eq!(missing, migrations::SOURCE_TABLES.to_vec());
        assert!(migrations::missing_tables(&pool, migrations::WAREHOUSE_TABLES)
            .await
            .expect("inspect sink schema")
            .is_empty());
    }

    #[tokio::test]
    async fn strict_mode_reports_referential_mismatch() {
        let dir = TempDir::new().expect("temp dir");
        let config = pipeline_config(&dir, true);
        seed_source(&config).await;

        let error = run_etl(&config).await.expect_err("P3 has no fact row");

        assert_eq!(error.error_class(), "referential_mismatch");
    }

    #[tokio::test]
    async fn unmigrated_source_is_an_extract_failure() {
        let dir = TempDir::new().expect("temp dir");
        let config = pipeline_config(&dir, false);

        let error = run_etl(&config).await.expect_err("source tables missing");

        assert!(matches!(error, EtlError::Pipeline(_)));
        assert_eq!(error.error_class(), "extract");
    }
}
