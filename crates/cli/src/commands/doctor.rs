use anyhow::{bail, Context};
use serde::Serialize;
use tokio::runtime::Runtime;
use wardhouse_core::config::{AppConfig, DatabaseConfig, LoadOptions};
use wardhouse_core::{check_coverage, CalendarRange};
use wardhouse_db::migrations::{missing_tables, SOURCE_TABLES};
use wardhouse_db::{connect_database, SqlSourceReader};

const DATABASE_CHECKS: &[&str] =
    &["source_connectivity", "source_schema", "calendar_coverage", "sink_connectivity"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn from_result(name: &'static str, result: anyhow::Result<String>) -> Self {
        match result {
            Ok(details) => Self { name, status: CheckStatus::Pass, details },
            Err(error) => Self { name, status: CheckStatus::Fail, details: format!("{error:#}") },
        }
    }

    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> String {
    let report = build_report(options);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => checks.extend(database_checks(&runtime, &config)),
                Err(error) => {
                    let reason = format!("the async runtime failed to start: {error}");
                    checks.extend(DATABASE_CHECKS.iter().map(|name| DoctorCheck::skipped(*name, &reason)));
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(
                DATABASE_CHECKS
                    .iter()
                    .map(|name| DoctorCheck::skipped(*name, "configuration did not load")),
            );
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn database_checks(runtime: &Runtime, config: &AppConfig) -> Vec<DoctorCheck> {
    let mut checks = vec![DoctorCheck::from_result(
        "source_connectivity",
        runtime.block_on(check_connectivity("source", &config.source)),
    )];

    if checks[0].status == CheckStatus::Pass {
        checks.push(DoctorCheck::from_result(
            "source_schema",
            runtime.block_on(check_source_schema(&config.source)),
        ));
    } else {
        checks.push(DoctorCheck::skipped("source_schema", "the source database is unreachable"));
    }

    if checks[1].status == CheckStatus::Pass {
        checks.push(DoctorCheck::from_result(
            "calendar_coverage",
            runtime.block_on(check_calendar_coverage(config)),
        ));
    } else {
        checks.push(DoctorCheck::skipped("calendar_coverage", "the source schema is not ready"));
    }

    checks.push(DoctorCheck::from_result(
        "sink_connectivity",
        runtime.block_on(check_connectivity("sink", &config.sink)),
    ));
    checks
}

async fn check_connectivity(section: &str, database: &DatabaseConfig) -> anyhow::Result<String> {
    let pool = connect_database(database)
        .await
        .with_context(|| format!("failed to connect to {section} database"))?;
    pool.close().await;
    Ok(format!("{section} database reachable"))
}

async fn check_source_schema(database: &DatabaseConfig) -> anyhow::Result<String> {
    let pool = connect_database(database).await.context("failed to connect to source database")?;
    let missing =
        missing_tables(&pool, SOURCE_TABLES).await.context("failed to inspect source schema")?;
    pool.close().await;

    if !missing.is_empty() {
        bail!("source tables missing: {} (run `wardhouse migrate`)", missing.join(", "));
    }
    Ok(format!("all {} source tables present", SOURCE_TABLES.len()))
}

async fn check_calendar_coverage(config: &AppConfig) -> anyhow::Result<String> {
    let range = CalendarRange::new(config.calendar.start, config.calendar.end)
        .context("calendar range is invalid")?;
    let pool = connect_database(&config.source).await.context("failed to connect to source database")?;
    let reader = SqlSourceReader::new(pool.clone());
    let admissions = reader.admissions().await.context("failed to read admissions")?;
    pool.close().await;

    let coverage = check_coverage(&range, &admissions);
    if !coverage.is_complete() {
        bail!(
            "{} admissions fall outside dim_date {}..={}",
            coverage.uncovered_admissions,
            range.start(),
            range.end()
        );
    }
    Ok(format!("{} admissions covered by dim_date {}..={}", admissions.len(), range.start(), range.end()))
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
