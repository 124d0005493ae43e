use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calendar::{build_dim_date, check_coverage, CalendarCoverage, CalendarRange};
use crate::domain::calendar::DimDate;
use crate::domain::fact::FactHospitalStay;
use crate::domain::patient::{dimension_rows, Patient};
use crate::domain::SourceSnapshot;
use crate::errors::{DomainError, StorageError};
use crate::reconcile::{
    DeterministicReconciliationEngine, InvalidIntervalPolicy, ReconciliationEngine, ReferentialReport,
};

/// Read side of a run: yields the whole operational extract at once.
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn read_snapshot(&self) -> Result<SourceSnapshot, StorageError>;
}

/// Write side of a run: replaces the three warehouse tables with `load`.
///
/// Implementations either apply the whole load or leave the previous contents untouched.
#[async_trait]
pub trait WarehouseSink: Send + Sync {
    async fn replace_all(&self, load: &WarehouseLoad) -> Result<(), StorageError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WarehouseLoad {
    pub dim_patients: Vec<Patient>,
    pub dim_dates: Vec<DimDate>,
    pub facts: Vec<FactHospitalStay>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    pub calendar: CalendarRange,
    pub invalid_interval_policy: InvalidIntervalPolicy,
    pub strict_referential: bool,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extract failed: {0}")]
    Extract(#[source] StorageError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("referential check failed: {report}")]
    ReferentialMismatch { report: String },
    #[error("load failed: {0}")]
    Load(#[source] StorageError),
}

impl PipelineError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Extract(_) => "extract",
            Self::Domain(error) => error.error_class(),
            Self::ReferentialMismatch { .. } => "referential_mismatch",
            Self::Load(_) => "load",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub dim_patients: usize,
    pub dim_dates: usize,
    pub facts: usize,
    pub skipped_admissions: usize,
    pub unpriced_stay_days: usize,
    pub unpriced_test_events: usize,
    pub coverage: CalendarCoverage,
    pub referential: ReferentialReport,
}

/// Extract, reconcile, validate and load, in that order, as one pass.
pub struct EtlPipeline<R, S, E = DeterministicReconciliationEngine> {
    reader: R,
    sink: S,
    engine: E,
    options: RunOptions,
}

impl<R, S> EtlPipeline<R, S>
where
    R: SourceReader,
    S: WarehouseSink,
{
    /// Pipeline reconciling with the deterministic engine under the configured interval policy.
    pub fn new(reader: R, sink: S, options: RunOptions) -> Self {
        let engine = DeterministicReconciliationEngine::new(options.invalid_interval_policy);
        Self::with_engine(reader, sink, engine, options)
    }
}

impl<R, S, E> EtlPipeline<R, S, E>
where
    R: SourceReader,
    S: WarehouseSink,
    E: ReconciliationEngine,
{
    pub fn with_engine(reader: R, sink: S, engine: E, options: RunOptions) -> Self {
        Self { reader, sink, engine, options }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let run_id = Uuid::new_v4();
        let correlation_id = run_id.to_string();
        info!(
            event_name = "etl.run.started",
            correlation_id = %correlation_id,
            calendar_start = %self.options.calendar.start(),
            calendar_end = %self.options.calendar.end(),
            "warehouse rebuild started"
        );

        let snapshot = self.reader.read_snapshot().await.map_err(PipelineError::Extract)?;
        info!(
            event_name = "etl.extract.completed",
            correlation_id = %correlation_id,
            admissions = snapshot.admissions.len(),
            test_events = snapshot.test_events.len(),
            patients = snapshot.patients.len(),
            stay_prices = snapshot.stay_prices.len(),
            test_prices = snapshot.test_prices.len(),
            "source snapshot extracted"
        );

        let dim_patients = dimension_rows(&snapshot.patients)?;
        let dim_dates = build_dim_date(&self.options.calendar);
        let coverage = check_coverage(&self.options.calendar, &snapshot.admissions);
        if !coverage.is_complete() {
            warn!(
                event_name = "etl.calendar.uncovered",
                correlation_id = %correlation_id,
                uncovered_admissions = coverage.uncovered_admissions,
                earliest = ?coverage.earliest_uncovered,
                latest = ?coverage.latest_uncovered,
                "admissions fall outside the dim_date calendar range"
            );
        }

        let outcome = self.engine.reconcile(&snapshot)?;
        for skipped in &outcome.skipped {
            warn!(
                event_name = "etl.reconcile.admission_skipped",
                correlation_id = %correlation_id,
                patient_code = %skipped.key.patient_code,
                admitted_at = %skipped.key.admitted_at,
                reason = %skipped.reason,
                "admission skipped from stay cost aggregation"
            );
        }
        info!(
            event_name = "etl.reconcile.completed",
            correlation_id = %correlation_id,
            facts = outcome.facts.len(),
            stay_priced_admissions = outcome.stay_priced_admissions,
            test_priced_admissions = outcome.test_priced_admissions,
            unpriced_stay_days = outcome.unpriced_stay_days,
            unpriced_test_events = outcome.unpriced_test_events,
            "admission costs reconciled"
        );

        let referential = outcome.referential.clone();
        if referential.is_consistent() {
            info!(
                event_name = "etl.validate.referential",
                correlation_id = %correlation_id,
                "{}",
                referential.describe()
            );
        } else {
            warn!(
                event_name = "etl.validate.referential",
                correlation_id = %correlation_id,
                missing_from_facts = referential.missing_from_facts.len(),
                missing_from_dimension = referential.missing_from_dimension.len(),
                "{}",
                referential.describe()
            );
            if self.options.strict_referential {
                return Err(PipelineError::ReferentialMismatch { report: referential.describe() });
            }
        }

        let load = WarehouseLoad { dim_patients, dim_dates, facts: outcome.facts };
        self.sink.replace_all(&load).await.map_err(PipelineError::Load)?;

        let summary = RunSummary {
            run_id,
            dim_patients: load.dim_patients.len(),
            dim_dates: load.dim_dates.len(),
            facts: load.facts.len(),
            skipped_admissions: outcome.skipped.len(),
            unpriced_stay_days: outcome.unpriced_stay_days,
            unpriced_test_events: outcome.unpriced_test_events,
            coverage,
            referential,
        };
        info!(
            event_name = "etl.run.completed",
            correlation_id = %correlation_id,
            dim_patients = summary.dim_patients,
            dim_dates = summary.dim_dates,
            facts = summary.facts,
            "warehouse rebuild completed"
        );

        Ok(summary)
    }
}
