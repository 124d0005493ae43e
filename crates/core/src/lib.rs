pub mod calendar;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pipeline;
pub mod reconcile;

pub use calendar::{build_dim_date, check_coverage, CalendarCoverage, CalendarRange};
pub use domain::admission::{Admission, AdmissionKey, TestEvent};
pub use domain::calendar::DimDate;
pub use domain::fact::FactHospitalStay;
pub use domain::patient::{Patient, PatientCode};
pub use domain::pricing::{StayPriceRecord, TestCode, TestPriceRecord};
pub use domain::SourceSnapshot;
pub use errors::{DomainError, InvalidIntervalError, StorageError};
pub use pipeline::{
    EtlPipeline, PipelineError, RunOptions, RunSummary, SourceReader, WarehouseLoad, WarehouseSink,
};
pub use reconcile::{
    reconcile, DeterministicReconciliationEngine, InvalidIntervalPolicy, ReconciliationEngine,
    ReconciliationOutcome, ReferentialReport,
};
