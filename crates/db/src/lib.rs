pub mod connection;
pub mod etl;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect_database, connect_with_settings, DbPool};
pub use etl::{run_etl, EtlError};
pub use fixtures::{DemoHospitalDataset, SeedResult, VerificationResult};
pub use repositories::{
    InMemorySourceReader, InMemoryWarehouseSink, RepositoryError, SqlSourceReader,
    SqlWarehouseSink,
};
