use serde_json::json;
use wardhouse_core::config::LoadOptions;
use wardhouse_db::{run_etl, EtlError};

use crate::commands::{prepare, CommandResult};

pub fn run(options: LoadOptions) -> CommandResult {
    let (config, runtime) = match prepare("run", options) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    match runtime.block_on(run_etl(&config.pipeline())) {
        Ok(summary) => {
            let message = format!(
                "warehouse rebuilt: {} patients, {} dates, {} facts; {}",
                summary.dim_patients,
                summary.dim_dates,
                summary.facts,
                summary.referential.describe()
            );
            let details = serde_json::to_value(&summary).unwrap_or_else(|error| {
                json!({ "run_id": summary.run_id.to_string(), "serialization_error": error.to_string() })
            });
            CommandResult::success_with_details("run", message, details)
        }
        Err(error) => CommandResult::failure("run", error.error_class(), error.to_string(), exit_code(&error)),
    }
}

fn exit_code(error: &EtlError) -> u8 {
    match error {
        EtlError::Config(_) => 2,
        EtlError::SourceConnect(_) | EtlError::SinkConnect(_) => 4,
        EtlError::Migration(_) => 5,
        EtlError::Pipeline(_) => 6,
    }
}
