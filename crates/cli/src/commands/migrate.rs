use wardhouse_core::config::{DatabaseConfig, LoadOptions};
use wardhouse_db::{connect_database, migrations, DbPool};

use crate::commands::{prepare, CommandResult};

type MigrateFailure = (&'static str, String, u8);

pub fn run(options: LoadOptions) -> CommandResult {
    let (config, runtime) = match prepare("migrate", options) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let source = connect(&config.source).await?;
        let applied = migrations::run_source(&source).await;
        source.close().await;
        applied.map_err(|error| ("migration", format!("source schema: {error}"), 5u8))?;

        let sink = connect(&config.sink).await?;
        let applied = migrations::run_warehouse(&sink).await;
        sink.close().await;
        applied.map_err(|error| ("migration", format!("warehouse schema: {error}"), 5u8))?;

        Ok::<(), MigrateFailure>(())
    });

    match result {
        Ok(()) => CommandResult::success(
            "migrate",
            "applied pending migrations to source and warehouse databases",
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}

async fn connect(database: &DatabaseConfig) -> Result<DbPool, MigrateFailure> {
    connect_database(database).await.map_err(|error| ("db_connectivity", error.to_string(), 4u8))
}
