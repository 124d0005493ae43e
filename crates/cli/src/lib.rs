pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use wardhouse_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use wardhouse_core::InvalidIntervalPolicy;

#[derive(Debug, Parser)]
#[command(
    name = "wardhouse",
    about = "Hospital cost warehouse ETL",
    long_about = "Rebuild the hospital stay warehouse from the operational database, and manage its schema, demo data and configuration.",
    after_help = "Examples:\n  wardhouse seed\n  wardhouse run --strict-referential\n  wardhouse doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a wardhouse.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Extract, reconcile and reload dim_patients, dim_date and fact_hospital_stays")]
    Run(RunArgs),
    #[command(about = "Apply pending migrations to the source and warehouse databases")]
    Migrate,
    #[command(about = "Load the demo hospital dataset into the source database")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Validate config and check connectivity to both databases")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    #[arg(long, help = "Override source.url")]
    pub source_url: Option<String>,
    #[arg(long, help = "Override sink.url")]
    pub sink_url: Option<String>,
    #[arg(long, help = "First date of dim_date (YYYY-MM-DD)")]
    pub calendar_start: Option<NaiveDate>,
    #[arg(long, help = "Last date of dim_date (YYYY-MM-DD)")]
    pub calendar_end: Option<NaiveDate>,
    #[arg(long, help = "What to do with admissions discharged before they start: skip|abort")]
    pub invalid_interval_policy: Option<InvalidIntervalPolicy>,
    #[arg(long, help = "Fail the run when dim_patients and fact_hospital_stays disagree")]
    pub strict_referential: bool,
}

impl RunArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            source_url: self.source_url.clone(),
            sink_url: self.sink_url.clone(),
            calendar_start: self.calendar_start,
            calendar_end: self.calendar_end,
            invalid_interval_policy: self.invalid_interval_policy,
            strict_referential: self.strict_referential.then_some(true),
            log_level: None,
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let base = LoadOptions { config_path: cli.config.clone(), ..LoadOptions::default() };

    let mut options = base.clone();
    if let Command::Run(args) = &cli.command {
        options.overrides = args.overrides();
    }
    // Commands report config errors themselves; logging only starts once config loads.
    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Run(_) => commands::run::run(options),
        Command::Migrate => commands::migrate::run(base),
        Command::Seed => commands::seed::run(base),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(base) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(base, json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON payload.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use clap::Parser;
    use wardhouse_core::InvalidIntervalPolicy;

    use super::{Cli, Command};

    #[test]
    fn run_flags_become_config_overrides() {
        let cli = Cli::try_parse_from([
            "wardhouse",
            "run",
            "--calendar-start",
            "2023-01-01",
            "--invalid-interval-policy",
            "abort",
            "--strict-referential",
        ])
        .expect("parse run flags");

        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        let overrides = args.overrides();
        assert_eq!(overrides.calendar_start, NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(overrides.invalid_interval_policy, Some(InvalidIntervalPolicy::Abort));
        assert_eq!(overrides.strict_referential, Some(true));
        assert_eq!(overrides.source_url, None);
    }

    #[test]
    fn strict_referential_is_left_to_config_when_flag_absent() {
        let cli = Cli::try_parse_from(["wardhouse", "run"]).expect("parse run");

        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.overrides().strict_referential, None);
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["wardhouse", "doctor", "--json", "--config", "custom.toml"])
            .expect("parse doctor");

        assert_eq!(cli.config.as_deref().and_then(|path| path.to_str()), Some("custom.toml"));
        assert!(matches!(cli.command, Command::Doctor { json: true }));
    }
}
