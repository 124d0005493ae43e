use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::CalendarRange;
use crate::pipeline::RunOptions;
use crate::reconcile::InvalidIntervalPolicy;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub source: DatabaseConfig,
    pub sink: DatabaseConfig,
    pub calendar: CalendarConfig,
    pub reconciliation: ReconciliationConfig,
    pub logging: LoggingConfig,
}

/// Connection settings for one SQLite database.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: SecretString,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconciliationConfig {
    pub invalid_interval_policy: InvalidIntervalPolicy,
    pub strict_referential: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Everything one ETL run needs, passed explicitly into the entry point.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub source: DatabaseConfig,
    pub sink: DatabaseConfig,
    pub calendar_range_start: NaiveDate,
    pub calendar_range_end: NaiveDate,
    pub invalid_interval_policy: InvalidIntervalPolicy,
    pub strict_referential: bool,
}

impl PipelineConfig {
    pub fn source_dsn(&self) -> &str {
        self.source.url.expose_secret()
    }

    pub fn sink_dsn(&self) -> &str {
        self.sink.url.expose_secret()
    }

    pub fn run_options(&self) -> Result<RunOptions, ConfigError> {
        let calendar = CalendarRange::new(self.calendar_range_start, self.calendar_range_end)
            .map_err(|error| ConfigError::Validation(error.to_string()))?;
        Ok(RunOptions {
            calendar,
            invalid_interval_policy: self.invalid_interval_policy,
            strict_referential: self.strict_referential,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub source_url: Option<String>,
    pub sink_url: Option<String>,
    pub calendar_start: Option<NaiveDate>,
    pub calendar_end: Option<NaiveDate>,
    pub invalid_interval_policy: Option<InvalidIntervalPolicy>,
    pub strict_referential: Option<bool>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: DatabaseConfig {
                url: secret_value("sqlite://hospital.db".to_string()),
                max_connections: 5,
                timeout_secs: 30,
            },
            sink: DatabaseConfig {
                url: secret_value("sqlite://warehouse.db".to_string()),
                max_connections: 5,
                timeout_secs: 30,
            },
            calendar: CalendarConfig {
                start: calendar_literal(2020, 1, 1),
                end: calendar_literal(2024, 12, 31),
            },
            reconciliation: ReconciliationConfig {
                invalid_interval_policy: InvalidIntervalPolicy::Skip,
                strict_referential: false,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

fn calendar_literal(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .expect("default calendar bounds are valid calendar dates")
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch, &path)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("wardhouse.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            source: self.source.clone(),
            sink: self.sink.clone(),
            calendar_range_start: self.calendar.start,
            calendar_range_end: self.calendar.end,
            invalid_interval_policy: self.reconciliation.invalid_interval_policy,
            strict_referential: self.reconciliation.strict_referential,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch, path: &Path) -> Result<(), ConfigError> {
        if let Some(source) = patch.source {
            apply_database_patch(&mut self.source, source);
        }
        if let Some(sink) = patch.sink {
            apply_database_patch(&mut self.sink, sink);
        }

        if let Some(calendar) = patch.calendar {
            if let Some(start) = calendar.start {
                self.calendar.start = parse_file_date(path, "calendar.start", &start)?;
            }
            if let Some(end) = calendar.end {
                self.calendar.end = parse_file_date(path, "calendar.end", &end)?;
            }
        }

        if let Some(reconciliation) = patch.reconciliation {
            if let Some(policy) = reconciliation.invalid_interval_policy {
                self.reconciliation.invalid_interval_policy = policy;
            }
            if let Some(strict_referential) = reconciliation.strict_referential {
                self.reconciliation.strict_referential = strict_referential;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("WARDHOUSE_SOURCE_URL") {
            self.source.url = secret_value(value);
        }
        if let Some(value) = read_env("WARDHOUSE_SOURCE_MAX_CONNECTIONS") {
            self.source.max_connections = parse_u32("WARDHOUSE_SOURCE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("WARDHOUSE_SOURCE_TIMEOUT_SECS") {
            self.source.timeout_secs = parse_u64("WARDHOUSE_SOURCE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("WARDHOUSE_SINK_URL") {
            self.sink.url = secret_value(value);
        }
        if let Some(value) = read_env("WARDHOUSE_SINK_MAX_CONNECTIONS") {
            self.sink.max_connections = parse_u32("WARDHOUSE_SINK_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("WARDHOUSE_SINK_TIMEOUT_SECS") {
            self.sink.timeout_secs = parse_u64("WARDHOUSE_SINK_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("WARDHOUSE_CALENDAR_START") {
            self.calendar.start = parse_date("WARDHOUSE_CALENDAR_START", &value)?;
        }
        if let Some(value) = read_env("WARDHOUSE_CALENDAR_END") {
            self.calendar.end = parse_date("WARDHOUSE_CALENDAR_END", &value)?;
        }

        if let Some(value) = read_env("WARDHOUSE_RECONCILIATION_INVALID_INTERVAL_POLICY") {
            self.reconciliation.invalid_interval_policy = value.parse().map_err(|_| {
                ConfigError::InvalidEnvOverride {
                    key: "WARDHOUSE_RECONCILIATION_INVALID_INTERVAL_POLICY".to_string(),
                    value: value.clone(),
                }
            })?;
        }
        if let Some(value) = read_env("WARDHOUSE_RECONCILIATION_STRICT_REFERENTIAL") {
            self.reconciliation.strict_referential =
                parse_bool("WARDHOUSE_RECONCILIATION_STRICT_REFERENTIAL", &value)?;
        }

        let log_level =
            read_env("WARDHOUSE_LOGGING_LEVEL").or_else(|| read_env("WARDHOUSE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("WARDHOUSE_LOGGING_FORMAT").or_else(|| read_env("WARDHOUSE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(source_url) = overrides.source_url {
            self.source.url = secret_value(source_url);
        }
        if let Some(sink_url) = overrides.sink_url {
            self.sink.url = secret_value(sink_url);
        }
        if let Some(start) = overrides.calendar_start {
            self.calendar.start = start;
        }
        if let Some(end) = overrides.calendar_end {
            self.calendar.end = end;
        }
        if let Some(policy) = overrides.invalid_interval_policy {
            self.reconciliation.invalid_interval_policy = policy;
        }
        if let Some(strict_referential) = overrides.strict_referential {
            self.reconciliation.strict_referential = strict_referential;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database("source", &self.source)?;
        validate_database("sink", &self.sink)?;
        validate_calendar(&self.calendar)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn apply_database_patch(database: &mut DatabaseConfig, patch: DatabasePatch) {
    if let Some(url) = patch.url {
        database.url = secret_value(url);
    }
    if let Some(max_connections) = patch.max_connections {
        database.max_connections = max_connections;
    }
    if let Some(timeout_secs) = patch.timeout_secs {
        database.timeout_secs = timeout_secs;
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("wardhouse.toml"), PathBuf::from("config/wardhouse.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(section: &str, database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.expose_secret().trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(format!(
            "{section}.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
        )));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(format!(
            "{section}.max_connections must be greater than zero"
        )));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "{section}.timeout_secs must be in range 1..=300"
        )));
    }

    Ok(())
}

fn validate_calendar(calendar: &CalendarConfig) -> Result<(), ConfigError> {
    if calendar.start > calendar.end {
        return Err(ConfigError::Validation(format!(
            "calendar.start ({}) must not be after calendar.end ({})",
            calendar.start, calendar.end
        )));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
    })
}

fn parse_file_date(path: &Path, key: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        ConfigError::Validation(format!(
            "{key} in `{}` must be a YYYY-MM-DD date, got `{value}`",
            path.display()
        ))
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    source: Option<DatabasePatch>,
    sink: Option<DatabasePatch>,
    calendar: Option<CalendarPatch>,
    reconciliation: Option<ReconciliationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CalendarPatch {
    start: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReconciliationPatch {
    invalid_interval_policy: Option<InvalidIntervalPolicy>,
    strict_referential: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
