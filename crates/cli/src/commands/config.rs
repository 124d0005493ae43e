use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;
use wardhouse_core::config::{AppConfig, LoadOptions};

struct FieldLookup<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

impl FieldLookup<'_> {
    fn line(&self, key: &str, value: &str, env_keys: &[&str]) -> String {
        format!("- {key} = {value} (source: {})", self.source(key, env_keys))
    }

    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run(options: LoadOptions) -> String {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let lookup = FieldLookup { doc: config_file_doc.as_ref(), path: config_file_path.as_deref() };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    for (section, database) in [("source", &config.source), ("sink", &config.sink)] {
        let prefix = format!("WARDHOUSE_{}", section.to_ascii_uppercase());
        let url_env = format!("{prefix}_URL");
        let max_connections_env = format!("{prefix}_MAX_CONNECTIONS");
        let timeout_env = format!("{prefix}_TIMEOUT_SECS");
        lines.push(lookup.line(
            &format!("{section}.url"),
            &redact_url(database.url.expose_secret()),
            &[url_env.as_str()],
        ));
        lines.push(lookup.line(
            &format!("{section}.max_connections"),
            &database.max_connections.to_string(),
            &[max_connections_env.as_str()],
        ));
        lines.push(lookup.line(
            &format!("{section}.timeout_secs"),
            &database.timeout_secs.to_string(),
            &[timeout_env.as_str()],
        ));
    }

    lines.push(lookup.line(
        "calendar.start",
        &config.calendar.start.to_string(),
        &["WARDHOUSE_CALENDAR_START"],
    ));
    lines.push(lookup.line("calendar.end", &config.calendar.end.to_string(), &["WARDHOUSE_CALENDAR_END"]));

    lines.push(lookup.line(
        "reconciliation.invalid_interval_policy",
        &format!("{:?}", config.reconciliation.invalid_interval_policy),
        &["WARDHOUSE_RECONCILIATION_INVALID_INTERVAL_POLICY"],
    ));
    lines.push(lookup.line(
        "reconciliation.strict_referential",
        &config.reconciliation.strict_referential.to_string(),
        &["WARDHOUSE_RECONCILIATION_STRICT_REFERENTIAL"],
    ));

    lines.push(lookup.line(
        "logging.level",
        &config.logging.level,
        &["WARDHOUSE_LOGGING_LEVEL", "WARDHOUSE_LOG_LEVEL"],
    ));
    lines.push(lookup.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["WARDHOUSE_LOGGING_FORMAT", "WARDHOUSE_LOG_FORMAT"],
    ));

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    ["wardhouse.toml", "config/wardhouse.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Hides credentials embedded in a connection URL, keeping scheme and location visible.
fn redact_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let Some((scheme, rest)) = trimmed.split_once("://") else {
        return trimmed.to_string();
    };
    match rest.rsplit_once('@') {
        Some((_, location)) => format!("{scheme}://***@{location}"),
        None => trimmed.to_string(),
    }
}
