use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use serde::Serialize;
use sourcely_core::config::{AppConfig, LoadOptions};
use toml::{Table, Value};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

struct SourceResolver {
    path: Option<PathBuf>,
    doc: Option<Value>,
}

impl SourceResolver {
    fn detect() -> Self {
        let path = detect_config_path();
        let doc = load_config_file_doc(path.as_deref());
        Self { path, doc }
    }

    fn entry(&self, key: &'static str, env_key: &str, value: impl Into<String>) -> ConfigEntry {
        ConfigEntry {
            key,
            value: value.into(),
            source: field_source(key, Some(env_key), self.doc.as_ref(), self.path.as_deref()),
        }
    }
}

/// Effective configuration with per-key source attribution. Secrets are redacted.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let entries = effective_entries(&config, &SourceResolver::detect());
    let data = serde_json::to_value(&entries).ok();
    CommandResult::success_with_data(
        "config",
        "effective config (source precedence: env > file > default)",
        data,
    )
}

fn effective_entries(config: &AppConfig, sources: &SourceResolver) -> Vec<ConfigEntry> {
    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    vec![
        sources.entry("database.url", "SOURCELY_DATABASE_URL", &config.database.url),
        sources.entry(
            "database.max_connections",
            "SOURCELY_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections.to_string(),
        ),
        sources.entry(
            "database.timeout_secs",
            "SOURCELY_DATABASE_TIMEOUT_SECS",
            config.database.timeout_secs.to_string(),
        ),
        sources.entry("llm.provider", "SOURCELY_LLM_PROVIDER", config.llm.provider.as_str()),
        sources.entry("llm.model", "SOURCELY_LLM_MODEL", &config.llm.model),
        sources.entry("llm.base_url", "SOURCELY_LLM_BASE_URL", config.llm.effective_base_url()),
        sources.entry("llm.api_key", "SOURCELY_LLM_API_KEY", api_key),
        sources.entry(
            "llm.temperature",
            "SOURCELY_LLM_TEMPERATURE",
            config.llm.temperature.to_string(),
        ),
        sources.entry(
            "llm.timeout_secs",
            "SOURCELY_LLM_TIMEOUT_SECS",
            config.llm.timeout_secs.to_string(),
        ),
        sources.entry(
            "server.bind_address",
            "SOURCELY_SERVER_BIND_ADDRESS",
            &config.server.bind_address,
        ),
        sources.entry("server.port", "SOURCELY_SERVER_PORT", config.server.port.to_string()),
        sources.entry(
            "server.graceful_shutdown_secs",
            "SOURCELY_SERVER_GRACEFUL_SHUTDOWN_SECS",
            config.server.graceful_shutdown_secs.to_string(),
        ),
        sources.entry("logging.level", "SOURCELY_LOGGING_LEVEL", &config.logging.level),
        sources.entry(
            "logging.format",
            "SOURCELY_LOGGING_FORMAT",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("sourcely.toml"), PathBuf::from("config/sourcely.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Table>().ok().map(Value::Table)
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
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

/// Keeps a recognizable key prefix (`gsk_`, `sk-`) and hides the rest.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.find(['_', '-']) {
        Some(index) if index <= 4 => format!("{}***", &trimmed[..=index]),
        _ => "<redacted>".to_string(),
    }
}
