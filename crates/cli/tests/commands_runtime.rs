use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use anyhow::{Context, Result};
use serde_json::Value;
use sourcely_cli::commands::{ask, config, doctor, migrate, seed};

const MEMORY_DB: &[(&str, &str)] =
    &[("SOURCELY_DATABASE_URL", "sqlite::memory:"), ("SOURCELY_DATABASE_MAX_CONNECTIONS", "1")];

#[test]
fn migrate_returns_success_with_valid_env() -> Result<()> {
    with_env(MEMORY_DB, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output)?;
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        Ok(())
    })
}

#[test]
fn migrate_returns_config_failure_without_hosted_llm_key() -> Result<()> {
    with_env(&[("SOURCELY_LLM_PROVIDER", "groq")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output)?;
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        Ok(())
    })
}

#[test]
fn seed_reports_demo_suppliers() -> Result<()> {
    with_env(MEMORY_DB, || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected demo catalog to load");

        let payload = parse_payload(&result.output)?;
        assert_eq!(payload["command"], "seed");
        let message = payload["message"].as_str().context("seed message")?;
        assert!(message.starts_with("demo catalog loaded: 4 suppliers, 12 products"));
        assert!(message.contains("  - GameHub Wholesale"));
        Ok(())
    })
}

#[test]
fn seed_is_idempotent_across_runs() -> Result<()> {
    let database = TempDatabase::new("seed-idempotent");
    with_env(&database.env(), || {
        let first = parse_payload(&seed::run().output)?;
        let second = parse_payload(&seed::run().output)?;

        assert_eq!(first["status"], "ok");
        assert_eq!(second["status"], "ok");
        assert_eq!(first["message"], second["message"]);
        Ok(())
    })
}

#[test]
fn ask_answers_from_the_seeded_catalog() -> Result<()> {
    let database = TempDatabase::new("ask-supplier-products");
    with_env(&database.env(), || {
        assert_eq!(seed::run().exit_code, 0);

        let classification = r#"{"query_type": "supplier_products",
            "entities": {"supplier_name": "techmaster", "sort": "price_desc"}}"#;
        let result = ask::run("TechMaster products, priciest first", Some(classification));
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output)?;
        assert_eq!(payload["message"], "answered");
        assert_eq!(payload["data"]["supplier"]["name"], "TechMaster");
        assert_eq!(payload["data"]["count"], 4);
        assert_eq!(payload["data"]["products"][0]["name"], "Predator 32 Gaming Monitor");
        Ok(())
    })
}

#[test]
fn ask_with_unusable_classification_falls_back_to_product_search() -> Result<()> {
    let database = TempDatabase::new("ask-fallback");
    with_env(&database.env(), || {
        assert_eq!(seed::run().exit_code, 0);

        let result = ask::run("what do you have?", Some("no idea, sorry"));
        let payload = parse_payload(&result.output)?;
        assert_eq!(payload["data"]["count"], 12);
        Ok(())
    })
}

#[test]
fn ask_rejects_blank_utterances() -> Result<()> {
    with_env(MEMORY_DB, || {
        let result = ask::run("   ", None);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)?["error_class"], "invalid_input");
        Ok(())
    })
}

#[test]
fn config_redacts_the_api_key() -> Result<()> {
    with_env(&[("SOURCELY_LLM_PROVIDER", "groq"), ("SOURCELY_LLM_API_KEY", "gsk_topsecret")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);
        assert!(!result.output.contains("topsecret"));

        let payload = parse_payload(&result.output)?;
        let entries = payload["data"].as_array().context("config entries")?;
        let api_key = entries
            .iter()
            .find(|entry| entry["key"] == "llm.api_key")
            .context("api key entry")?;
        assert_eq!(api_key["value"], "gsk_***");
        assert_eq!(api_key["source"], "env (SOURCELY_LLM_API_KEY)");
        Ok(())
    })
}

#[test]
fn doctor_reports_readiness_as_json() -> Result<()> {
    with_env(MEMORY_DB, || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0, "doctor output: {}", result.output);

        let report = parse_payload(&result.output)?;
        assert_eq!(report["overall_status"], "pass");
        assert_eq!(report["checks"].as_array().map(Vec::len), Some(3));
        Ok(())
    })
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() -> Result<()> {
    with_env(&[("SOURCELY_LLM_TEMPERATURE", "9")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let report = parse_payload(&result.output)?;
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][1]["status"], "skipped");
        assert_eq!(report["checks"][2]["status"], "skipped");
        Ok(())
    })
}

fn parse_payload(output: &str) -> Result<Value> {
    serde_json::from_str(output).context("command output should be valid JSON")
}

/// File-backed SQLite database so state survives across separate command runs.
struct TempDatabase {
    path: PathBuf,
    url: String,
}

impl TempDatabase {
    fn new(label: &str) -> Self {
        let path = env::temp_dir().join(format!("sourcely-cli-{label}-{}.db", std::process::id()));
        remove_database_files(&path);
        let url = format!("sqlite://{}?mode=rwc", path.display());
        Self { path, url }
    }

    fn env(&self) -> Vec<(&'static str, &str)> {
        vec![("SOURCELY_DATABASE_URL", self.url.as_str())]
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        remove_database_files(&self.path);
    }
}

fn remove_database_files(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce() -> Result<()>) -> Result<()> {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    // A failed assertion in another test poisons the lock; the env is restored regardless.
    let _guard = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|p| p.into_inner());

    let keys = [
        "SOURCELY_DATABASE_URL",
        "SOURCELY_DATABASE_MAX_CONNECTIONS",
        "SOURCELY_DATABASE_TIMEOUT_SECS",
        "SOURCELY_LLM_PROVIDER",
        "SOURCELY_LLM_API_KEY",
        "GROQ_API_KEY",
        "SOURCELY_LLM_BASE_URL",
        "SOURCELY_LLM_MODEL",
        "SOURCELY_LLM_TEMPERATURE",
        "SOURCELY_LLM_TIMEOUT_SECS",
        "SOURCELY_SERVER_BIND_ADDRESS",
        "SOURCELY_SERVER_PORT",
        "SOURCELY_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "SOURCELY_LOGGING_LEVEL",
        "SOURCELY_LOGGING_FORMAT",
        "SOURCELY_LOG_LEVEL",
        "SOURCELY_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    let outcome = test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }

    outcome
}
