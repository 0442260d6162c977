use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;

use crate::commands::{load_config, CommandResult};

struct ConfigSource {
    doc: Option<Value>,
    path: Option<PathBuf>,
}

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let path = detect_config_path();
    let source = ConfigSource { doc: load_config_file_doc(path.as_deref()), path };

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(source.line("database.url", &config.database.url, &["QUICKQUOTE_DATABASE_URL"]));
    lines.push(source.line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        &["QUICKQUOTE_DATABASE_MAX_CONNECTIONS"],
    ));
    lines.push(source.line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        &["QUICKQUOTE_DATABASE_TIMEOUT_SECS"],
    ));

    let llm_api_key = if config.llm.has_api_key() { "<redacted>" } else { "<unset>" };
    lines.push(source.line("llm.api_key", llm_api_key, &["QUICKQUOTE_LLM_API_KEY"]));
    lines.push(source.line("llm.base_url", &config.llm.base_url, &["QUICKQUOTE_LLM_BASE_URL"]));
    lines.push(source.line("llm.model", &config.llm.model, &["QUICKQUOTE_LLM_MODEL"]));
    lines.push(source.line(
        "llm.timeout_secs",
        &config.llm.timeout_secs.to_string(),
        &["QUICKQUOTE_LLM_TIMEOUT_SECS"],
    ));
    lines.push(source.line(
        "llm.temperature",
        &config.llm.temperature.to_string(),
        &["QUICKQUOTE_LLM_TEMPERATURE"],
    ));

    lines.push(source.line(
        "session.user_id",
        &config.session.user_id,
        &["QUICKQUOTE_SESSION_USER_ID"],
    ));

    lines.push(source.line(
        "company.business_name",
        or_unset(&config.company.business_name),
        &["QUICKQUOTE_COMPANY_BUSINESS_NAME"],
    ));
    lines.push(source.line(
        "company.gst_registered",
        &config.company.gst_registered.to_string(),
        &["QUICKQUOTE_COMPANY_GST_REGISTERED"],
    ));
    let bank = if config.company.has_bank_details() { "<configured>" } else { "<unset>" };
    lines.push(source.line("company.account_number", bank, &[]));

    lines.push(source.line(
        "share.webhook_url",
        config.share.webhook_url.as_deref().unwrap_or("<unset>"),
        &["QUICKQUOTE_SHARE_WEBHOOK_URL"],
    ));
    lines.push(source.line(
        "share.webhook_timeout_secs",
        &config.share.webhook_timeout_secs.to_string(),
        &["QUICKQUOTE_SHARE_WEBHOOK_TIMEOUT_SECS"],
    ));

    lines.push(source.line(
        "logging.level",
        &config.logging.level,
        &["QUICKQUOTE_LOGGING_LEVEL", "QUICKQUOTE_LOG_LEVEL"],
    ));
    lines.push(source.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["QUICKQUOTE_LOGGING_FORMAT", "QUICKQUOTE_LOG_FORMAT"],
    ));

    CommandResult::text(lines.join("\n"))
}

impl ConfigSource {
    fn line(&self, key_path: &str, value: &str, env_keys: &[&str]) -> String {
        render_line(key_path, value, self.field_source(key_path, env_keys))
    }

    fn field_source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn detect_config_path() -> Option<PathBuf> {
    ["quickquote.toml", "config/quickquote.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
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

fn or_unset(value: &str) -> &str {
    if value.trim().is_empty() {
        "<unset>"
    } else {
        value
    }
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
