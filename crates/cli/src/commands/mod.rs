pub mod config;
pub mod draft;
pub mod history;
pub mod migrate;
pub mod rewrite;
pub mod send;

use quickquote_agent::{AiQuoteExtractor, GeminiClient};
use quickquote_core::config::{AppConfig, LoadOptions};
use quickquote_core::errors::{ExtractionError, LifecycleError, StoreError};
use quickquote_core::flows::SessionContext;
use quickquote_core::sync::CollectionScope;
use quickquote_db::{connect, migrations, SqlQuoteStore};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// A failed step: error class, message, exit code.
pub type Failure = (&'static str, String, u8);

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_failure(command: &str, (error_class, message, exit_code): Failure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }

    /// Plain text output, used for CSV and the config listing.
    pub fn text(output: String) -> Self {
        Self { exit_code: 0, output }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

/// Connects and brings the schema up to date.
pub(crate) async fn open_store(config: &AppConfig) -> Result<SqlQuoteStore, Failure> {
    let pool = connect(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(SqlQuoteStore::new(pool))
}

pub(crate) fn session_context(config: &AppConfig) -> SessionContext {
    SessionContext::new(
        CollectionScope::for_user(config.session.user_id.clone()),
        config.company.clone(),
    )
}

pub(crate) fn ai_extractor(
    config: &AppConfig,
) -> Result<AiQuoteExtractor<GeminiClient>, Failure> {
    if !config.llm.has_api_key() {
        return Err((
            "llm_unconfigured",
            "llm.api_key is required (set QUICKQUOTE_LLM_API_KEY or [llm].api_key)".to_string(),
            2,
        ));
    }
    let client = GeminiClient::from_config(&config.llm).map_err(|error| extraction_failure(&error))?;
    Ok(AiQuoteExtractor::new(client))
}

pub(crate) fn lifecycle_failure(error: &LifecycleError) -> Failure {
    let exit_code = match error {
        LifecycleError::Busy => 6,
        LifecycleError::Extraction(ExtractionError::InsufficientInput { .. }) => 7,
        LifecycleError::Extraction(_) => 8,
        LifecycleError::Persistence(_) => 9,
        LifecycleError::Domain(_) => 10,
    };
    (error.error_class(), format!("{} ({error})", error.user_message()), exit_code)
}

pub(crate) fn extraction_failure(error: &ExtractionError) -> Failure {
    lifecycle_failure(&LifecycleError::Extraction(error.clone()))
}

pub(crate) fn store_failure(error: StoreError) -> Failure {
    match error {
        StoreError::NotFound(id) => ("not_found", format!("no quote record `{id}`"), 9),
        other => lifecycle_failure(&LifecycleError::Persistence(other)),
    }
}
