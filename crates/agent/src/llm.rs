use std::time::Duration;

use async_trait::async_trait;
use quickquote_core::config::LlmConfig;
use quickquote_core::errors::ExtractionError;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Text,
}

impl ResponseFormat {
    fn mime_type(self) -> Option<&'static str> {
        match self {
            Self::Json => Some("application/json"),
            Self::Text => None,
        }
    }
}

/// One prompt in, one block of text out. Transport and protocol failures
/// surface as [`ExtractionError::GenerationService`].
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str, format: ResponseFormat)
        -> Result<String, ExtractionError>;
}

/// Client for a `generateContent` style endpoint.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    temperature: f32,
}

impl GeminiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, ExtractionError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or_else(|| {
                ExtractionError::GenerationService("llm.api_key is not configured".to_string())
            })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| ExtractionError::GenerationService(error.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(
        &self,
        prompt: &str,
        format: ResponseFormat,
    ) -> Result<String, ExtractionError> {
        let endpoint = self.endpoint();
        debug!(event_name = "llm.request.started", model = %self.model, "calling generation endpoint");

        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&GenerateRequest::new(prompt, self.temperature, format))
            .send()
            .await
            .map_err(|error| {
                warn!(event_name = "llm.request.failed", error = %error, "generation request failed");
                ExtractionError::GenerationService(format!("request failed: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(event_name = "llm.request.rejected", status = %status, "generation endpoint returned an error");
            return Err(ExtractionError::GenerationService(format!(
                "generation endpoint returned {status}"
            )));
        }

        let payload: Value = response.json().await.map_err(|error| {
            ExtractionError::GenerationService(format!("failed to decode response: {error}"))
        })?;
        response_text(&payload).map(str::to_string)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str, temperature: f32, format: ResponseFormat) -> Self {
        Self {
            contents: [Content { parts: [Part { text: prompt }] }],
            generation_config: GenerationConfig {
                temperature,
                response_mime_type: format.mime_type(),
            },
        }
    }
}

/// Text at `candidates[0].content.parts[0].text`.
pub fn response_text(payload: &Value) -> Result<&str, ExtractionError> {
    payload.pointer("/candidates/0/content/parts/0/text").and_then(Value::as_str).ok_or_else(|| {
        ExtractionError::GenerationService("response has no candidate text".to_string())
    })
}

#[cfg(test)]
mod tests {
    use quickquote_core::config::AppConfig;
    use quickquote_core::errors::ExtractionError;
    use serde_json::json;

    use super::{response_text, GeminiClient, GenerateRequest, LlmClient, ResponseFormat};
    use crate::test_support::{serve_once, CannedResponse};

    fn client_for(base_url: String) -> GeminiClient {
        let mut config = AppConfig::default().llm;
        config.base_url = base_url;
        config.model = "test-model".to_string();
        config.api_key = Some("test-key".to_string().into());
        GeminiClient::from_config(&config).expect("client builds")
    }

    #[test]
    fn request_body_matches_wire_shape() {
        let body = serde_json::to_value(GenerateRequest::new("hello", 0.2, ResponseFormat::Json))
            .expect("serializes");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");

        let text = serde_json::to_value(GenerateRequest::new("hi", 0.5, ResponseFormat::Text))
            .expect("serializes");
        assert!(text["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn missing_text_path_is_a_service_error() {
        assert_eq!(
            response_text(&json!({"candidates": [{"content": {"parts": [{"text": "ok"}]}}]})),
            Ok("ok")
        );
        assert!(matches!(
            response_text(&json!({"candidates": []})),
            Err(ExtractionError::GenerationService(_))
        ));
    }

    #[test]
    fn missing_api_key_is_rejected_before_any_call() {
        let config = AppConfig::default().llm;
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(ExtractionError::GenerationService(message)) if message.contains("api_key")
        ));
    }

    #[tokio::test]
    async fn successful_call_posts_to_model_endpoint() {
        let body = json!({"candidates": [{"content": {"parts": [{"text": "{\"items\":[]}"}]}}]});
        let (base_url, request) = serve_once(CannedResponse::ok(body.to_string())).await;

        let text = client_for(base_url)
            .complete("prompt text", ResponseFormat::Json)
            .await
            .expect("completion succeeds");
        assert_eq!(text, "{\"items\":[]}");

        let request = request.await.expect("request captured");
        assert!(request.head.starts_with("POST /v1beta/models/test-model:generateContent"));
        assert!(request.head.to_ascii_lowercase().contains("x-goog-api-key: test-key"));
        assert!(request.body.contains("prompt text"));
    }

    #[tokio::test]
    async fn non_success_status_is_a_service_error() {
        let (base_url, _request) =
            serve_once(CannedResponse::status(503, "{\"error\":\"overloaded\"}")).await;

        let error = client_for(base_url)
            .complete("prompt", ResponseFormat::Text)
            .await
            .expect_err("503 fails");
        assert!(matches!(error, ExtractionError::GenerationService(message) if message.contains("503")));
    }
}
