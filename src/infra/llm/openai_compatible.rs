use std::time::{Duration, Instant};

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{GenerationRequest, LlmError};

use super::env::{
    DEFAULT_TIMEOUT, ENV_GLOBAL_TIMEOUT_SECS, EnvReader, read_api_key,
    read_non_empty, read_timeout, resolve_timeout_with_global_fallback,
};
use super::response_parsing::{require_source_text, truncate_message};
use super::{LlmProvider, PromptBuilder};

const DEFAULT_PROVIDER_ID: &str = "openai_compatible";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TOKENS: u16 = 4000;

const ENV_API_KEY: &str = "VIBR_OPENAI_API_KEY";
const ENV_API_KEY_FALLBACK: &str = "OPENAI_API_KEY";
const ENV_BASE_URL: &str = "VIBR_OPENAI_BASE_URL";
const ENV_PROVIDER_ID: &str = "VIBR_OPENAI_PROVIDER_ID";
const ENV_MODEL: &str = "VIBR_OPENAI_MODEL";
const ENV_TIMEOUT_SECS: &str = "VIBR_OPENAI_TIMEOUT_SECS";

pub struct OpenAiCompatibleProvider {
    provider_id: String,
    api_key: String,
    api_base_url: String,
    model: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    /// Returns `Ok(None)` when no API key is configured.
    pub(crate) fn from_env_vars(read: EnvReader<'_>) -> Result<Option<Self>, LlmError> {
        let Some(api_key) = read_api_key(read, ENV_API_KEY, ENV_API_KEY_FALLBACK)? else {
            return Ok(None);
        };

        let api_base_url =
            read_non_empty(read, ENV_BASE_URL)?.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let provider_id = read_non_empty(read, ENV_PROVIDER_ID)?
            .unwrap_or_else(|| DEFAULT_PROVIDER_ID.to_string());
        let model = read_non_empty(read, ENV_MODEL)?.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout = resolve_timeout_with_global_fallback(
            read_timeout(read, ENV_TIMEOUT_SECS)?,
            || read_timeout(read, ENV_GLOBAL_TIMEOUT_SECS),
            DEFAULT_TIMEOUT,
        )?;

        Self::with_config(provider_id, api_key, api_base_url, model, timeout).map(Some)
    }

    pub fn with_config(
        provider_id: impl Into<String>,
        api_key: impl Into<String>,
        api_base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let provider_id = provider_id.into();
        let provider_id = provider_id.trim();
        if provider_id.is_empty() {
            return Err(LlmError::validation(
                "OpenAI-compatible provider_id must not be empty",
            ));
        }

        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::validation(
                "OpenAI-compatible API key must not be empty",
            ));
        }

        let api_base_url = api_base_url.into();
        if api_base_url.trim().is_empty() {
            return Err(LlmError::validation(
                "OpenAI-compatible API base URL must not be empty",
            ));
        }

        let model = model.into();
        let model = model.trim();
        if model.is_empty() {
            return Err(LlmError::validation(
                "OpenAI-compatible model must not be empty",
            ));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            LlmError::internal(format!(
                "failed to create OpenAI-compatible HTTP client: {err}"
            ))
        })?;

        Ok(Self {
            provider_id: provider_id.to_string(),
            api_key,
            api_base_url,
            model: model.to_string(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_url(&self) -> String {
        build_v1_url(&self.api_base_url, "chat/completions")
    }

    fn build_request_payload(&self, request: &GenerationRequest) -> OpenAiChatCompletionsRequest {
        let prompt = PromptBuilder::build(request);

        OpenAiChatCompletionsRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAiChatMessageRequest {
                    role: "system".to_string(),
                    content: prompt.system,
                },
                OpenAiChatMessageRequest {
                    role: "user".to_string(),
                    content: prompt.user,
                },
            ],
            max_tokens: Some(DEFAULT_MAX_TOKENS),
        }
    }

    fn map_success_response(&self, response_body: &str) -> Result<String, LlmError> {
        let response: OpenAiChatCompletionsResponse =
            serde_json::from_str(response_body).map_err(|err| {
                LlmError::invalid_response(format!(
                    "OpenAI-compatible response decode failed: {err}"
                ))
            })?;

        let response_text = response
            .choices
            .iter()
            .find_map(OpenAiChoice::extract_text)
            .unwrap_or_default();

        require_source_text("OpenAI-compatible", response_text)
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let payload = self.build_request_payload(request);
        let started = Instant::now();

        let response = self
            .client
            .post(self.endpoint_url())
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .map_err(map_transport_error)?;

        let status = response.status();
        let response_body = response.text().map_err(map_transport_error)?;
        debug!(
            "{} responded with HTTP {status} after {} ms",
            self.provider_id,
            started.elapsed().as_millis()
        );
        if !status.is_success() {
            return Err(map_http_error(status, &response_body));
        }

        self.map_success_response(&response_body)
    }
}

#[derive(Debug, Serialize)]
struct OpenAiChatCompletionsRequest {
    model: String,
    messages: Vec<OpenAiChatMessageRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u16>,
}

#[derive(Debug, Serialize)]
struct OpenAiChatMessageRequest {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    message: Option<OpenAiChoiceMessage>,
    #[serde(default)]
    text: Option<String>,
}

impl OpenAiChoice {
    fn extract_text(&self) -> Option<String> {
        if let Some(text) = self.text.as_deref().filter(|text| !text.trim().is_empty()) {
            return Some(text.to_string());
        }

        let content = self.message.as_ref()?.content.as_ref()?;
        extract_message_content(content)
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    #[serde(default)]
    error: Option<OpenAiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

fn extract_message_content(content: &Value) -> Option<String> {
    let text = match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(extract_content_part_text)
            .collect::<String>(),
        _ => return None,
    };
    (!text.trim().is_empty()).then_some(text)
}

fn extract_content_part_text(part: &Value) -> Option<String> {
    match part {
        Value::String(text) => Some(text.to_string()),
        Value::Object(map) => map
            .get("text")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        _ => None,
    }
}

fn map_http_error(status: StatusCode, body: &str) -> LlmError {
    let parsed_error = serde_json::from_str::<OpenAiErrorEnvelope>(body).ok();
    let error_type = parsed_error
        .as_ref()
        .and_then(|envelope| envelope.error.as_ref())
        .and_then(|detail| detail.error_type.as_deref());
    let error_code = parsed_error
        .as_ref()
        .and_then(|envelope| envelope.error.as_ref())
        .and_then(|detail| detail.code.as_deref());

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || matches!(error_type, Some("authentication_error"))
        || matches!(
            error_code,
            Some("invalid_api_key" | "invalid_authentication")
        )
    {
        return LlmError::Auth;
    }

    if status == StatusCode::TOO_MANY_REQUESTS
        || matches!(error_type, Some("rate_limit_error" | "insufficient_quota"))
        || matches!(
            error_code,
            Some("rate_limit_exceeded" | "insufficient_quota")
        )
    {
        return LlmError::RateLimited;
    }

    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::GATEWAY_TIMEOUT
        || matches!(error_type, Some("timeout" | "server_timeout"))
        || matches!(error_code, Some("request_timeout"))
    {
        return LlmError::Timeout;
    }

    let message = parsed_error
        .as_ref()
        .and_then(|envelope| envelope.error.as_ref())
        .map(|detail| detail.message.clone())
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| truncate_message(body));

    LlmError::Transport {
        message: format!("OpenAI-compatible API returned HTTP {status}: {message}"),
    }
}

fn map_transport_error(error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        return LlmError::Timeout;
    }

    LlmError::Transport {
        message: format!("OpenAI-compatible transport error: {error}"),
    }
}

fn build_v1_url(api_base_url: &str, endpoint_path: &str) -> String {
    let base = api_base_url.trim_end_matches('/');
    let endpoint_path = endpoint_path.trim_start_matches('/');

    if base.ends_with("/v1") {
        format!("{base}/{endpoint_path}")
    } else {
        format!("{base}/v1/{endpoint_path}")
    }
}

#[cfg(test)]
mod tests {
    use super::{OpenAiCompatibleProvider, build_v1_url, map_http_error};
    use crate::domain::{GenerationRequest, LlmError};
    use crate::infra::llm::env::reader_from_pairs;
    use crate::infra::llm::{LlmProvider, PromptBuilder};
    use reqwest::StatusCode;
    use std::time::Duration;

    fn provider() -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::with_config(
            "openai_compatible",
            "test-key",
            "https://api.openai.com",
            "gpt-4o-mini",
            Duration::from_secs(2),
        )
        .expect("provider should build")
    }

    #[test]
    fn build_request_payload_uses_prompt_builder_output() {
        let request = GenerationRequest::create("neon racing");
        let prompt = PromptBuilder::build(&request);

        let payload = provider().build_request_payload(&request);

        assert_eq!(payload.model, "gpt-4o-mini");
        assert_eq!(payload.max_tokens, Some(4000));
        assert_eq!(payload.messages.len(), 2);
        assert_eq!(payload.messages[0].role, "system");
        assert_eq!(payload.messages[0].content, prompt.system);
        assert_eq!(payload.messages[1].role, "user");
        assert_eq!(payload.messages[1].content, prompt.user);
    }

    #[test]
    fn map_success_response_returns_message_content_verbatim() {
        let response = r#"{
          "id": "chatcmpl_01",
          "choices": [
            {
              "index": 0,
              "finish_reason": "stop",
              "message": {
                "role": "assistant",
                "content": "import pygame\n\npygame.init()\n"
              }
            }
          ]
        }"#;

        let code = provider()
            .map_success_response(response)
            .expect("response mapping should succeed");

        assert_eq!(code, "import pygame\n\npygame.init()\n");
    }

    #[test]
    fn map_success_response_accepts_content_array_parts() {
        let response = r#"{
          "choices": [
            {
              "message": {
                "content": [
                  { "type": "text", "text": "import pygame\n" },
                  { "type": "text", "text": "import random\n" }
                ]
              }
            }
          ]
        }"#;

        let code = provider()
            .map_success_response(response)
            .expect("array content parts should still parse");

        assert_eq!(code, "import pygame\nimport random\n");
    }

    #[test]
    fn map_success_response_rejects_empty_choices() {
        let error = provider()
            .map_success_response(r#"{"choices": []}"#)
            .expect_err("no choices should fail");

        assert!(matches!(
            error,
            LlmError::InvalidResponse { message }
            if message == "OpenAI-compatible response did not include any generated code"
        ));
    }

    #[test]
    fn map_http_error_maps_status_and_error_type() {
        let auth = map_http_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"type":"authentication_error","code":"invalid_api_key","message":"invalid key"}}"#,
        );
        let quota = map_http_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"type":"insufficient_quota","code":"insufficient_quota","message":"quota"}}"#,
        );
        let timeout = map_http_error(
            StatusCode::GATEWAY_TIMEOUT,
            r#"{"error":{"type":"server_timeout","code":"request_timeout","message":"timed out"}}"#,
        );
        let server = map_http_error(StatusCode::INTERNAL_SERVER_ERROR, "upstream\nexploded");

        assert!(matches!(auth, LlmError::Auth));
        assert!(matches!(quota, LlmError::RateLimited));
        assert!(matches!(timeout, LlmError::Timeout));
        assert!(matches!(
            server,
            LlmError::Transport { message }
            if message == "OpenAI-compatible API returned HTTP 500 Internal Server Error: upstream exploded"
        ));
    }

    #[test]
    fn from_env_vars_applies_overrides() {
        let read = reader_from_pairs(&[
            ("VIBR_OPENAI_API_KEY", "sk-test"),
            ("VIBR_OPENAI_PROVIDER_ID", "groq"),
            ("VIBR_OPENAI_MODEL", "llama-3.1-70b"),
            ("VIBR_OPENAI_BASE_URL", "https://api.groq.com/openai/v1"),
        ]);
        let provider = OpenAiCompatibleProvider::from_env_vars(&read)
            .expect("configuration should be valid")
            .expect("provider should be configured");

        assert_eq!(provider.provider_id(), "groq");
        assert_eq!(provider.model(), "llama-3.1-70b");
        assert_eq!(
            provider.endpoint_url(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn from_env_vars_returns_none_without_api_key() {
        let read = reader_from_pairs(&[("VIBR_OPENAI_MODEL", "gpt-4o")]);
        let provider =
            OpenAiCompatibleProvider::from_env_vars(&read).expect("missing key is not an error");

        assert!(provider.is_none());
    }

    #[test]
    fn with_config_rejects_empty_model() {
        let error = match OpenAiCompatibleProvider::with_config(
            "openai_compatible",
            "test-key",
            "https://api.openai.com",
            " ",
            Duration::from_secs(2),
        ) {
            Ok(_) => panic!("empty model should fail"),
            Err(error) => error,
        };

        assert!(matches!(
            error,
            LlmError::Validation { message }
            if message == "OpenAI-compatible model must not be empty"
        ));
    }

    #[test]
    fn build_v1_url_appends_v1_when_base_has_no_version_segment() {
        let url = build_v1_url("https://api.openai.com", "chat/completions");
        assert_eq!(url, "https://api.openai.com/v1/chat/completions");

        let url = build_v1_url("https://api.openai.com/", "/chat/completions");
        assert_eq!(url, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn build_v1_url_avoids_duplicate_v1_when_base_already_has_v1() {
        let url = build_v1_url("https://example.com/v1/", "chat/completions");
        assert_eq!(url, "https://example.com/v1/chat/completions");
    }
}
