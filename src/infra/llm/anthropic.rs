use std::time::{Duration, Instant};

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::domain::{GenerationRequest, LlmError};

use super::env::{
    DEFAULT_TIMEOUT, ENV_GLOBAL_TIMEOUT_SECS, EnvReader, read_api_key,
    read_non_empty, read_timeout, resolve_timeout_with_global_fallback,
};
use super::response_parsing::{require_source_text, truncate_message};
use super::{LlmProvider, PromptBuilder};

const PROVIDER_ID: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
const DEFAULT_MAX_TOKENS: u16 = 4000;
const ENV_API_KEY: &str = "VIBR_ANTHROPIC_API_KEY";
const ENV_API_KEY_FALLBACK: &str = "ANTHROPIC_API_KEY";
const ENV_BASE_URL: &str = "VIBR_ANTHROPIC_BASE_URL";
const ENV_MODEL: &str = "VIBR_ANTHROPIC_MODEL";
const ENV_TIMEOUT_SECS: &str = "VIBR_ANTHROPIC_TIMEOUT_SECS";

pub struct AnthropicProvider {
    api_key: String,
    api_base_url: String,
    model: String,
    client: Client,
}

impl AnthropicProvider {
    /// Returns `Ok(None)` when no API key is configured.
    pub(crate) fn from_env_vars(read: EnvReader<'_>) -> Result<Option<Self>, LlmError> {
        let Some(api_key) = read_api_key(read, ENV_API_KEY, ENV_API_KEY_FALLBACK)? else {
            return Ok(None);
        };
        let api_base_url =
            read_non_empty(read, ENV_BASE_URL)?.unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let model = read_non_empty(read, ENV_MODEL)?.unwrap_or_else(|| DEFAULT_MODEL.into());
        let timeout = resolve_timeout_with_global_fallback(
            read_timeout(read, ENV_TIMEOUT_SECS)?,
            || read_timeout(read, ENV_GLOBAL_TIMEOUT_SECS),
            DEFAULT_TIMEOUT,
        )?;
        Self::with_config(api_key, api_base_url, model, timeout).map(Some)
    }

    pub fn with_config(
        api_key: impl Into<String>,
        api_base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::validation("Anthropic API key must not be empty"));
        }

        let api_base_url = api_base_url.into();
        if api_base_url.trim().is_empty() {
            return Err(LlmError::validation(
                "Anthropic API base URL must not be empty",
            ));
        }

        let model = model.into();
        if model.trim().is_empty() {
            return Err(LlmError::validation("Anthropic model must not be empty"));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            LlmError::internal(format!("failed to create Anthropic HTTP client: {err}"))
        })?;

        Ok(Self {
            api_key,
            api_base_url,
            model: model.trim().to_string(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_url(&self) -> String {
        format!("{}/v1/messages", self.api_base_url.trim_end_matches('/'))
    }

    fn build_request_payload(&self, request: &GenerationRequest) -> AnthropicMessagesRequest {
        let prompt = PromptBuilder::build(request);

        AnthropicMessagesRequest {
            model: self.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system: prompt.system,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.user,
            }],
        }
    }

    fn map_success_response(&self, response_body: &str) -> Result<String, LlmError> {
        let response: AnthropicMessagesResponse =
            serde_json::from_str(response_body).map_err(|err| {
                LlmError::invalid_response(format!("Anthropic response decode failed: {err}"))
            })?;

        let joined_text = response
            .content
            .iter()
            .filter_map(AnthropicContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("");

        require_source_text("Anthropic", joined_text)
    }
}

impl LlmProvider for AnthropicProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let payload = self.build_request_payload(request);
        let started = Instant::now();

        let response = self
            .client
            .post(self.endpoint_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .map_err(map_transport_error)?;

        let status = response.status();
        let response_body = response.text().map_err(map_transport_error)?;
        debug!(
            "Anthropic responded with HTTP {status} after {} ms",
            started.elapsed().as_millis()
        );
        if !status.is_success() {
            return Err(map_http_error(status, &response_body));
        }

        self.map_success_response(&response_body)
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessagesRequest {
    model: String,
    max_tokens: u16,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicMessagesResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

impl AnthropicContentBlock {
    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Other => None,
        }
    }
}

fn map_http_error(status: StatusCode, body: &str) -> LlmError {
    let parsed_error = serde_json::from_str::<AnthropicErrorEnvelope>(body).ok();
    let error_type = parsed_error
        .as_ref()
        .and_then(|envelope| envelope.error.as_ref())
        .map(|detail| detail.error_type.as_str());

    if matches!(
        error_type,
        Some("authentication_error" | "permission_error")
    ) || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        return LlmError::Auth;
    }
    if matches!(error_type, Some("rate_limit_error")) || status == StatusCode::TOO_MANY_REQUESTS {
        return LlmError::RateLimited;
    }
    if matches!(error_type, Some("timeout_error"))
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::GATEWAY_TIMEOUT
    {
        return LlmError::Timeout;
    }

    let message = parsed_error
        .as_ref()
        .and_then(|envelope| envelope.error.as_ref())
        .map(|detail| detail.message.clone())
        .unwrap_or_else(|| truncate_message(body));
    LlmError::Transport {
        message: format!("Anthropic API returned HTTP {status}: {message}"),
    }
}

fn map_transport_error(error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        return LlmError::Timeout;
    }
    LlmError::Transport {
        message: format!("Anthropic transport error: {error}"),
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorEnvelope {
    #[serde(default)]
    error: Option<AnthropicErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::{AnthropicProvider, map_http_error};
    use crate::domain::{GenerationRequest, LlmError};
    use crate::infra::llm::env::reader_from_pairs;
    use reqwest::StatusCode;
    use std::time::Duration;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::with_config(
            "test-key",
            "https://api.anthropic.com",
            "claude-3-sonnet-20240229",
            Duration::from_secs(2),
        )
        .expect("provider should build")
    }

    #[test]
    fn build_request_payload_maps_generation_request() {
        let payload = provider().build_request_payload(&GenerationRequest::create("alien invasion"));

        assert_eq!(payload.model, "claude-3-sonnet-20240229");
        assert_eq!(payload.max_tokens, 4000);
        assert_eq!(payload.messages.len(), 1);
        assert_eq!(payload.messages[0].role, "user");
        assert_eq!(
            payload.messages[0].content,
            "Create a 2D game based on this description: alien invasion"
        );
        assert!(payload.system.contains("Pygame"));
    }

    #[test]
    fn build_request_payload_uses_update_prompt_for_existing_code() {
        let payload = provider().build_request_payload(&GenerationRequest::update(
            "import pygame",
            "make the player faster",
        ));

        assert!(
            payload.messages[0]
                .content
                .contains("Here's the current game code:\n\nimport pygame")
        );
        assert!(payload.system.contains("existing Python/Pygame code"));
    }

    #[test]
    fn map_success_response_joins_text_blocks_verbatim() {
        let response = r#"{
          "id": "msg_01",
          "stop_reason": "end_turn",
          "content": [
            { "type": "text", "text": "import pygame\n" },
            { "type": "tool_use", "id": "tool_1", "name": "noop", "input": {} },
            { "type": "text", "text": "pygame.init()\n" }
          ]
        }"#;

        let code = provider()
            .map_success_response(response)
            .expect("response mapping should succeed");

        assert_eq!(code, "import pygame\npygame.init()\n");
    }

    #[test]
    fn map_success_response_rejects_missing_text() {
        let error = provider()
            .map_success_response(r#"{"content": []}"#)
            .expect_err("empty content should fail");

        assert!(matches!(error, LlmError::InvalidResponse { .. }));

        let error = provider()
            .map_success_response("not json")
            .expect_err("malformed body should fail");
        assert!(matches!(
            error,
            LlmError::InvalidResponse { message }
            if message.starts_with("Anthropic response decode failed")
        ));
    }

    #[test]
    fn map_http_error_maps_status_and_error_type() {
        let auth = map_http_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"type":"authentication_error","message":"invalid key"}}"#,
        );
        let rate_limited = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"type":"rate_limit_error","message":"slow down"}}"#,
        );
        let timeout = map_http_error(
            StatusCode::GATEWAY_TIMEOUT,
            r#"{"error":{"type":"timeout_error","message":"timed out"}}"#,
        );
        let overloaded = map_http_error(
            StatusCode::from_u16(529).expect("529 is a valid status code"),
            r#"{"error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        );

        assert!(matches!(auth, LlmError::Auth));
        assert!(matches!(rate_limited, LlmError::RateLimited));
        assert!(matches!(timeout, LlmError::Timeout));
        assert!(matches!(
            overloaded,
            LlmError::Transport { message } if message.ends_with("Overloaded")
        ));
    }

    #[test]
    fn from_env_vars_returns_none_without_api_key() {
        let read = reader_from_pairs(&[("VIBR_ANTHROPIC_MODEL", "claude-3-haiku-20240307")]);
        let provider =
            AnthropicProvider::from_env_vars(&read).expect("missing key is not an error");

        assert!(provider.is_none());
    }

    #[test]
    fn from_env_vars_reads_fallback_key_and_model_override() {
        let read = reader_from_pairs(&[
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("VIBR_ANTHROPIC_MODEL", "claude-3-haiku-20240307"),
            ("VIBR_LLM_TIMEOUT_SECS", "30"),
        ]);
        let provider = AnthropicProvider::from_env_vars(&read)
            .expect("configuration should be valid")
            .expect("provider should be configured");

        assert_eq!(provider.model(), "claude-3-haiku-20240307");
        assert_eq!(provider.api_key, "sk-ant");
    }

    #[test]
    fn from_env_vars_rejects_invalid_timeout() {
        let read = reader_from_pairs(&[
            ("VIBR_ANTHROPIC_API_KEY", "sk-ant"),
            ("VIBR_ANTHROPIC_TIMEOUT_SECS", "soon"),
        ]);
        let error = match AnthropicProvider::from_env_vars(&read) {
            Ok(_) => panic!("invalid timeout should fail"),
            Err(error) => error,
        };

        assert!(matches!(
            error,
            LlmError::Validation { message }
            if message == "VIBR_ANTHROPIC_TIMEOUT_SECS must be a positive integer in seconds"
        ));
    }
}
