//! Language-model gateway.
//!
//! This module sends a single-message prompt to an OpenAI-compatible
//! chat-completion endpoint and hands back the decoded response or a typed
//! failure.
//!
//! # Architecture
//!
//! - [`ChatGateway`]: Core trait defining one async completion call
//! - [`OpenAiGateway`]: `reqwest` implementation against the configured endpoint
//!
//! Every other component talks to the model through [`ChatGateway`], so tests
//! swap in a scripted fake.
//!
//! # Failure policy
//!
//! A failed call is reported immediately: there are no retries and no backoff.
//! Whether the failure halts the wizard is decided by the caller.

use crate::config::{ConfigError, WizardConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// The two model variants the wizard chooses between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Cheaper, faster model used for most calls.
    Fast,
    /// Stronger model used for long articles.
    Strong,
}

/// Failure of a single completion call.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid completion request: {0}")]
    InvalidRequest(&'static str),
    #[error("transport error calling the language model: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("language model returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("could not decode language model response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// The provider's chat-completion JSON, reduced to the parts the wizard reads.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    /// Build a response carrying a single assistant message.
    #[cfg(test)]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            model: None,
            choices: vec![ChatChoice {
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content: text.into(),
                },
            }],
        }
    }

    /// `choices[0].message.content`, if present.
    pub fn content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }

    /// Like [`ChatResponse::content`] but a missing choice is a decode error.
    pub fn text(&self) -> Result<&str, GatewayError> {
        self.content()
            .ok_or_else(|| GatewayError::Decode("response contained no choices".to_string()))
    }
}

/// One completion call against a hosted language model.
pub trait ChatGateway {
    /// Send `prompt` as a single user message.
    async fn complete(
        &self,
        prompt: &str,
        model: ModelTier,
        max_tokens: u32,
    ) -> Result<ChatResponse, GatewayError>;
}

impl<T: ChatGateway> ChatGateway for &T {
    async fn complete(
        &self,
        prompt: &str,
        model: ModelTier,
        max_tokens: u32,
    ) -> Result<ChatResponse, GatewayError> {
        (**self).complete(prompt, model, max_tokens).await
    }
}

/// Check the call constraints shared by every gateway implementation.
pub fn validate_request(prompt: &str, max_tokens: u32) -> Result<(), GatewayError> {
    if prompt.trim().is_empty() {
        return Err(GatewayError::InvalidRequest("prompt is empty"));
    }
    if max_tokens == 0 {
        return Err(GatewayError::InvalidRequest("max_tokens must be positive"));
    }
    Ok(())
}

/// [`ChatGateway`] backed by an OpenAI-compatible HTTP endpoint.
#[derive(Clone)]
pub struct OpenAiGateway {
    client: Client,
    endpoint: String,
    fast_model: String,
    strong_model: String,
    temperature: f32,
    api_key: String,
}

impl fmt::Debug for OpenAiGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiGateway")
            .field("endpoint", &self.endpoint)
            .field("fast_model", &self.fast_model)
            .field("strong_model", &self.strong_model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl OpenAiGateway {
    /// Build the gateway. A missing API key is a fatal configuration error.
    pub fn new(
        client: Client,
        config: &WizardConfig,
        api_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = crate::config::credential(api_key)
            .ok_or(ConfigError::MissingCredential("OPENAI_API_KEY"))?;
        Ok(Self {
            client,
            endpoint: config.chat_endpoint.clone(),
            fast_model: config.fast_model.clone(),
            strong_model: config.strong_model.clone(),
            temperature: config.temperature,
            api_key,
        })
    }

    pub fn model_name(&self, model: ModelTier) -> &str {
        match model {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Strong => &self.strong_model,
        }
    }
}

impl ChatGateway for OpenAiGateway {
    #[instrument(level = "info", skip_all, fields(?model, max_tokens = max_tokens))]
    async fn complete(
        &self,
        prompt: &str,
        model: ModelTier,
        max_tokens: u32,
    ) -> Result<ChatResponse, GatewayError> {
        validate_request(prompt, max_tokens)?;

        let t0 = Instant::now();
        let request = ChatRequest {
            model: self.model_name(model),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens,
            temperature: self.temperature,
        };
        debug!(prompt_chars = prompt.chars().count(), "Sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, "Completion request failed in transport"))?;

        let status = response.status();
        let body = response.text().await?;
        let dt = t0.elapsed();

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                elapsed_ms = dt.as_millis() as u64,
                body = %crate::utils::truncate_for_log(&body, 300),
                "Completion request rejected"
            );
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        info!(
            elapsed_ms = dt.as_millis() as u64,
            model = parsed.model.as_deref().unwrap_or(request.model),
            "Completion succeeded"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serve_canned;

    #[test]
    fn test_response_content() {
        let json = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Bonjour"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.content(), Some("Bonjour"));
        assert_eq!(response.model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_response_without_choices_is_decode_error() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(response.content().is_none());
        assert!(matches!(response.text(), Err(GatewayError::Decode(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Salut".to_string(),
            }],
            max_tokens: 1000,
            temperature: 0.7,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "Salut");
        assert_eq!(value["max_tokens"], 1000);
    }

    #[test]
    fn test_validate_request() {
        assert!(validate_request("prompt", 10).is_ok());
        assert!(matches!(
            validate_request("   ", 10),
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate_request("prompt", 0),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let config = WizardConfig::default();
        let err = OpenAiGateway::new(Client::new(), &config, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential("OPENAI_API_KEY")));
        let err = OpenAiGateway::new(Client::new(), &config, Some(String::new())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential(_)));
    }

    fn gateway_for(endpoint: String) -> OpenAiGateway {
        let mut config = WizardConfig::default();
        config.chat_endpoint = endpoint;
        OpenAiGateway::new(Client::new(), &config, Some("sk-test".to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_error_status_keeps_the_body() {
        let base = serve_canned(500, "upstream exploded").await;
        let gateway = gateway_for(format!("{base}/v1/chat/completions"));

        match gateway.complete("Bonjour", ModelTier::Fast, 10).await {
            Err(GatewayError::Http { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("upstream exploded"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_success_is_a_decode_error() {
        let base = serve_canned(200, "not json").await;
        let gateway = gateway_for(format!("{base}/v1/chat/completions"));

        let err = gateway.complete("Bonjour", ModelTier::Fast, 10).await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[tokio::test]
    async fn test_completion_round_trip() {
        let base = serve_canned(
            200,
            r#"{"model": "gpt-4o-mini", "choices": [{"message": {"role": "assistant", "content": "Salut"}}]}"#,
        )
        .await;
        let gateway = gateway_for(format!("{base}/v1/chat/completions"));

        let response = gateway.complete("Bonjour", ModelTier::Fast, 10).await.unwrap();
        assert_eq!(response.text().unwrap(), "Salut");
    }

    #[test]
    fn test_model_tiers_map_to_configured_names() {
        let config = WizardConfig::default();
        let gateway = OpenAiGateway::new(Client::new(), &config, Some("sk-test".to_string())).unwrap();
        assert_eq!(gateway.model_name(ModelTier::Fast), "gpt-4o-mini");
        assert_eq!(gateway.model_name(ModelTier::Strong), "gpt-4o");
        assert!(!format!("{gateway:?}").contains("sk-test"));
    }
}
