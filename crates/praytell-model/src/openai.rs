use crate::types::*;
use async_trait::async_trait;
use praytell_core::{Completion, CompletionRequest, Error, Result};
use praytell_telemetry::{CompletionSpanAttributes, safe_serialize, trace_completion_call};
use reqwest::Client;
use std::time::Duration;

/// OpenAI configuration
#[derive(Clone, Debug)]
pub struct OpenAIConfig {
    /// Model name for text generation
    pub model: String,
    /// Base URL for API requests
    pub base_url: String,
    /// Bound on a single completion request
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Create default configuration
    pub fn default(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Create configuration with custom base URL (e.g., for Ollama)
    pub fn with_base_url(model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default(model)
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Completion adapter for OpenAI-compatible chat-completions endpoints
pub struct OpenAICompletion {
    client: Client,
    api_key: String,
    config: OpenAIConfig,
}

impl OpenAICompletion {
    pub fn new(api_key: impl Into<String>, config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
        })
    }

    pub fn builder() -> OpenAIBuilder {
        OpenAIBuilder::new()
    }

    fn build_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Convert prompt messages to OpenAI request format
    fn build_request(&self, request: &CompletionRequest) -> OpenAIRequest {
        OpenAIRequest {
            model: self.config.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: request.max_tokens,
        }
    }

    fn describe(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::completion(format!(
                "Request timed out after {:?}",
                self.config.timeout
            ))
        } else {
            Error::completion(format!("Request failed: {}", err))
        }
    }
}

/// Pull the reply text out of a response.
///
/// A refusal is reply text; missing choices or content is malformed.
fn extract_reply(response: &OpenAIResponse) -> Result<String> {
    let choice = response
        .choices
        .first()
        .ok_or_else(|| Error::completion("Response contained no choices"))?;

    match (&choice.message.content, &choice.message.refusal) {
        (Some(content), _) if !content.trim().is_empty() => Ok(content.clone()),
        (_, Some(refusal)) => {
            tracing::info!(model = %response.model, "Completion refused by model");
            Ok(refusal.clone())
        }
        _ => Err(Error::completion("Response contained no message content")),
    }
}

#[async_trait]
impl Completion for OpenAICompletion {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let openai_req = self.build_request(&request);

        tracing::debug!(
            model = %self.config.model,
            messages = openai_req.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(self.build_url())
            .bearer_auth(&self.api_key)
            .json(&openai_req)
            .send()
            .await
            .map_err(|e| self.describe(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::completion_status(
                status.as_u16(),
                format!("OpenAI API error {}: {}", status, error_text),
            ));
        }

        let openai_resp: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| Error::completion(format!("Failed to parse response: {}", e)))?;

        let reply = extract_reply(&openai_resp)?;

        trace_completion_call(CompletionSpanAttributes {
            model: self.config.model.clone(),
            request_json: safe_serialize(&openai_req),
            response_text: reply.clone(),
            max_tokens: request.max_tokens.map(i64::from),
            completion_tokens: openai_resp.usage.as_ref().map(|u| i64::from(u.completion_tokens)),
        });

        Ok(reply)
    }
}

/// Builder for OpenAICompletion
pub struct OpenAIBuilder {
    api_key: Option<String>,
    config: Option<OpenAIConfig>,
}

impl OpenAIBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            api_key: None,
            config: None,
        }
    }

    /// Set API key
    pub fn with_api_key(mut self, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self.config = Some(OpenAIConfig::default(model));
        self
    }

    /// Set custom configuration
    pub fn with_config(mut self, config: OpenAIConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the adapter
    pub fn build(self) -> Result<OpenAICompletion> {
        let api_key = self
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::config_error("API key is required"))?;
        let config = self
            .config
            .ok_or_else(|| Error::config_error("Configuration is required"))?;

        OpenAICompletion::new(api_key, config)
    }
}

impl Default for OpenAIBuilder {
    fn default() -> Self {
        Self::new()
    }
}
