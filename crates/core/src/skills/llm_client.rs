//! # Structured Extraction Client
//!
//! Sends a system/user prompt pair to an OpenAI-compatible chat completions
//! endpoint and returns the parsed JSON object.
//!
//! The first attempt asks for `response_format: {"type": "json_object"}`.
//! Providers that reject the hint (400/422) get the same prompts once more
//! without it. Any other failure is returned as-is; there is no retry.

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::LlmSettings;
use crate::skills::extract::parse_structured;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One extraction call
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// JSON schema of the expected object
    pub response_schema: Option<serde_json::Value>,
    pub temperature: f32,
    /// Overrides the client's configured model
    pub model: Option<String>,
}

/// Prompts in, a JSON object out
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> WorkflowResult<serde_json::Value>;
}

/// Chat completions client
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    settings: LlmSettings,
}

impl OpenAiClient {
    pub fn new(settings: LlmSettings) -> WorkflowResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| {
                WorkflowError::Configuration(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self { client, settings })
    }

    /// Client built from the secrets file and environment
    pub fn from_env() -> WorkflowResult<Self> {
        Self::new(LlmSettings::from_env()?)
    }

    /// Use a different model than the resolved default
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.settings.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn system_message(request: &ExtractionRequest) -> String {
        match &request.response_schema {
            Some(schema) => format!(
                "{}\n\nThe JSON object must conform to this JSON schema:\n{}",
                request.system_prompt.trim_end(),
                schema
            ),
            None => request.system_prompt.clone(),
        }
    }

    fn build_body(&self, request: &ExtractionRequest, json_mode: bool) -> ChatRequest {
        ChatRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.settings.model.clone()),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Self::system_message(request),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user_prompt.clone(),
                },
            ],
            temperature: request.temperature,
            response_format: json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }

    /// Single HTTP round trip, returning the raw status on failure
    async fn send_once(&self, body: &ChatRequest) -> Result<String, (Option<StatusCode>, String)> {
        let url = format!("{}/chat/completions", self.settings.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.settings.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| (e.status(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err((Some(status), error_body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| (None, format!("failed to decode chat response: {e}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    /// Raw completion text, with the response-format fallback applied
    pub async fn complete(&self, request: &ExtractionRequest) -> WorkflowResult<String> {
        let body = self.build_body(request, true);

        tracing::debug!(
            model = %body.model,
            system_chars = body.messages[0].content.len(),
            user_chars = body.messages[1].content.len(),
            "Sending extraction request"
        );

        match self.send_once(&body).await {
            Ok(text) => Ok(text),
            Err((Some(status), message))
                if status == StatusCode::BAD_REQUEST
                    || status == StatusCode::UNPROCESSABLE_ENTITY =>
            {
                tracing::warn!(
                    status = status.as_u16(),
                    error = %message,
                    "Provider rejected response_format; retrying without it"
                );
                let plain = self.build_body(request, false);
                self.send_once(&plain).await.map_err(into_request_error)
            }
            Err(err) => Err(into_request_error(err)),
        }
    }
}

#[async_trait]
impl StructuredExtractor for OpenAiClient {
    async fn extract(&self, request: &ExtractionRequest) -> WorkflowResult<serde_json::Value> {
        let text = self.complete(request).await?;
        parse_structured(&text)
    }
}

fn into_request_error((status, message): (Option<StatusCode>, String)) -> WorkflowError {
    WorkflowError::Request {
        status: status.map(|s| s.as_u16()),
        message,
    }
}

// Chat completions wire types

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
