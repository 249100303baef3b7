use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    digest_config::{ApiConfig, ModelConfig, RetryConfig},
    error::{AppError, AppResult},
    rate_limiters::PromptRateLimiter,
    util::with_retry,
    HttpClient,
};

use super::{CompletionProvider, CompletionRequest};

#[derive(Debug, Serialize, Deserialize)]
pub struct PromptUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesApiResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
    pub usage: PromptUsage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesApiErrorDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesApiError {
    pub error: MessagesApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessagesApiResponseOrError {
    Response(MessagesApiResponse),
    Error(MessagesApiError),
}

/// Client for the Anthropic Messages API
#[derive(Clone)]
pub struct AnthropicClient {
    http_client: HttpClient,
    endpoint: String,
    api_key: String,
    api_version: String,
    model_id: String,
    temperature: f64,
    rate_limiter: PromptRateLimiter,
    retry: RetryConfig,
}

impl AnthropicClient {
    pub fn new(
        http_client: HttpClient,
        api: &ApiConfig,
        model: &ModelConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            http_client,
            endpoint: format!("{}/v1/messages", api.base_url.trim_end_matches('/')),
            api_key: api.key.clone(),
            api_version: api.version.clone(),
            model_id: model.id.clone(),
            temperature: model.temperature,
            rate_limiter: PromptRateLimiter::from_limits(&api.prompt_limits),
            retry,
        }
    }

    async fn send(&self, request: &CompletionRequest) -> AppResult<String> {
        let mut body = json!({
            "model": &self.model_id,
            "max_tokens": request.max_tokens,
            "temperature": self.temperature,
            "messages": [
                {
                    "role": "user",
                    "content": &request.prompt
                }
            ]
        });
        if let Some(system) = &request.system {
            body["system"] = json!(system);
        }

        self.rate_limiter.acquire_one().await;

        let resp = self
            .http_client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let resp = resp.json::<serde_json::Value>().await.map_err(|e| {
            if status.is_success() {
                AppError::Internal(e.into())
            } else {
                AppError::from_status(status, e.to_string())
            }
        })?;

        let parsed = serde_json::from_value::<MessagesApiResponseOrError>(resp.clone())
            .context(format!("Could not parse messages response: {}", resp))?;

        match parsed {
            MessagesApiResponseOrError::Error(MessagesApiError { error }) => {
                Err(self.map_api_error(status, error))
            }
            MessagesApiResponseOrError::Response(parsed) => {
                tracing::debug!(
                    "Completion used {} input / {} output tokens (stop: {:?})",
                    parsed.usage.input_tokens,
                    parsed.usage.output_tokens,
                    parsed.stop_reason
                );
                Ok(parsed
                    .content
                    .into_iter()
                    .filter(|block| block.kind == "text")
                    .filter_map(|block| block.text)
                    .collect::<Vec<_>>()
                    .join(""))
            }
        }
    }

    fn map_api_error(&self, status: StatusCode, error: MessagesApiErrorDetail) -> AppError {
        tracing::warn!(
            "Messages API error ({}): {:?} [{}]",
            status,
            error,
            self.rate_limiter.get_status()
        );
        match error.kind.as_str() {
            "rate_limit_error" => {
                self.rate_limiter.trigger_backoff();
                AppError::TooManyRequests
            }
            "overloaded_error" | "api_error" | "timeout_error" => {
                AppError::Transient(error.message)
            }
            "authentication_error" | "permission_error" => AppError::Auth(error.message),
            "not_found_error" => AppError::NotFound(error.message),
            _ => AppError::BadRequest(error.message),
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> AppResult<String> {
        let request = &request;
        with_retry(&self.retry, "messages.create", || self.send(request)).await
    }
}
