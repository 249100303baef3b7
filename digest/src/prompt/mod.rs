pub(crate) mod anthropic;
pub mod classify;
pub mod summarize;

use async_trait::async_trait;

use crate::error::AppResult;

pub use anthropic::AnthropicClient;

/// One single-turn completion: optional system instruction plus a user prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
}

/// A language model that turns one prompt into generated text.
/// No state is kept between calls.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> AppResult<String>;
}
