use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::types::Message;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_MAX_TOKENS: i32 = 500;

/// Lazy, finite sequence of text fragments for one completion.
pub type TokenStream = BoxStream<'static, Result<String>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
    pub streaming: bool,
}

impl LLMConfig {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_owned(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            streaming: true,
        }
    }
}

/// Model side of the transport: a streamed chat completion over a full history.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Start a completion and hand back its fragments as they arrive
    async fn stream_chat(&self, messages: &[Message]) -> Result<TokenStream>;
}

/// Chat UI side of the transport: one outgoing message built up fragment by fragment.
#[async_trait]
pub trait ChatSink: Send {
    /// Create an empty outgoing message
    async fn begin(&mut self) -> Result<()>;

    /// Append one fragment to the outgoing message
    async fn stream_token(&mut self, token: &str) -> Result<()>;

    /// Finalize the outgoing message
    async fn finish(&mut self) -> Result<()>;
}
