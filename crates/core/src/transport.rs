//! Transport trait: the abstraction over model-serving backends.
//!
//! A Transport knows how to send a conversation plus the callable tool surface
//! to a model and normalize whatever comes back into one [`ChatResponse`].
//!
//! Implementations: OpenAI-compatible, Anthropic, and a fully mocked backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::message::Message;
use crate::tool::{ToolCall, ToolSpec};

/// Token usage information. Missing usage from a backend is reported as zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Sum two usage records.
    pub fn add(self, other: Usage) -> Usage {
        Usage {
            prompt_tokens: self.prompt_tokens.saturating_add(other.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_add(other.completion_tokens),
            total_tokens: self.total_tokens.saturating_add(other.total_tokens),
        }
    }
}

/// A normalized, complete response from a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Text content (empty when the model only requested tools)
    pub content: String,

    /// Requested tool calls, in the order the model listed them
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    #[serde(default)]
    pub usage: Usage,

    /// Which model actually responded (may differ from requested)
    #[serde(default)]
    pub model: String,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            usage: Usage::default(),
            model: String::new(),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Model parameters shared by every network transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Request timeout; expiry surfaces as [`TransportError::Timeout`].
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4".into(),
            temperature: 0.7,
            max_tokens: 4000,
            timeout_secs: 120,
        }
    }
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// The core Transport trait.
///
/// The orchestration loop and planner call `chat()` without knowing which
/// backend is behind it. Implementations must never return a degraded
/// response on failure: connection problems, non-success statuses and empty
/// candidate lists are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// A human-readable name for this transport (e.g., "openai", "mock").
    fn name(&self) -> &str;

    /// Send the conversation and tool specs; get one normalized response.
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<ChatResponse, TransportError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Default implementation calls `chat()` and wraps the result as a single chunk.
    async fn stream(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<tokio::sync::mpsc::Receiver<Result<StreamChunk, TransportError>>, TransportError>
    {
        let response = self.chat(messages, tools).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx
            .send(Ok(StreamChunk {
                content: Some(response.content),
                tool_calls: response.tool_calls,
                done: true,
                usage: Some(response.usage),
            }))
            .await;
        Ok(rx)
    }
}
