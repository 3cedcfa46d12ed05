//! Anthropic native transport.
//!
//! Uses Anthropic's Messages API directly (not an OpenAI-compatible proxy).
//!
//! Differences from the OpenAI wire format:
//! - `x-api-key` header authentication (not Bearer) plus `anthropic-version`
//! - System prompt as a top-level field
//! - Tool use and tool results as `tool_use` / `tool_result` content blocks

use async_trait::async_trait;
use codewright_core::error::TransportError;
use codewright_core::message::{Message, Role};
use codewright_core::tool::{ToolCall, ToolSpec};
use codewright_core::transport::{ChatResponse, ModelSettings, Transport, Usage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic Messages API transport.
pub struct AnthropicTransport {
    base_url: String,
    api_key: String,
    settings: ModelSettings,
    client: reqwest::Client,
}

impl AnthropicTransport {
    pub fn new(api_key: impl Into<String>, settings: ModelSettings) -> Result<Self, TransportError> {
        Ok(Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client: http::client(settings.timeout_secs)?,
            settings,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Anthropic puts the system prompt in a top-level field, not in messages.
    fn extract_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
        let (system, rest): (Vec<&Message>, Vec<&Message>) =
            messages.iter().partition(|m| m.role == Role::System);

        let system = if system.is_empty() {
            None
        } else {
            Some(
                system
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            )
        };
        (system, rest)
    }

    /// Convert messages to content-block form.
    ///
    /// A tool message answers every `tool_use` of the preceding assistant
    /// message, so it expands to one `tool_result` block per pending call.
    fn to_api_messages(messages: &[&Message]) -> Vec<AnthropicMessage> {
        let mut result = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for msg in messages {
            match msg.role {
                Role::User => {
                    result.push(AnthropicMessage {
                        role: "user".into(),
                        content: AnthropicContent::Text(msg.content.clone()),
                    });
                }
                Role::Assistant if msg.tool_calls.is_empty() => {
                    result.push(AnthropicMessage {
                        role: "assistant".into(),
                        content: AnthropicContent::Text(msg.content.clone()),
                    });
                }
                Role::Assistant => {
                    let mut blocks = Vec::new();
                    if !msg.content.is_empty() {
                        blocks.push(ContentBlock::Text {
                            text: msg.content.clone(),
                        });
                    }
                    pending.clear();
                    for tc in &msg.tool_calls {
                        pending.push(tc.id.clone());
                        let input = match &tc.arguments {
                            serde_json::Value::Object(_) => tc.arguments.clone(),
                            other => serde_json::json!({ "input": other }),
                        };
                        blocks.push(ContentBlock::ToolUse {
                            id: tc.id.clone(),
                            name: tc.name.clone(),
                            input,
                        });
                    }
                    result.push(AnthropicMessage {
                        role: "assistant".into(),
                        content: AnthropicContent::Blocks(blocks),
                    });
                }
                Role::Tool => {
                    let ids = if pending.is_empty() {
                        vec![msg.tool_call_id.clone().unwrap_or_default()]
                    } else {
                        std::mem::take(&mut pending)
                    };
                    let blocks = ids
                        .into_iter()
                        .map(|tool_use_id| ContentBlock::ToolResult {
                            tool_use_id,
                            content: msg.content.clone(),
                        })
                        .collect();
                    result.push(AnthropicMessage {
                        role: "user".into(),
                        content: AnthropicContent::Blocks(blocks),
                    });
                }
                Role::System => {} // handled separately
            }
        }

        result
    }

    fn to_api_tools(tools: &[ToolSpec]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.parameters.clone(),
            })
            .collect()
    }

    fn normalize(resp: AnthropicResponse) -> Result<ChatResponse, TransportError> {
        if resp.content.is_empty() {
            return Err(TransportError::EmptyResponse);
        }

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for (i, block) in resp.content.into_iter().enumerate() {
            match block {
                ResponseContentBlock::Text { text: part } => {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&part);
                }
                ResponseContentBlock::ToolUse { id, name, input } => {
                    let id = id.filter(|id| !id.is_empty()).unwrap_or_else(|| format!("call_{i}"));
                    let arguments = crate::openai_compat::parse_arguments(&name, input);
                    tool_calls.push(ToolCall::new(id, name, arguments));
                }
                ResponseContentBlock::Other => {}
            }
        }

        let usage = resp
            .usage
            .map(|u| Usage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();

        Ok(ChatResponse {
            content: text,
            tool_calls,
            usage,
            model: resp.model.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl Transport for AnthropicTransport {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<ChatResponse, TransportError> {
        let url = format!("{}/v1/messages", self.base_url);
        let (system, messages) = Self::extract_system(messages);

        let mut body = serde_json::json!({
            "model": self.settings.model,
            "messages": Self::to_api_messages(&messages),
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
        });

        if let Some(sys) = system {
            body["system"] = serde_json::json!(sys);
        }

        if !tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(tools));
        }

        debug!(provider = "anthropic", model = %self.settings.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(http::classify)?;

        let text = http::success_body(response).await?;
        let api_resp: AnthropicResponse =
            serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))?;

        Self::normalize(api_resp)
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<ResponseContentBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        id: Option<String>,
        name: String,
        #[serde(default)]
        input: Option<serde_json::Value>,
    },
    /// Thinking and any future block types
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}
