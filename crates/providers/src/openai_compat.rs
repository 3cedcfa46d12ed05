//! OpenAI-compatible transport.
//!
//! Works with: OpenAI, OpenRouter, Ollama, and any endpoint exposing an
//! OpenAI-style `/chat/completions` route.
//!
//! Providers disagree on details of the response shape, so decoding goes
//! through loosely-typed structs and [`normalize`]:
//! - `content` may be a string, `null`, or an array of `{type: "text", text}` parts
//! - tool-call `arguments` may be a JSON-encoded string or an inline object
//! - tool-call ids and `usage` may be missing

use async_trait::async_trait;
use codewright_core::error::TransportError;
use codewright_core::message::{Message, Role};
use codewright_core::tool::{ToolCall, ToolSpec};
use codewright_core::transport::{ChatResponse, ModelSettings, Transport, Usage};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::http;

/// An OpenAI-compatible model transport.
pub struct OpenAiCompatTransport {
    name: String,
    base_url: String,
    api_key: Option<String>,
    settings: ModelSettings,
    client: reqwest::Client,
}

impl OpenAiCompatTransport {
    /// Create a new OpenAI-compatible transport.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        settings: ModelSettings,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client: http::client(settings.timeout_secs)?,
            settings,
        })
    }

    /// OpenAI (convenience constructor).
    pub fn openai(api_key: Option<String>, settings: ModelSettings) -> Result<Self, TransportError> {
        Self::new("openai", "https://api.openai.com/v1", api_key, settings)
    }

    /// OpenRouter (convenience constructor).
    pub fn openrouter(
        api_key: Option<String>,
        settings: ModelSettings,
    ) -> Result<Self, TransportError> {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key, settings)
    }

    /// Ollama (convenience constructor). Ollama needs no key.
    pub fn ollama(base_url: Option<&str>, settings: ModelSettings) -> Result<Self, TransportError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            None,
            settings,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().into(),
                content: Some(m.content.clone()),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.to_string(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: match m.role {
                    Role::Tool => m.tool_call_id.clone(),
                    _ => None,
                },
            })
            .collect()
    }

    /// Convert tool specs to OpenAI API format.
    fn to_api_tools(tools: &[ToolSpec]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(&self, messages: &[Message], tools: &[ToolSpec]) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.settings.model,
            "messages": Self::to_api_messages(messages),
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
        });

        if !tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(tools));
        }
        body
    }
}

#[async_trait]
impl Transport for OpenAiCompatTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<ChatResponse, TransportError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(messages, tools);

        debug!(
            provider = %self.name,
            model = %self.settings.model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending completion request"
        );

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(http::classify)?;
        let text = http::success_body(response).await?;

        let api_response: ApiResponse =
            serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))?;

        normalize(&self.name, api_response)
    }
}

/// Turn a decoded OpenAI-style response into the common [`ChatResponse`].
fn normalize(provider: &str, api_response: ApiResponse) -> Result<ChatResponse, TransportError> {
    if api_response.choices.len() > 1 {
        warn!(
            provider,
            choices = api_response.choices.len(),
            "Multiple completion candidates; using the first"
        );
    }

    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or(TransportError::EmptyResponse)?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, tc)| {
            let id = tc
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{i}"));
            let arguments = parse_arguments(&tc.function.name, tc.function.arguments);
            ToolCall::new(id, tc.function.name, arguments)
        })
        .collect();

    let usage = api_response
        .usage
        .map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        content: content_text(choice.message.content),
        tool_calls,
        usage,
        model: api_response.model.unwrap_or_default(),
    })
}

/// Flatten a `content` field that may be a string, null, or a list of parts.
pub(crate) fn content_text(content: Option<serde_json::Value>) -> String {
    match content {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Array(parts)) => parts
            .iter()
            .filter_map(|p| match p {
                serde_json::Value::String(s) => Some(s.as_str()),
                other => other.get("text").and_then(|t| t.as_str()),
            })
            .collect::<Vec<_>>()
            .join(""),
        Some(other) => other.to_string(),
    }
}

/// Decode tool-call arguments. A string that is not valid JSON is kept
/// verbatim as a string value so the handler can report the problem.
pub(crate) fn parse_arguments(tool: &str, arguments: Option<serde_json::Value>) -> serde_json::Value {
    match arguments {
        None | Some(serde_json::Value::Null) => serde_json::json!({}),
        Some(serde_json::Value::String(raw)) if raw.trim().is_empty() => serde_json::json!({}),
        Some(serde_json::Value::String(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(tool, error = %e, "Tool arguments are not valid JSON; passing them through");
                serde_json::Value::String(raw)
            }
        },
        Some(inline) => inline,
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<serde_json::Value>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseToolCall {
    #[serde(default)]
    id: Option<String>,
    function: ApiResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ApiResponseFunction {
    name: String,
    #[serde(default)]
    arguments: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}
