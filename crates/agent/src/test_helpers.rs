//! Shared test helpers.

use std::collections::VecDeque;
use std::sync::Mutex;

use codewright_core::error::TransportError;
use codewright_core::message::Message;
use codewright_core::tool::{ToolCall, ToolSpec};
use codewright_core::transport::{ChatResponse, Transport, Usage};

/// A transport that replays scripted responses in order and records the
/// messages of every request. Runs dry with `EmptyResponse`.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<ChatResponse, TransportError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<ChatResponse, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn text_only(text: &str) -> Self {
        Self::new(vec![Ok(Self::text_response(text))])
    }

    pub fn tool_then_answer(calls: Vec<ToolCall>, answer: &str) -> Self {
        Self::new(vec![
            Ok(Self::tool_response(calls)),
            Ok(Self::text_response(answer)),
        ])
    }

    pub fn text_response(text: &str) -> ChatResponse {
        ChatResponse {
            usage: Usage::new(10, 5),
            model: "scripted".into(),
            ..ChatResponse::text(text)
        }
    }

    pub fn tool_response(calls: Vec<ToolCall>) -> ChatResponse {
        ChatResponse {
            tool_calls: calls,
            ..Self::text_response("")
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(
        &self,
        messages: &[Message],
        _tools: &[ToolSpec],
    ) -> Result<ChatResponse, TransportError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(TransportError::EmptyResponse))
    }
}
