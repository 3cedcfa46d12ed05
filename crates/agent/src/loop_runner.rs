//! The orchestration loop: one user turn, at most one tool round-trip.

use std::sync::Arc;

use codewright_core::message::{Conversation, Message};
use codewright_core::tool::{Dispatcher, ToolRegistry, ToolResult};
use codewright_core::transport::{ChatResponse, Transport, Usage};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Where a turn is. A turn without tool calls goes straight from
/// `AwaitingModel` to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    AwaitingModel,
    ExecutingTools,
    AwaitingFinalModel,
    Done,
}

/// What one completed turn produced.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// The final assistant text, exactly as the model returned it.
    pub message: String,
    /// One result per requested tool call, in request order.
    pub tools_used: Vec<ToolResult>,
    /// Usage reported by the last transport call.
    pub usage: Usage,
    pub transport_calls: usize,
    /// States visited, ending in [`LoopState::Done`].
    pub states: Vec<LoopState>,
}

/// Drives a single turn against the transport and the tool registry.
pub struct AgentLoop {
    transport: Arc<dyn Transport>,
    tools: Arc<ToolRegistry>,
    system_prompt: Option<String>,
}

impl AgentLoop {
    pub fn new(transport: Arc<dyn Transport>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            transport,
            tools,
            system_prompt: None,
        }
    }

    /// Prepend a system message to every request. It is never stored in
    /// the conversation.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    fn request_messages(&self, conversation: &Conversation) -> Vec<Message> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::system(prompt));
        }
        messages.extend_from_slice(conversation.messages());
        messages
    }

    async fn call(&self, conversation: &Conversation) -> Result<ChatResponse, codewright_core::Error> {
        let messages = self.request_messages(conversation);
        let specs = self.tools.specs();
        debug!(
            transport = self.transport.name(),
            messages = messages.len(),
            tools = specs.len(),
            "Calling model"
        );
        Ok(self.transport.chat(&messages, &specs).await?)
    }

    /// Run one turn for `input`.
    ///
    /// The user message is appended first and stays in the conversation even
    /// when the transport fails. Tool failures are captured as failure
    /// results; only transport errors abort the turn.
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        input: &str,
    ) -> Result<TurnOutcome, codewright_core::Error> {
        info!(
            conversation_id = %conversation.id,
            messages = conversation.len(),
            "Processing turn"
        );

        conversation.push(Message::user(input));
        let mut states = vec![LoopState::AwaitingModel];

        let first = self.call(conversation).await?;
        if !first.has_tool_calls() {
            conversation.push(Message::assistant(first.content.clone()));
            states.push(LoopState::Done);
            return Ok(TurnOutcome {
                message: first.content,
                tools_used: Vec::new(),
                usage: first.usage,
                transport_calls: 1,
                states,
            });
        }

        states.push(LoopState::ExecutingTools);
        debug!(tool_count = first.tool_calls.len(), "Executing tool calls");

        let mut dispatcher = Dispatcher::new(&self.tools);
        let mut results = Vec::with_capacity(first.tool_calls.len());
        for call in &first.tool_calls {
            results.push(dispatcher.execute(call).await);
        }

        let results_json = serde_json::to_string(&results)?;
        let first_call_id = first.tool_calls.first().map(|c| c.id.clone());
        conversation.push_tool_exchange(
            Message::assistant_with_calls(first.content, first.tool_calls),
            Message::tool_result(first_call_id, results_json),
        );

        states.push(LoopState::AwaitingFinalModel);
        let last = self.call(conversation).await?;
        if last.has_tool_calls() {
            warn!(
                conversation_id = %conversation.id,
                ignored = last.tool_calls.len(),
                "Model requested more tools after the tool round-trip; ignoring them"
            );
        }

        conversation.push(Message::assistant(last.content.clone()));
        states.push(LoopState::Done);

        Ok(TurnOutcome {
            message: last.content,
            tools_used: results,
            usage: last.usage,
            transport_calls: 2,
            states,
        })
    }
}
