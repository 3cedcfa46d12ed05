//! The coding assistant facade: one conversation, two ways to answer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use codewright_config::AppConfig;
use codewright_core::message::{Conversation, Message};
use codewright_core::tool::{ToolRegistry, ToolResult, ToolSpec};
use codewright_core::transport::{Transport, Usage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::loop_runner::AgentLoop;
use crate::planner::{PlanOutcome, Planner};

/// How [`CodingAgent::chat`] answers by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Plan and run tools locally, without letting the model pick them.
    Intelligent,
    /// Let the model pick tools (one round-trip).
    Standard,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intelligent => f.write_str("intelligent"),
            Self::Standard => f.write_str("standard"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "intelligent" | "smart" => Ok(Self::Intelligent),
            "standard" => Ok(Self::Standard),
            other => Err(format!("unknown mode '{other}' (expected intelligent or standard)")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChatOptions {
    /// Use the orchestration loop even in intelligent mode.
    pub force_standard: bool,
}

/// A canned coding request turned into a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Task {
    Implement {
        description: String,
        #[serde(default)]
        files: Vec<String>,
        #[serde(default)]
        requirements: Vec<String>,
    },
    Fix {
        description: String,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        file: Option<String>,
    },
    Refactor {
        description: String,
        #[serde(default)]
        file: Option<String>,
    },
    General {
        description: String,
    },
}

impl Task {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Implement { .. } => "implement",
            Self::Fix { .. } => "fix",
            Self::Refactor { .. } => "refactor",
            Self::General { .. } => "general",
        }
    }

    pub fn prompt(&self) -> String {
        match self {
            Self::Implement {
                description,
                files,
                requirements,
            } => {
                let mut prompt = format!("Implement the following feature:\n\n{description}\n\n");
                if !files.is_empty() {
                    prompt.push_str(&format!("Files to modify: {}\n", files.join(", ")));
                }
                if !requirements.is_empty() {
                    let list: Vec<String> = requirements.iter().map(|r| format!("- {r}")).collect();
                    prompt.push_str(&format!("Requirements:\n{}\n", list.join("\n")));
                }
                prompt
            }
            Self::Fix {
                description,
                error,
                file,
            } => {
                let mut prompt = format!("Fix the following issue:\n\n{description}\n\n");
                if let Some(error) = error {
                    prompt.push_str(&format!("Error: {error}\n\n"));
                }
                if let Some(file) = file {
                    prompt.push_str(&format!("File: {file}\n"));
                }
                prompt
            }
            Self::Refactor { description, file } => {
                let mut prompt = format!("Refactor the following:\n\n{description}\n\n");
                if let Some(file) = file {
                    prompt.push_str(&format!("File: {file}\n"));
                }
                prompt
            }
            Self::General { description } => description.clone(),
        }
    }
}

/// What [`CodingAgent::chat`] returns.
#[derive(Debug, Clone, Serialize)]
pub struct AgentReply {
    pub message: String,
    pub mode: Mode,
    /// Tool results of a standard turn; empty for planned turns.
    pub tools_used: Vec<ToolResult>,
    pub usage: Usage,
    /// Set when the planner answered.
    pub plan: Option<PlanOutcome>,
}

/// Snapshot produced by [`CodingAgent::export_conversation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationExport {
    pub conversation: Conversation,
    #[serde(default)]
    pub context: serde_json::Map<String, serde_json::Value>,
    pub exported_at: DateTime<Utc>,
}

/// Owns the conversation and routes each message to the planner or the
/// orchestration loop.
pub struct CodingAgent {
    tools: Arc<ToolRegistry>,
    agent_loop: AgentLoop,
    planner: Planner,
    conversation: Conversation,
    mode: Mode,
    context: serde_json::Map<String, serde_json::Value>,
}

impl CodingAgent {
    pub fn new(transport: Arc<dyn Transport>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            agent_loop: AgentLoop::new(Arc::clone(&transport), Arc::clone(&tools)),
            planner: Planner::new(transport, Arc::clone(&tools)),
            tools,
            conversation: Conversation::new(),
            mode: Mode::Intelligent,
            context: serde_json::Map::new(),
        }
    }

    /// Wire the transport, the default tools and the mode from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, codewright_core::Error> {
        let transport = codewright_providers::build_transport(config)?;
        let tools = Arc::new(codewright_tools::default_registry(config.resolved_working_dir()));

        let mut agent = Self::new(transport, tools).with_mode(if config.intelligent_mode {
            Mode::Intelligent
        } else {
            Mode::Standard
        });
        if let Some(prompt) = &config.system_prompt {
            agent = agent.with_system_prompt(prompt);
        }
        Ok(agent)
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.agent_loop = self.agent_loop.with_system_prompt(prompt);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        info!(mode = %mode, "Agent mode changed");
        self.mode = mode;
    }

    pub async fn chat(
        &mut self,
        input: &str,
        options: ChatOptions,
    ) -> Result<AgentReply, codewright_core::Error> {
        if self.mode == Mode::Intelligent && !options.force_standard {
            self.conversation.push(Message::user(input));
            let outcome = self.planner.run(input).await;
            self.conversation.push(Message::assistant(outcome.message.clone()));
            return Ok(AgentReply {
                message: outcome.message.clone(),
                mode: Mode::Intelligent,
                tools_used: Vec::new(),
                usage: outcome.usage,
                plan: Some(outcome),
            });
        }

        let turn = self.agent_loop.run_turn(&mut self.conversation, input).await?;
        Ok(AgentReply {
            message: turn.message,
            mode: Mode::Standard,
            tools_used: turn.tools_used,
            usage: turn.usage,
            plan: None,
        })
    }

    pub async fn execute_task(&mut self, task: &Task) -> Result<AgentReply, codewright_core::Error> {
        info!(task = task.kind(), "Executing task");
        self.chat(&task.prompt(), ChatOptions::default()).await
    }

    pub fn set_context(&mut self, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        debug!(key = %key, "Context set");
        self.context.insert(key, value);
    }

    pub fn context(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.context
    }

    pub fn context_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.context.get(key)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn clear_history(&mut self) {
        self.conversation.clear();
        info!("Conversation history cleared");
    }

    pub fn export_conversation(&self) -> Result<serde_json::Value, codewright_core::Error> {
        let export = ConversationExport {
            conversation: self.conversation.clone(),
            context: self.context.clone(),
            exported_at: Utc::now(),
        };
        Ok(serde_json::to_value(export)?)
    }

    /// Replace history and context with a previous export.
    pub fn import_conversation(&mut self, data: serde_json::Value) -> Result<(), codewright_core::Error> {
        let export: ConversationExport = serde_json::from_value(data)?;
        self.conversation = export.conversation;
        self.context = export.context;
        info!(messages = self.conversation.len(), "Conversation imported");
        Ok(())
    }

    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.tools.specs()
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedTransport;
    use codewright_core::message::Role;
    use codewright_core::tool::ToolCall;

    fn tools() -> Arc<ToolRegistry> {
        Arc::new(
            ToolRegistry::builder()
                .handler("generate_code", "Generate code", serde_json::json!({}), |args| async move {
                    Ok(serde_json::json!({
                        "success": true,
                        "language": "javascript",
                        "code": format!("// {}", args["description"].as_str().unwrap_or_default())
                    }))
                })
                .build(),
        )
    }

    #[tokio::test]
    async fn intelligent_mode_records_input_and_summary() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let mut agent = CodingAgent::new(transport.clone(), tools());

        let reply = agent.chat("generate a parser", ChatOptions::default()).await.unwrap();
        assert_eq!(reply.mode, Mode::Intelligent);
        assert!(reply.message.starts_with("✅ Step 1 (generate_code) completed"));
        assert_eq!(transport.call_count(), 0);

        let history = agent.conversation().messages();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].content, reply.message);
    }

    #[tokio::test]
    async fn force_standard_uses_the_loop() {
        let call = ToolCall::new("c1", "generate_code", serde_json::json!({ "description": "x" }));
        let transport = Arc::new(ScriptedTransport::tool_then_answer(vec![call], "done"));
        let mut agent = CodingAgent::new(transport.clone(), tools());

        let reply = agent
            .chat("generate x", ChatOptions { force_standard: true })
            .await
            .unwrap();
        assert_eq!(reply.mode, Mode::Standard);
        assert_eq!(reply.message, "done");
        assert_eq!(reply.tools_used.len(), 1);
        assert!(reply.plan.is_none());
        assert_eq!(agent.conversation().len(), 4);
    }

    #[tokio::test]
    async fn standard_mode_by_default_after_switch() {
        let transport = Arc::new(ScriptedTransport::text_only("hi"));
        let mut agent = CodingAgent::new(transport, tools());
        agent.set_mode(Mode::Standard);
        let reply = agent.chat("hello", ChatOptions::default()).await.unwrap();
        assert_eq!(reply.message, "hi");
    }

    #[test]
    fn task_prompts() {
        let task = Task::Implement {
            description: "dark mode".into(),
            files: vec!["ui.js".into(), "theme.css".into()],
            requirements: vec!["toggle".into()],
        };
        assert_eq!(
            task.prompt(),
            "Implement the following feature:\n\ndark mode\n\nFiles to modify: ui.js, theme.css\nRequirements:\n- toggle\n"
        );

        let fix = Task::Fix {
            description: "crash".into(),
            error: Some("TypeError".into()),
            file: None,
        };
        assert!(fix.prompt().contains("Error: TypeError"));

        let general: Task = serde_json::from_value(serde_json::json!({
            "type": "general",
            "description": "just talk"
        }))
        .unwrap();
        assert_eq!(general.prompt(), "just talk");
    }

    #[tokio::test]
    async fn execute_task_sends_the_task_prompt() {
        let transport = Arc::new(ScriptedTransport::text_only("on it"));
        let mut agent = CodingAgent::new(transport.clone(), tools()).with_mode(Mode::Standard);

        let task = Task::Refactor {
            description: "split the parser".into(),
            file: Some("parser.js".into()),
        };
        let reply = agent.execute_task(&task).await.unwrap();
        assert_eq!(reply.message, "on it");

        let sent = &transport.requests()[0];
        assert_eq!(sent[0].content, "Refactor the following:\n\nsplit the parser\n\nFile: parser.js\n");
    }

    #[tokio::test]
    async fn export_import_round_trip() {
        let transport = Arc::new(ScriptedTransport::text_only("hi"));
        let mut agent = CodingAgent::new(transport, tools()).with_mode(Mode::Standard);
        agent.set_context("project", serde_json::json!("demo"));
        agent.chat("hello", ChatOptions::default()).await.unwrap();
        let exported = agent.export_conversation().unwrap();

        let mut fresh = CodingAgent::new(Arc::new(ScriptedTransport::new(vec![])), tools());
        fresh.import_conversation(exported).unwrap();
        assert_eq!(fresh.conversation().len(), 2);
        assert_eq!(fresh.context_value("project"), Some(&serde_json::json!("demo")));

        fresh.clear_history();
        assert!(fresh.conversation().is_empty());
        assert!(fresh.import_conversation(serde_json::json!({ "bogus": true })).is_err());
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("Standard".parse::<Mode>().unwrap(), Mode::Standard);
        assert_eq!("intelligent".parse::<Mode>().unwrap(), Mode::Intelligent);
        assert!("turbo".parse::<Mode>().is_err());
    }

    #[test]
    fn from_config_builds_mock_agent() {
        let agent = CodingAgent::from_config(&AppConfig::default()).unwrap();
        assert_eq!(agent.mode(), Mode::Intelligent);
        assert_eq!(agent.tool_specs().len(), 10);
    }
}
