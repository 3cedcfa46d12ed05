//! Tool trait, registry, and dispatcher, the agent's capability table.
//!
//! Tools are what give the agent the ability to act in the world: read and
//! write files, analyze code, generate tests. The registry is assembled once
//! through [`ToolRegistryBuilder`] and is immutable afterwards; the agent loop
//! and planner share it behind an `Arc`.
//!
//! Two failure shapes are kept apart on purpose:
//! - a handler returning `Err(..)` is a dispatch-level [`ToolError::Execution`];
//! - a handler returning `Ok({"success": false, "error": ..})` is a successful
//!   dispatch carrying a domain failure (file not found, bad input).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ToolError;

/// A request, proposed by the model or the planner, to invoke a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Structured arguments
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Declarative description of a tool, sent to the model so it knows the
/// callable surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,

    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// How a single tool call ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolOutcome {
    /// The handler completed; the payload may still report `success: false`.
    #[serde(rename = "result")]
    Success(serde_json::Value),

    /// Dispatch failed (unknown tool, handler error, duplicate call).
    #[serde(rename = "error")]
    Failure(String),
}

/// The result of one tool call. Produced exactly once per [`ToolCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,

    #[serde(rename = "tool")]
    pub tool_name: String,

    #[serde(flatten)]
    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn success(call: &ToolCall, payload: serde_json::Value) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            outcome: ToolOutcome::Success(payload),
        }
    }

    pub fn failure(call: &ToolCall, error: impl Into<String>) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            outcome: ToolOutcome::Failure(error.into()),
        }
    }

    /// True when the dispatch succeeded, regardless of the payload's own flag.
    pub fn is_dispatched(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success(_))
    }

    /// True when the handler completed but reported `success: false`.
    pub fn is_domain_failure(&self) -> bool {
        match &self.outcome {
            ToolOutcome::Success(payload) => !payload_succeeded(payload),
            ToolOutcome::Failure(_) => false,
        }
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            ToolOutcome::Success(payload) => Some(payload),
            ToolOutcome::Failure(_) => None,
        }
    }
}

/// Whether a handler payload reports success. Payloads without a `success`
/// field count as successful.
pub fn payload_succeeded(payload: &serde_json::Value) -> bool {
    payload
        .get("success")
        .and_then(|v| v.as_bool())
        .unwrap_or(true)
}

/// The core Tool trait.
///
/// Each collaborator capability (read_file, analyze_code, ...) implements this
/// trait and is registered through [`ToolRegistryBuilder`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError>;

    /// Describe this tool for the model.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Boxed async handler used by [`FnTool`].
pub type ToolHandler =
    Arc<dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<serde_json::Value, ToolError>> + Send + Sync>;

/// A tool backed by a closure, for ad-hoc registration.
pub struct FnTool {
    spec: ToolSpec,
    handler: ToolHandler,
}

impl FnTool {
    pub fn new(spec: ToolSpec, handler: ToolHandler) -> Self {
        Self { spec, handler }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        self.spec.parameters.clone()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        (self.handler)(arguments).await
    }
}

/// Collects tools at startup and produces an immutable [`ToolRegistry`].
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A later tool with the same name replaces the earlier
    /// one in place, keeping its position.
    pub fn register(mut self, tool: impl Tool + 'static) -> Self {
        self.insert(Arc::new(tool));
        self
    }

    /// Register a closure as a tool.
    pub fn handler<F, Fut>(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
        f: F,
    ) -> Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<serde_json::Value, ToolError>> + Send + 'static,
    {
        let spec = ToolSpec {
            name: name.into(),
            description: description.into(),
            parameters,
        };
        let handler: ToolHandler = Arc::new(move |args| {
            let fut: BoxFuture<'static, Result<serde_json::Value, ToolError>> = Box::pin(f(args));
            fut
        });
        self.register(FnTool::new(spec, handler))
    }

    fn insert(&mut self, tool: Arc<dyn Tool>) {
        if let Some(slot) = self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            warn!(tool = tool.name(), "Replacing previously registered tool");
            *slot = tool;
        } else {
            self.tools.push(tool);
        }
    }

    pub fn build(self) -> ToolRegistry {
        let index = self
            .tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();
        ToolRegistry {
            tools: self.tools,
            index,
        }
    }
}

/// An immutable table of available tools.
///
/// The agent loop uses this to:
/// 1. Get tool specs to send to the model
/// 2. Look up and execute tools when the model requests them
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::new()
    }

    /// A registry with no tools.
    pub fn empty() -> Self {
        ToolRegistryBuilder::new().build()
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All tool specs, in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// All registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke the tool registered under `name`.
    ///
    /// Fails with [`ToolError::NotFound`] without invoking anything when the
    /// name is unknown; any handler error comes back as
    /// [`ToolError::Execution`].
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        debug!(tool = name, "Dispatching tool");
        tool.execute(arguments).await.map_err(|e| match e {
            ToolError::Execution { .. } => e,
            other => ToolError::execution(name, other),
        })
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

/// Per-turn dispatcher that guarantees at-most-once execution per call id.
pub struct Dispatcher<'a> {
    registry: &'a ToolRegistry,
    dispatched: HashSet<String>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Self {
            registry,
            dispatched: HashSet::new(),
        }
    }

    /// Dispatch one call, refusing ids that were already dispatched.
    pub async fn dispatch(&mut self, call: &ToolCall) -> Result<serde_json::Value, ToolError> {
        if !self.dispatched.insert(call.id.clone()) {
            return Err(ToolError::DuplicateCall(call.id.clone()));
        }
        self.registry.dispatch(&call.name, call.arguments.clone()).await
    }

    /// Dispatch one call and fold any error into a failure [`ToolResult`].
    pub async fn execute(&mut self, call: &ToolCall) -> ToolResult {
        match self.dispatch(call).await {
            Ok(payload) => ToolResult::success(call, payload),
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool call failed");
                ToolResult::failure(call, e.to_string())
            }
        }
    }

    /// Number of distinct calls dispatched so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched.len()
    }
}
