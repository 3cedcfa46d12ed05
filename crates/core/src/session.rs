//! Session store trait: per-session resources kept outside the agent.
//!
//! The orchestration core only needs to attach opaque resources (generated
//! code, files it looked at) to a session and list them back. The store is an
//! external collaborator; `codewright-session` ships an in-memory one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// A session record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,

    /// Resource ids attached to this session, in insertion order
    #[serde(default)]
    pub resources: Vec<String>,

    /// Free-form per-session context values
    #[serde(default)]
    pub context: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub messages: Vec<SessionMessage>,
}

/// A message recorded against a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// An opaque resource attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource kind (e.g. "code", "file")
    pub kind: String,

    /// Locator within the kind (e.g. a filename)
    pub uri: String,

    #[serde(default)]
    pub content: serde_json::Value,

    /// Filled in by the store when the resource is attached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl Resource {
    pub fn new(kind: impl Into<String>, uri: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            uri: uri.into(),
            content,
            session_id: None,
            added_at: None,
        }
    }

    /// Stable id of this resource: `kind:uri`.
    pub fn resource_id(&self) -> String {
        format!("{}:{}", self.kind, self.uri)
    }
}

/// The session collaborator interface.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create (or replace) a session.
    async fn create_session(
        &self,
        id: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Session, SessionError>;

    async fn get_session(&self, id: &str) -> Option<Session>;

    /// Attach a resource to a session and return its id.
    async fn add_resource(&self, session_id: &str, resource: Resource) -> Result<String, SessionError>;

    async fn get_resource(&self, resource_id: &str) -> Option<Resource>;

    /// Resources of a session in insertion order; unknown sessions yield none.
    async fn list_resources(&self, session_id: &str) -> Vec<Resource>;

    async fn update_context(
        &self,
        session_id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), SessionError>;

    async fn add_message(&self, session_id: &str, role: &str, content: &str) -> Result<(), SessionError>;

    /// Close a session and drop its resources. Unknown ids are ignored.
    async fn close_session(&self, session_id: &str);
}
