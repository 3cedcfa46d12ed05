//! In-memory session store: sessions and resources live for the process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use codewright_core::error::SessionError;
use codewright_core::session::{Resource, Session, SessionMessage, SessionStore};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct State {
    sessions: HashMap<String, Session>,
    resources: HashMap<String, Resource>,
}

/// A [`SessionStore`] backed by hash maps behind one lock.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    state: Arc<RwLock<State>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open sessions.
    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(
        &self,
        id: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Session, SessionError> {
        let session = Session {
            id: id.to_string(),
            metadata,
            created_at: Utc::now(),
            resources: Vec::new(),
            context: serde_json::Map::new(),
            messages: Vec::new(),
        };

        let mut state = self.state.write().await;
        if let Some(previous) = state.sessions.insert(id.to_string(), session.clone()) {
            for resource_id in previous.resources {
                state.resources.remove(&resource_id);
            }
        }
        debug!(session = id, "Session created");
        Ok(session)
    }

    async fn get_session(&self, id: &str) -> Option<Session> {
        self.state.read().await.sessions.get(id).cloned()
    }

    async fn add_resource(
        &self,
        session_id: &str,
        mut resource: Resource,
    ) -> Result<String, SessionError> {
        let mut state = self.state.write().await;
        let State {
            sessions,
            resources,
        } = &mut *state;

        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let resource_id = resource.resource_id();
        resource.session_id = Some(session_id.to_string());
        resource.added_at = Some(Utc::now());

        if !session.resources.contains(&resource_id) {
            session.resources.push(resource_id.clone());
        }
        resources.insert(resource_id.clone(), resource);

        debug!(session = session_id, resource = %resource_id, "Resource attached");
        Ok(resource_id)
    }

    async fn get_resource(&self, resource_id: &str) -> Option<Resource> {
        self.state.read().await.resources.get(resource_id).cloned()
    }

    async fn list_resources(&self, session_id: &str) -> Vec<Resource> {
        let state = self.state.read().await;
        let Some(session) = state.sessions.get(session_id) else {
            return Vec::new();
        };
        session
            .resources
            .iter()
            .filter_map(|id| state.resources.get(id).cloned())
            .collect()
    }

    async fn update_context(
        &self,
        session_id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        session.context.insert(key.to_string(), value);
        Ok(())
    }

    async fn add_message(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        session.messages.push(SessionMessage {
            role: role.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn close_session(&self, session_id: &str) {
        let mut state = self.state.write().await;
        if let Some(session) = state.sessions.remove(session_id) {
            for resource_id in session.resources {
                state.resources.remove(&resource_id);
            }
            debug!(session = session_id, "Session closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(uri: &str) -> Resource {
        Resource::new("code", uri, serde_json::json!({ "language": "javascript" }))
    }

    #[tokio::test]
    async fn resources_round_trip_in_order() {
        let store = InMemorySessionStore::new();
        store.create_session("s1", Default::default()).await.unwrap();

        let a = store.add_resource("s1", code("a.js")).await.unwrap();
        let b = store.add_resource("s1", code("b.js")).await.unwrap();
        assert_eq!(a, "code:a.js");
        assert_eq!(b, "code:b.js");

        let listed = store.list_resources("s1").await;
        let uris: Vec<&str> = listed.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(uris, vec!["a.js", "b.js"]);
        assert_eq!(listed[0].session_id.as_deref(), Some("s1"));
        assert!(listed[0].added_at.is_some());
    }

    #[tokio::test]
    async fn re_adding_a_resource_replaces_it() {
        let store = InMemorySessionStore::new();
        store.create_session("s1", Default::default()).await.unwrap();
        store.add_resource("s1", code("a.js")).await.unwrap();
        let mut updated = code("a.js");
        updated.content = serde_json::json!("v2");
        store.add_resource("s1", updated).await.unwrap();

        let listed = store.list_resources("s1").await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content, "v2");
    }

    #[tokio::test]
    async fn unknown_session_errors() {
        let store = InMemorySessionStore::new();
        let err = store.add_resource("ghost", code("a.js")).await.unwrap_err();
        assert_eq!(err, SessionError::NotFound("ghost".into()));
        assert!(store.list_resources("ghost").await.is_empty());
        assert!(store.update_context("ghost", "k", serde_json::json!(1)).await.is_err());
    }

    #[tokio::test]
    async fn context_and_messages_are_recorded() {
        let store = InMemorySessionStore::new();
        store.create_session("s1", Default::default()).await.unwrap();
        store
            .update_context("s1", "project", serde_json::json!("demo"))
            .await
            .unwrap();
        store.add_message("s1", "user", "hello").await.unwrap();

        let session = store.get_session("s1").await.unwrap();
        assert_eq!(session.context["project"], "demo");
        assert_eq!(session.messages[0].content, "hello");
    }

    #[tokio::test]
    async fn close_drops_resources() {
        let store = InMemorySessionStore::new();
        store.create_session("s1", Default::default()).await.unwrap();
        let id = store.add_resource("s1", code("a.js")).await.unwrap();

        store.close_session("s1").await;
        assert!(store.get_session("s1").await.is_none());
        assert!(store.get_resource(&id).await.is_none());
        assert_eq!(store.session_count().await, 0);
    }
}
