//! Per-run scratch state shared by middleware, processors and hooks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Created at the start of every [`Pipeline::execute`](crate::Pipeline::execute)
/// and handed back with the run result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineContext {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    /// Requests seen for this session, including the current one.
    /// Zero until an enrichment processor stamps it.
    pub request_count: u64,
    /// Free-form values stamped by processors.
    pub values: serde_json::Map<String, serde_json::Value>,
}

impl PipelineContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            started_at: Utc::now(),
            request_count: 0,
            values: serde_json::Map::new(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_round_trip() {
        let mut ctx = PipelineContext::new("s1");
        ctx.set("user", "ada");
        ctx.set("attempt", 3);
        assert_eq!(ctx.get_str("user"), Some("ada"));
        assert_eq!(ctx.get("attempt"), Some(&serde_json::json!(3)));
        assert!(ctx.get("missing").is_none());
        assert_eq!(ctx.request_count, 0);
    }
}
