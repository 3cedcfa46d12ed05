//! Stamps request metadata into the pipeline context.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use codewright_core::error::PipelineError;
use tracing::debug;

use crate::context::PipelineContext;
use crate::processor::{Processor, ProcessorOutput};

/// Stamps time, request count, working directory and user into the context.
/// Never produces output, so the chain always continues.
pub struct ContextEnrichmentProcessor {
    working_dir: PathBuf,
    user: Option<String>,
    counts: Mutex<HashMap<String, u64>>,
}

impl ContextEnrichmentProcessor {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            user: None,
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Requests counted so far for `session_id`.
    pub fn request_count(&self, session_id: &str) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(session_id)
            .copied()
            .unwrap_or(0)
    }

    fn bump(&self, session_id: &str) -> u64 {
        let mut counts = self
            .counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let count = counts.entry(session_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

#[async_trait]
impl Processor for ContextEnrichmentProcessor {
    fn name(&self) -> &str {
        "context_enrichment"
    }

    async fn process(
        &self,
        _input: &str,
        ctx: &mut PipelineContext,
    ) -> Result<Option<ProcessorOutput>, PipelineError> {
        let now = Utc::now();
        ctx.request_count = self.bump(&ctx.session_id);
        ctx.set("timestamp", now.timestamp_millis());
        ctx.set("datetime", now.to_rfc3339());
        ctx.set("request_count", ctx.request_count);
        ctx.set("working_dir", self.working_dir.display().to_string());
        ctx.set("user", self.user.as_deref().unwrap_or("unknown"));

        debug!(
            session = %ctx.session_id,
            request = ctx.request_count,
            "Context enriched"
        );
        Ok(None)
    }
}
