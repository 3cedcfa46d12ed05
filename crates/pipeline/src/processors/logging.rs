//! Request logging: an in-memory ring of recent inputs, optionally mirrored to a JSONL file.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codewright_core::error::PipelineError;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::context::PipelineContext;
use crate::processor::{Processor, ProcessorOutput};

/// Characters of input kept per log entry.
const MAX_LOGGED_INPUT: usize = 200;

/// Maximum log entries kept in memory.
const MAX_LOG_ENTRIES: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLogEntry {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub input: String,
    pub request_count: u64,
    pub user: Option<String>,
}

/// Records every request it sees; optionally appends JSON lines to a file.
pub struct LoggingProcessor {
    log_file: Option<PathBuf>,
    entries: Mutex<Vec<RequestLogEntry>>,
}

impl LoggingProcessor {
    pub fn new() -> Self {
        Self {
            log_file: None,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// The most recent `limit` entries, oldest first.
    pub fn logs(&self, limit: usize) -> Vec<RequestLogEntry> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let start = entries.len().saturating_sub(limit);
        entries[start..].to_vec()
    }

    async fn append(&self, path: &Path, entry: &RequestLogEntry) -> Result<(), PipelineError> {
        let failed = |message: String| PipelineError::Processor {
            name: "logging".into(),
            message,
        };

        let mut line = serde_json::to_string(entry).map_err(|e| failed(e.to_string()))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| failed(format!("{}: {e}", path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| failed(format!("{}: {e}", path.display())))
    }
}

impl Default for LoggingProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Processor for LoggingProcessor {
    fn name(&self) -> &str {
        "logging"
    }

    async fn process(
        &self,
        input: &str,
        ctx: &mut PipelineContext,
    ) -> Result<Option<ProcessorOutput>, PipelineError> {
        let entry = RequestLogEntry {
            timestamp: Utc::now(),
            session_id: ctx.session_id.clone(),
            input: input.chars().take(MAX_LOGGED_INPUT).collect(),
            request_count: ctx.request_count,
            user: ctx.get_str("user").map(str::to_string),
        };

        info!(
            session = %entry.session_id,
            request = entry.request_count,
            input = %entry.input,
            "Request received"
        );

        if let Some(path) = &self.log_file {
            self.append(path, &entry).await?;
        }

        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.len() >= MAX_LOG_ENTRIES {
            entries.remove(0);
        }
        entries.push(entry);
        Ok(None)
    }
}
