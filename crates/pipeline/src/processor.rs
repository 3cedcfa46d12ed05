//! Pluggable processors. The first one that produces output wins.

use async_trait::async_trait;
use codewright_core::error::PipelineError;
use serde::{Deserialize, Serialize};

use crate::context::PipelineContext;

/// What a processor hands back when it claims the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorOutput {
    /// Name of the processor that produced this output.
    pub processor: String,
    pub text: String,
    /// Structured extras (extracted blocks, saved files, ...).
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ProcessorOutput {
    pub fn text(processor: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            processor: processor.into(),
            text: text.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// No text and no data: the chain treats this like `None`.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.data.is_null()
    }
}

#[async_trait]
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this processor wants to look at `input` at all.
    fn can_handle(&self, _input: &str, _ctx: &PipelineContext) -> bool {
        true
    }

    /// `Ok(None)` lets the chain continue to the next processor.
    async fn process(
        &self,
        input: &str,
        ctx: &mut PipelineContext,
    ) -> Result<Option<ProcessorOutput>, PipelineError>;
}
