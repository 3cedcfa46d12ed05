//! Lifecycle hooks fired around a pipeline run.

use std::fmt;

use async_trait::async_trait;
use codewright_core::error::PipelineError;

use crate::context::PipelineContext;
use crate::processor::ProcessorOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    BeforeProcess,
    AfterProcess,
    OnError,
}

impl HookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeProcess => "before_process",
            Self::AfterProcess => "after_process",
            Self::OnError => "on_error",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook gets to see. `output` is only set for `AfterProcess`,
/// `error` only for `OnError`.
#[derive(Debug)]
pub struct HookPayload<'a> {
    pub event: HookEvent,
    pub input: &'a str,
    pub output: Option<&'a ProcessorOutput>,
    pub error: Option<&'a PipelineError>,
    pub context: &'a PipelineContext,
}

#[async_trait]
pub trait Hook: Send + Sync {
    async fn call(&self, payload: &HookPayload<'_>) -> Result<(), PipelineError>;
}

/// Hook backed by a synchronous closure.
pub struct FnHook<F>(F);

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(&HookPayload<'_>) -> Result<(), PipelineError> + Send + Sync,
{
    async fn call(&self, payload: &HookPayload<'_>) -> Result<(), PipelineError> {
        (self.0)(payload)
    }
}

/// Wrap a closure as a [`Hook`].
pub fn hook_fn<F>(f: F) -> FnHook<F>
where
    F: Fn(&HookPayload<'_>) -> Result<(), PipelineError> + Send + Sync,
{
    FnHook(f)
}
