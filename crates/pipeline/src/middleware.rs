//! Input middleware: each stage receives the previous stage's output.

use async_trait::async_trait;
use codewright_core::error::PipelineError;

use crate::context::PipelineContext;

/// A stage that rewrites (or rejects) the input before processors see it.
#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(
        &self,
        input: String,
        ctx: &mut PipelineContext,
    ) -> Result<String, PipelineError>;
}

/// Strips leading and trailing whitespace.
pub struct TrimMiddleware;

#[async_trait]
impl Middleware for TrimMiddleware {
    fn name(&self) -> &str {
        "trim"
    }

    async fn handle(
        &self,
        input: String,
        _ctx: &mut PipelineContext,
    ) -> Result<String, PipelineError> {
        Ok(input.trim().to_string())
    }
}

/// Rejects input shorter than `min_chars` characters (after trimming).
pub struct MinLengthMiddleware {
    min_chars: usize,
}

impl MinLengthMiddleware {
    pub fn new(min_chars: usize) -> Self {
        Self {
            min_chars: min_chars.max(1),
        }
    }
}

#[async_trait]
impl Middleware for MinLengthMiddleware {
    fn name(&self) -> &str {
        "min_length"
    }

    async fn handle(
        &self,
        input: String,
        _ctx: &mut PipelineContext,
    ) -> Result<String, PipelineError> {
        let len = input.trim().chars().count();
        if len == 0 {
            return Err(PipelineError::Rejected("input is empty".into()));
        }
        if len < self.min_chars {
            return Err(PipelineError::Rejected(format!(
                "input is {len} characters, at least {} required",
                self.min_chars
            )));
        }
        Ok(input)
    }
}

/// Middleware backed by a synchronous closure.
pub struct FnMiddleware<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(String, &mut PipelineContext) -> Result<String, PipelineError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(
        &self,
        input: String,
        ctx: &mut PipelineContext,
    ) -> Result<String, PipelineError> {
        (self.f)(input, ctx)
    }
}

/// Wrap a closure as [`Middleware`].
pub fn middleware_fn<F>(name: impl Into<String>, f: F) -> FnMiddleware<F>
where
    F: Fn(String, &mut PipelineContext) -> Result<String, PipelineError> + Send + Sync,
{
    FnMiddleware {
        name: name.into(),
        f,
    }
}
