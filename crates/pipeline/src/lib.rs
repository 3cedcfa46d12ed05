//! Extensible request pipeline for Codewright.
//!
//! A [`Pipeline`] runs input through middleware (each sees the previous
//! one's output), then offers it to processors until one produces output,
//! firing [`HookEvent`] hooks around the run.

pub mod context;
pub mod hooks;
pub mod middleware;
pub mod pipeline;
pub mod processor;
pub mod processors;

pub use context::PipelineContext;
pub use hooks::{FnHook, Hook, HookEvent, HookPayload, hook_fn};
pub use middleware::{FnMiddleware, Middleware, MinLengthMiddleware, TrimMiddleware, middleware_fn};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineRun};
pub use processor::{Processor, ProcessorOutput};
pub use processors::{
    CodeBlock, CodeExtractionProcessor, ContextEnrichmentProcessor, Extraction,
    LoggingProcessor, RequestLogEntry, ResponseFormattingProcessor, SavedFile,
};
