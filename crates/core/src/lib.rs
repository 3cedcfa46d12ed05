//! # Codewright Core
//!
//! Domain types, traits, and error definitions for the Codewright coding
//! agent. This crate has **no framework dependencies**: it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external seam is a trait here (the model [`Transport`], the
//! [`Tool`] capabilities, the [`SessionStore`]). Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod session;
pub mod tool;
pub mod transport;

// Re-export key types at crate root for ergonomics
pub use error::{Error, PipelineError, PlanStepError, Result, SessionError, ToolError, TransportError};
pub use message::{Conversation, ConversationId, Message, Role};
pub use session::{Resource, Session, SessionStore};
pub use tool::{
    Dispatcher, Tool, ToolCall, ToolOutcome, ToolRegistry, ToolRegistryBuilder, ToolResult, ToolSpec,
};
pub use transport::{ChatResponse, ModelSettings, StreamChunk, Transport, Usage};
