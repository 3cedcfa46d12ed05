//! Session resources and prompt templates for Codewright.
//!
//! [`InMemorySessionStore`] implements the core `SessionStore` trait for a
//! single process. [`PromptLibrary`] holds reusable prompt templates.

pub mod in_memory;
pub mod prompts;

pub use in_memory::InMemorySessionStore;
pub use prompts::{PromptLibrary, PromptSummary, PromptTemplate};
