//! Model transport implementations for Codewright.
//!
//! All transports implement the `codewright_core::Transport` trait.
//! [`build_transport`] selects one based on configuration.

mod http;

pub mod anthropic;
pub mod mock;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicTransport;
pub use mock::{MockTransport, RecordedRequest};
pub use openai_compat::OpenAiCompatTransport;
pub use router::{PROVIDERS, build_transport};
