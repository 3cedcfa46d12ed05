//! The agent layer of Codewright.
//!
//! A turn runs in one of two ways:
//!
//! 1. **Standard**: the [`AgentLoop`] sends the conversation to the model,
//!    executes any requested tools once, and asks the model for the final
//!    answer. Never more than two transport calls per turn.
//! 2. **Intelligent**: the [`Planner`] classifies the request, builds a
//!    fixed plan of tool steps, runs it, and formats a summary.
//!
//! [`CodingAgent`] owns the conversation and picks the mode;
//! [`SmartAgent`] wraps it in the request pipeline.

pub mod coding_agent;
pub mod loop_runner;
pub mod planner;
pub mod smart_agent;

#[cfg(test)]
mod test_helpers;

pub use coding_agent::{AgentReply, ChatOptions, CodingAgent, ConversationExport, Mode, Task};
pub use loop_runner::{AgentLoop, LoopState, TurnOutcome};
pub use planner::{
    ExecutionContext, Intent, Plan, PlanOutcome, Planner, Step, StepAction, StepOutcome,
    StepResult, build_plan, classify_intent, extract_file_paths, extract_search_term,
};
pub use smart_agent::{SmartAgent, SmartAgentBuilder, SmartResponse};
