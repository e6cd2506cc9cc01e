//! Prompt assembly subsystem
//!
//! Builds the system and user prompts handed to the LLM planner: the
//! schema snapshot (with param-bound column annotations), the dialect
//! profile, and a policy summary, wrapped in the QueryPlan output
//! contract. The library never calls a model; callers use the returned
//! strings with their own SDK.

mod builder;

pub use builder::{PromptBuilder, PromptComponents};
