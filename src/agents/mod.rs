//! Single agents built on the LLM broker.
//!
//! - [`FunctionCallingAgent`] - conversational agent using native tool calls
//! - [`ReActAgent`] - text-protocol reasoning agent (Thought / Action / Observation / Answer)

pub mod function_calling_agent;
pub mod react_agent;

pub use function_calling_agent::{FunctionCallingAgent, FunctionCallingAgentBuilder};
pub use react_agent::{ReActAgent, ReActAgentBuilder, ReActStep};
