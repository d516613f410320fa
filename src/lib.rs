//! # crewlab
//!
//! Tool-calling agents, a local vector index and multi-agent crews on top of
//! OpenAI-compatible LLM providers (Groq, NVIDIA NIM), plus research tools (arXiv,
//! Tavily web search) and a loader for Brazilian foreign-trade statistics.

pub mod agents;
pub mod comex;
pub mod config;
pub mod crew;
pub mod error;
pub mod llm;
pub mod rag;

pub use error::{CrewLabError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::agents::{FunctionCallingAgent, ReActAgent};
    pub use crate::config::Settings;
    pub use crate::crew::{Agent, Crew, CrewOutput, Process, Task};
    pub use crate::error::{CrewLabError, Result};
    pub use crate::llm::gateways::OpenAIGateway;
    pub use crate::llm::tools::{FunctionDescriptor, FunctionTool, LlmTool, ToolDescriptor};
    pub use crate::llm::{CompletionConfig, LlmBroker, LlmGateway, LlmMessage, MessageRole};
    pub use crate::rag::{QueryEngine, QueryEngineTool, VectorStoreIndex};
}
