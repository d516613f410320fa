pub mod broker;
pub mod chat_session;
pub mod gateway;
pub mod gateways;
pub mod models;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use broker::LlmBroker;
pub use chat_session::{ChatSession, ChatSessionBuilder, SizedLlmMessage};
pub use gateway::{CompletionConfig, LlmGateway};
pub use models::{LlmGatewayResponse, LlmMessage, LlmToolCall, MessageRole};
pub use tools::{FunctionDescriptor, LlmTool, ToolDescriptor};
