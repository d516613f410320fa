pub mod openai;
pub mod openai_messages_adapter;
pub mod tokenizer_gateway;

pub use openai::{OpenAIConfig, OpenAIGateway, GROQ_BASE_URL, NVIDIA_BASE_URL};
pub use tokenizer_gateway::TokenizerGateway;
