//! Chat session management with context window tracking.
//!
//! A session keeps the conversation history behind a system prompt and trims the oldest
//! turns once the token count exceeds the configured context size.

use crate::error::{CrewLabError, Result};
use crate::llm::broker::LlmBroker;
use crate::llm::gateway::CompletionConfig;
use crate::llm::gateways::TokenizerGateway;
use crate::llm::models::{LlmMessage, MessageRole};
use crate::llm::tools::LlmTool;

/// An LLM message with its token count.
#[derive(Debug, Clone)]
pub struct SizedLlmMessage {
    pub message: LlmMessage,
    pub token_length: usize,
}

impl SizedLlmMessage {
    pub fn new(message: LlmMessage, token_length: usize) -> Self {
        Self {
            message,
            token_length,
        }
    }

    pub fn role(&self) -> MessageRole {
        self.message.role
    }

    pub fn content(&self) -> Option<&str> {
        self.message.content.as_deref()
    }
}

/// A conversation with memory, bounded by a context window.
///
/// The system prompt (first message) is always preserved when trimming.
///
/// # Examples
///
/// ```ignore
/// use crewlab::llm::{ChatSession, LlmBroker};
/// use crewlab::llm::gateways::OpenAIGateway;
/// use std::sync::Arc;
///
/// let gateway = Arc::new(OpenAIGateway::groq(api_key));
/// let broker = LlmBroker::new("llama-3.1-8b-instant", gateway);
/// let mut session = ChatSession::builder(broker)
///     .system_prompt("Você é um assistente de pesquisa.")
///     .build();
///
/// let answer = session.send("Quais são as tendências em IA?").await?;
/// ```
pub struct ChatSession {
    broker: LlmBroker,
    messages: Vec<SizedLlmMessage>,
    tools: Vec<Box<dyn LlmTool>>,
    max_context: usize,
    tokenizer_gateway: TokenizerGateway,
    temperature: f32,
    parallel_tool_calls: bool,
}

impl ChatSession {
    pub fn new(broker: LlmBroker) -> Self {
        Self::builder(broker).build()
    }

    pub fn builder(broker: LlmBroker) -> ChatSessionBuilder {
        ChatSessionBuilder::new(broker)
    }

    /// Send a user message and record the assistant's answer.
    ///
    /// Tool calls made while answering are resolved by the broker and are not kept in
    /// the history; only the user turn and the final answer are.
    ///
    /// A query that cannot fit next to the system prompt is rejected, and a failed
    /// generation leaves the history as it was before the call.
    pub async fn send(&mut self, query: &str) -> Result<String> {
        let user_message = self.build_sized_message(LlmMessage::user(query));
        let available = self.max_context.saturating_sub(self.messages[0].token_length);
        if user_message.token_length > available {
            return Err(CrewLabError::InvalidArgument(format!(
                "Message of {} tokens does not fit in the {} tokens left by the system prompt",
                user_message.token_length, available
            )));
        }

        let previous = self.messages.clone();
        self.push_and_trim(user_message);

        let messages: Vec<LlmMessage> = self.messages.iter().map(|m| m.message.clone()).collect();
        let config = CompletionConfig {
            temperature: self.temperature,
            parallel_tool_calls: self.parallel_tool_calls,
            ..Default::default()
        };

        let tools = if self.tools.is_empty() {
            None
        } else {
            Some(self.tools.as_slice())
        };

        let response = match self.broker.generate(&messages, tools, Some(config)).await {
            Ok(response) => response,
            Err(e) => {
                self.messages = previous;
                return Err(e);
            }
        };

        self.insert_message(LlmMessage::assistant(&response));

        Ok(response)
    }

    /// Insert a message into the conversation history, trimming the oldest
    /// non-system messages while the total exceeds `max_context`.
    ///
    /// The system prompt and the inserted message itself are never trimmed.
    pub fn insert_message(&mut self, message: LlmMessage) {
        let sized_message = self.build_sized_message(message);
        self.push_and_trim(sized_message);
    }

    fn push_and_trim(&mut self, sized_message: SizedLlmMessage) {
        self.messages.push(sized_message);

        let mut total_length = self.total_tokens();

        while total_length > self.max_context && self.messages.len() > 2 {
            let removed = self.messages.remove(1);
            total_length -= removed.token_length;
        }
    }

    /// Forget everything but the system prompt.
    pub fn clear(&mut self) {
        self.messages.truncate(1);
    }

    pub fn messages(&self) -> &[SizedLlmMessage] {
        &self.messages
    }

    pub fn tools(&self) -> &[Box<dyn LlmTool>] {
        &self.tools
    }

    pub fn total_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.token_length).sum()
    }

    fn build_sized_message(&self, message: LlmMessage) -> SizedLlmMessage {
        let token_length = message
            .content
            .as_deref()
            .map(|content| self.tokenizer_gateway.count_tokens(content))
            .unwrap_or(0);

        SizedLlmMessage::new(message, token_length)
    }
}

/// Builder for constructing a `ChatSession` with custom configuration.
pub struct ChatSessionBuilder {
    broker: LlmBroker,
    system_prompt: String,
    tools: Vec<Box<dyn LlmTool>>,
    max_context: usize,
    tokenizer_gateway: Option<TokenizerGateway>,
    temperature: f32,
    parallel_tool_calls: bool,
}

impl ChatSessionBuilder {
    fn new(broker: LlmBroker) -> Self {
        Self {
            broker,
            system_prompt: "You are a helpful assistant.".to_string(),
            tools: Vec::new(),
            max_context: 32768,
            tokenizer_gateway: None,
            temperature: 0.1,
            parallel_tool_calls: true,
        }
    }

    /// Set the system prompt (default: "You are a helpful assistant.")
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn tools(mut self, tools: Vec<Box<dyn LlmTool>>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the maximum context window in tokens (default: 32768)
    pub fn max_context(mut self, max_context: usize) -> Self {
        self.max_context = max_context;
        self
    }

    pub fn tokenizer_gateway(mut self, gateway: TokenizerGateway) -> Self {
        self.tokenizer_gateway = Some(gateway);
        self
    }

    /// Set the temperature for generation (default: 0.1)
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn parallel_tool_calls(mut self, allow: bool) -> Self {
        self.parallel_tool_calls = allow;
        self
    }

    pub fn build(self) -> ChatSession {
        let tokenizer_gateway = self.tokenizer_gateway.unwrap_or_default();
        let token_length = tokenizer_gateway.count_tokens(&self.system_prompt);
        let system_message = LlmMessage::system(self.system_prompt);

        ChatSession {
            broker: self.broker,
            messages: vec![SizedLlmMessage::new(system_message, token_length)],
            tools: self.tools,
            max_context: self.max_context,
            tokenizer_gateway,
            temperature: self.temperature,
            parallel_tool_calls: self.parallel_tool_calls,
        }
    }
}
