//! Agent that relies on the provider's native tool calling.

use crate::error::Result;
use crate::llm::chat_session::ChatSession;
use crate::llm::tools::LlmTool;
use crate::llm::LlmBroker;
use tracing::{debug, info};

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Use the available tools whenever they help answer the user, \
     and answer in the user's language.";

/// A conversational agent with memory whose tools are invoked through native tool calls.
///
/// # Examples
///
/// ```ignore
/// use crewlab::agents::FunctionCallingAgent;
/// use crewlab::llm::tools::engagement_tool;
///
/// let mut agent = FunctionCallingAgent::builder(broker)
///     .tools(vec![engagement_tool()])
///     .verbose(true)
///     .build();
///
/// let answer = agent.chat("Qual é o engajamento de 150 curtidas e 2000 seguidores?").await?;
/// ```
pub struct FunctionCallingAgent {
    chat: ChatSession,
    verbose: bool,
}

impl FunctionCallingAgent {
    pub fn new(broker: LlmBroker, tools: Vec<Box<dyn LlmTool>>) -> Self {
        Self::builder(broker).tools(tools).build()
    }

    pub fn builder(broker: LlmBroker) -> FunctionCallingAgentBuilder {
        FunctionCallingAgentBuilder::new(broker)
    }

    /// Send a message; earlier turns of the conversation are remembered.
    pub async fn chat(&mut self, message: &str) -> Result<String> {
        if self.verbose {
            info!(input = message, "Agent received message");
        } else {
            debug!(input = message, "Agent received message");
        }

        let answer = self.chat.send(message).await?;

        if self.verbose {
            info!(answer = answer.as_str(), "Agent answered");
        } else {
            debug!(answer = answer.as_str(), "Agent answered");
        }

        Ok(answer)
    }

    /// Forget the conversation so far.
    pub fn reset(&mut self) {
        self.chat.clear();
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.chat.tools().iter().map(|t| t.descriptor().function.name).collect()
    }
}

pub struct FunctionCallingAgentBuilder {
    broker: LlmBroker,
    tools: Vec<Box<dyn LlmTool>>,
    system_prompt: String,
    verbose: bool,
    allow_parallel_tool_calls: bool,
}

impl FunctionCallingAgentBuilder {
    fn new(broker: LlmBroker) -> Self {
        Self {
            broker,
            tools: Vec::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            verbose: false,
            allow_parallel_tool_calls: true,
        }
    }

    pub fn tools(mut self, tools: Vec<Box<dyn LlmTool>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// When false, the model is asked for at most one tool call per turn (default: true)
    pub fn allow_parallel_tool_calls(mut self, allow: bool) -> Self {
        self.allow_parallel_tool_calls = allow;
        self
    }

    pub fn build(self) -> FunctionCallingAgent {
        let chat = ChatSession::builder(self.broker)
            .system_prompt(self.system_prompt)
            .tools(self.tools)
            .parallel_tool_calls(self.allow_parallel_tool_calls)
            .build();

        FunctionCallingAgent {
            chat,
            verbose: self.verbose,
        }
    }
}
