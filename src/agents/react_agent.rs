//! Agent driven by a plain-text reasoning protocol instead of native tool calls.
//!
//! Each model turn is one of
//!
//! ```text
//! Thought: ...
//! Action: <tool name>
//! Action Input: {"arg": "value"}
//! ```
//!
//! or
//!
//! ```text
//! Thought: ...
//! Answer: ...
//! ```
//!
//! Tool results are fed back as `Observation:` messages until the model answers.

use crate::error::{CrewLabError, Result};
use crate::llm::gateway::CompletionConfig;
use crate::llm::gateways::TokenizerGateway;
use crate::llm::models::LlmMessage;
use crate::llm::tools::LlmTool;
use crate::llm::LlmBroker;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

const DEFAULT_MAX_STEPS: usize = 10;
const DEFAULT_MAX_MEMORY_TOKENS: usize = 8192;

static STEP_PARSER: LazyLock<std::result::Result<StepParser, String>> =
    LazyLock::new(|| StepParser::new().map_err(|e| e.to_string()));

/// One parsed model turn
#[derive(Debug, Clone, PartialEq)]
pub enum ReActStep {
    Action {
        thought: String,
        tool: String,
        input: HashMap<String, Value>,
    },
    Answer {
        thought: String,
        answer: String,
    },
    /// The turn could not be understood; the reason is shown to the model.
    Invalid(String),
}

struct StepParser {
    action: Regex,
    answer: Regex,
}

impl StepParser {
    fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| CrewLabError::AgentError(format!("Invalid pattern: {}", e)))
        };

        Ok(Self {
            action: compile(
                r"(?s)(?:Thought:\s*(?P<thought>.*?)\s*)?Action:\s*(?P<tool>[^\n]+?)\s*\n\s*Action Input:\s*(?P<input>.*)",
            )?,
            answer: compile(r"(?s)(?:Thought:\s*(?P<thought>.*?)\s*)?Answer:\s*(?P<answer>.*)")?,
        })
    }

    fn parse(&self, text: &str) -> ReActStep {
        let action_at = text.find("Action:");
        let answer_at = text.find("Answer:");

        let wants_action = match (action_at, answer_at) {
            (Some(action), Some(answer)) => action < answer,
            (Some(_), None) => true,
            _ => false,
        };

        if wants_action {
            return match self.action.captures(text) {
                Some(caps) => {
                    let thought = group(&caps, "thought");
                    let tool = group(&caps, "tool")
                        .trim_matches(|c: char| c == '`' || c == '"' || c == '\'')
                        .to_string();
                    match parse_action_input(&group(&caps, "input")) {
                        Ok(input) => ReActStep::Action {
                            thought,
                            tool,
                            input,
                        },
                        Err(reason) => ReActStep::Invalid(reason),
                    }
                }
                None => ReActStep::Invalid(
                    "An Action must be followed by a line starting with 'Action Input:'."
                        .to_string(),
                ),
            };
        }

        if let Some(caps) = self.answer.captures(text) {
            return ReActStep::Answer {
                thought: group(&caps, "thought"),
                answer: group(&caps, "answer"),
            };
        }

        if !text.contains("Thought:") {
            return ReActStep::Answer {
                thought: String::new(),
                answer: text.trim().to_string(),
            };
        }

        ReActStep::Invalid(
            "Reply with either an 'Action:' and 'Action Input:' or an 'Answer:'.".to_string(),
        )
    }
}

fn group(caps: &regex::Captures, name: &str) -> String {
    caps.name(name).map(|m| m.as_str().trim().to_string()).unwrap_or_default()
}

/// The action input must be a JSON object; a bare `{}`-less value is rejected.
fn parse_action_input(raw: &str) -> std::result::Result<HashMap<String, Value>, String> {
    let start = raw.find('{');
    let end = raw.rfind('}');

    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => return Err("Action Input must be a JSON object, e.g. {\"query\": \"...\"}.".to_string()),
    };

    serde_json::from_str(json)
        .map_err(|e| format!("Could not parse Action Input as a JSON object: {}", e))
}

/// Reasoning-and-acting agent with conversation memory.
///
/// # Examples
///
/// ```ignore
/// use crewlab::agents::ReActAgent;
///
/// let mut agent = ReActAgent::builder(broker)
///     .tools(vec![engagement_tool(), search_articles_tool(arxiv)])
///     .verbose(true)
///     .build();
///
/// let answer = agent.chat("Quais artigos existem sobre IA generativa?").await?;
/// ```
pub struct ReActAgent {
    broker: LlmBroker,
    tools: Vec<Box<dyn LlmTool>>,
    max_steps: usize,
    verbose: bool,
    context: Option<String>,
    memory: Vec<LlmMessage>,
    max_memory_tokens: usize,
    tokenizer: TokenizerGateway,
}

impl ReActAgent {
    pub fn new(broker: LlmBroker, tools: Vec<Box<dyn LlmTool>>) -> Self {
        Self::builder(broker).tools(tools).build()
    }

    pub fn builder(broker: LlmBroker) -> ReActAgentBuilder {
        ReActAgentBuilder::new(broker)
    }

    /// Answer a message, calling tools as the model requests them.
    ///
    /// Running out of steps before an `Answer:` is an [`CrewLabError::AgentError`].
    pub async fn chat(&mut self, message: &str) -> Result<String> {
        let parser = STEP_PARSER.as_ref().map_err(|e| CrewLabError::AgentError(e.clone()))?;

        let mut messages = Vec::with_capacity(self.memory.len() + 2);
        messages.push(LlmMessage::system(self.system_prompt()));
        messages.extend(self.memory.iter().cloned());
        messages.push(LlmMessage::user(message));

        let config = CompletionConfig {
            temperature: 0.0,
            ..Default::default()
        };

        for step in 1..=self.max_steps {
            let reply = self.broker.generate(&messages, None, Some(config.clone())).await?;
            let reply = strip_hallucinated_observation(&reply);

            match parser.parse(reply) {
                ReActStep::Answer { thought, answer } => {
                    self.log_step(step, "answer", &thought, &answer);
                    self.remember(message, &answer);
                    return Ok(answer);
                }
                ReActStep::Action {
                    thought,
                    tool,
                    input,
                } => {
                    self.log_step(step, "action", &thought, &tool);
                    let observation = self.call_tool(&tool, &input).await;
                    self.log_step(step, "observation", "", &observation);

                    messages.push(LlmMessage::assistant(reply));
                    messages.push(LlmMessage::user(format!("Observation: {}", observation)));
                }
                ReActStep::Invalid(reason) => {
                    warn!(step, reason = reason.as_str(), "Could not parse agent step");
                    messages.push(LlmMessage::assistant(reply));
                    messages.push(LlmMessage::user(format!("Observation: Error: {}", reason)));
                }
            }
        }

        Err(CrewLabError::AgentError(format!(
            "Reached the maximum of {} reasoning steps without an answer",
            self.max_steps
        )))
    }

    /// Forget previous questions and answers.
    pub fn reset(&mut self) {
        self.memory.clear();
    }

    pub fn memory(&self) -> &[LlmMessage] {
        &self.memory
    }

    /// Keep a question/answer pair, dropping the oldest pairs beyond the memory token budget.
    fn remember(&mut self, question: &str, answer: &str) {
        self.memory.push(LlmMessage::user(question));
        self.memory.push(LlmMessage::assistant(answer));

        let tokenizer = &self.tokenizer;
        let count = |m: &LlmMessage| m.content.as_deref().map(|c| tokenizer.count_tokens(c)).unwrap_or(0);
        let mut total: usize = self.memory.iter().map(count).sum();

        while total > self.max_memory_tokens && self.memory.len() > 2 {
            for removed in self.memory.drain(..2) {
                total -= count(&removed);
            }
        }
    }

    async fn call_tool(&self, name: &str, input: &HashMap<String, Value>) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.matches(name)) else {
            return format!(
                "Error: no tool named '{}'. Available tools: {}",
                name,
                self.tool_names().join(", ")
            );
        };

        match tool.run(input).await {
            Ok(Value::String(text)) => text,
            Ok(value) => value.to_string(),
            Err(e) => format!("Error: {}", e),
        }
    }

    fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.descriptor().function.name).collect()
    }

    fn log_step(&self, step: usize, kind: &str, thought: &str, detail: &str) {
        if self.verbose {
            info!(step, kind, thought, detail, "ReAct step");
        } else {
            debug!(step, kind, thought, detail, "ReAct step");
        }
    }

    fn system_prompt(&self) -> String {
        let tool_descriptions: Vec<String> = self
            .tools
            .iter()
            .map(|t| {
                let d = t.descriptor().function;
                format!(
                    "> Tool Name: {}\nTool Description: {}\nTool Args: {}\n",
                    d.name, d.description, d.parameters
                )
            })
            .collect();

        let mut prompt = format!(
            "You are designed to help with a variety of tasks, from answering questions to \
             providing summaries to other types of analyses.\n\n\
             ## Tools\n\n\
             You have access to a wide variety of tools. You are responsible for using the tools \
             in any sequence you deem appropriate to complete the task at hand.\n\
             This may require breaking the task into subtasks and using different tools to \
             complete each subtask.\n\n\
             You have access to the following tools:\n{}\n\
             ## Output Format\n\n\
             Please answer in the same language as the question and use the following format:\n\n\
             ```\n\
             Thought: The current language of the user is: (user's language). I need to use a tool to help me answer the question.\n\
             Action: tool name (one of {}) if using a tool.\n\
             Action Input: the input to the tool, in a JSON format representing the kwargs (e.g. {{\"query\": \"hello world\"}})\n\
             ```\n\n\
             Please ALWAYS start with a Thought.\n\n\
             NEVER surround your response with markdown code markers. You may use code markers \
             within your response if you need to.\n\n\
             If this format is used, the tool will respond in the following format:\n\n\
             ```\n\
             Observation: tool response\n\
             ```\n\n\
             You should keep repeating the above format until you have enough information to \
             answer the question without using any more tools. At that point, you MUST respond \
             in one of the following two formats:\n\n\
             ```\n\
             Thought: I can answer without using any more tools. I'll use the user's language to answer\n\
             Answer: [your answer here (In the same language as the user's question)]\n\
             ```\n\n\
             ```\n\
             Thought: I cannot answer the question with the provided tools.\n\
             Answer: [your answer here (In the same language as the user's question)]\n\
             ```\n",
            tool_descriptions.join("\n"),
            self.tool_names().join(", ")
        );

        if let Some(context) = &self.context {
            prompt.push_str(&format!("\n## Additional Context\n{}\n", context));
        }

        prompt
    }
}

/// Drop anything the model wrote after inventing its own `Observation:`.
fn strip_hallucinated_observation(reply: &str) -> &str {
    match reply.find("\nObservation:") {
        Some(idx) => reply[..idx].trim_end(),
        None => reply.trim(),
    }
}

pub struct ReActAgentBuilder {
    broker: LlmBroker,
    tools: Vec<Box<dyn LlmTool>>,
    max_steps: usize,
    verbose: bool,
    context: Option<String>,
    max_memory_tokens: usize,
}

impl ReActAgentBuilder {
    fn new(broker: LlmBroker) -> Self {
        Self {
            broker,
            tools: Vec::new(),
            max_steps: DEFAULT_MAX_STEPS,
            verbose: false,
            context: None,
            max_memory_tokens: DEFAULT_MAX_MEMORY_TOKENS,
        }
    }

    pub fn tools(mut self, tools: Vec<Box<dyn LlmTool>>) -> Self {
        self.tools = tools;
        self
    }

    /// Maximum number of model turns per question (default: 10)
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Extra instructions appended to the system prompt
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Token budget for remembered questions and answers (default: 8192)
    pub fn max_memory_tokens(mut self, max_memory_tokens: usize) -> Self {
        self.max_memory_tokens = max_memory_tokens;
        self
    }

    pub fn build(self) -> ReActAgent {
        ReActAgent {
            broker: self.broker,
            tools: self.tools,
            max_steps: self.max_steps,
            verbose: self.verbose,
            context: self.context,
            memory: Vec::new(),
            max_memory_tokens: self.max_memory_tokens,
            tokenizer: TokenizerGateway::default(),
        }
    }
}
