use crate::crew::task::Task;
use crate::error::Result;
use crate::llm::tools::{clone_tools, LlmTool};
use crate::llm::{LlmBroker, LlmMessage};
use tracing::{debug, info};

pub const DEFAULT_MAX_ITER: usize = 20;

/// A crew member: a persona (role, goal, backstory) with its own tools and model.
///
/// ```ignore
/// let researcher = Agent::builder(
///     "Pesquisador Científico do Arxiv",
///     "Encontrar artigos científicos relevantes no arXiv.",
///     "Você é um especialista em navegar e extrair informações do arXiv.",
///     broker,
/// )
/// .tools(arxiv_tools(client))
/// .verbose(true)
/// .build();
/// ```
pub struct Agent {
    role: String,
    goal: String,
    backstory: String,
    tools: Vec<Box<dyn LlmTool>>,
    broker: LlmBroker,
    allow_delegation: bool,
    verbose: bool,
    max_iter: usize,
}

impl Agent {
    pub fn builder(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        broker: LlmBroker,
    ) -> AgentBuilder {
        AgentBuilder {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            broker,
            tools: Vec::new(),
            allow_delegation: false,
            verbose: false,
            max_iter: DEFAULT_MAX_ITER,
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn backstory(&self) -> &str {
        &self.backstory
    }

    pub fn tools(&self) -> &[Box<dyn LlmTool>] {
        &self.tools
    }

    pub fn allow_delegation(&self) -> bool {
        self.allow_delegation
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    pub(crate) fn matches_role(&self, name: &str) -> bool {
        self.role.trim().to_lowercase() == name.trim().to_lowercase()
    }

    /// Run a task with this agent's tools plus `extra_tools`.
    pub async fn execute_task(
        &self,
        task: &Task,
        context: Option<&str>,
        extra_tools: &[Box<dyn LlmTool>],
    ) -> Result<String> {
        let mut tools = clone_tools(&self.tools);
        tools.extend(clone_tools(extra_tools));
        self.run_with_tools(task, context, &tools).await
    }

    /// Run a task with exactly the given tools, ignoring the agent's own.
    pub(crate) async fn run_with_tools(
        &self,
        task: &Task,
        context: Option<&str>,
        tools: &[Box<dyn LlmTool>],
    ) -> Result<String> {
        if self.verbose {
            info!(agent = %self.role, task = %task.name(), "Agent started task");
        } else {
            debug!(agent = %self.role, task = %task.name(), "Agent started task");
        }

        let messages = vec![
            LlmMessage::system(self.system_prompt()),
            LlmMessage::user(task_prompt(task, context)),
        ];
        let tools = if tools.is_empty() { None } else { Some(tools) };
        let output = self.broker.generate(&messages, tools, None).await?;

        if self.verbose {
            info!(agent = %self.role, task = %task.name(), output = %output, "Agent finished task");
        } else {
            debug!(agent = %self.role, task = %task.name(), "Agent finished task");
        }

        Ok(output)
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        )
    }
}

fn task_prompt(task: &Task, context: Option<&str>) -> String {
    let mut prompt = format!(
        "Current Task: {}\n\nThis is the expected criteria for your final answer: {}\n\
         You MUST return the actual complete content as the final answer, not a summary.",
        task.description(),
        task.expected_output()
    );

    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(context);
    }

    prompt.push_str("\n\nBegin! Use the tools available when they help and give your best final answer.");
    prompt
}

pub struct AgentBuilder {
    role: String,
    goal: String,
    backstory: String,
    broker: LlmBroker,
    tools: Vec<Box<dyn LlmTool>>,
    allow_delegation: bool,
    verbose: bool,
    max_iter: usize,
}

impl AgentBuilder {
    pub fn tools(mut self, tools: Vec<Box<dyn LlmTool>>) -> Self {
        self.tools = tools;
        self
    }

    /// Let the agent hand work to the other agents of its crew (default: false)
    pub fn allow_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Maximum tool-calling rounds per task (default: 20)
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn build(self) -> Agent {
        Agent {
            role: self.role,
            goal: self.goal,
            backstory: self.backstory,
            tools: self.tools,
            broker: self.broker.with_max_tool_rounds(self.max_iter),
            allow_delegation: self.allow_delegation,
            verbose: self.verbose,
            max_iter: self.max_iter,
        }
    }
}
