use crate::crew::agent::Agent;
use crate::crew::delegation::delegation_tools;
use crate::crew::task::{Task, TaskOutput};
use crate::error::{CrewLabError, Result};
use crate::llm::tools::LlmTool;
use crate::llm::LlmBroker;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::info;

const MANAGER_ROLE: &str = "Crew Manager";
const MANAGER_GOAL: &str = "Manage the team to complete the task in the best way possible.";
const MANAGER_BACKSTORY: &str = "You are a seasoned manager with a knack for getting the best out of your team. \
You are known for delegating work to the right people and asking the right questions. \
You do not perform tasks yourself, but your experience lets you evaluate the work of your team members.";

const CONTEXT_SEPARATOR: &str = "\n\n----------\n\n";

/// How a crew's tasks are assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Process {
    /// Each task runs on its own agent, in order
    #[default]
    Sequential,
    /// A manager runs every task, delegating to the crew's agents
    Hierarchical,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CrewOutput {
    /// Output of the last task
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
}

impl fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Agents and tasks run together under a [`Process`].
///
/// # Examples
///
/// ```ignore
/// let crew = Crew::builder()
///     .agents(vec![researcher, verifier])
///     .tasks(vec![search, verify])
///     .process(Process::Hierarchical)
///     .manager_llm(settings.crew_broker()?)
///     .build();
///
/// println!("{}", crew.kickoff().await?);
/// ```
pub struct Crew {
    agents: Vec<Arc<Agent>>,
    tasks: Vec<Task>,
    process: Process,
    manager_llm: Option<LlmBroker>,
    manager_agent: Option<Agent>,
    verbose: bool,
}

impl Crew {
    pub fn builder() -> CrewBuilder {
        CrewBuilder::default()
    }

    pub fn agents(&self) -> &[Arc<Agent>] {
        &self.agents
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn process(&self) -> Process {
        self.process
    }

    /// Check the crew's shape without running anything.
    pub fn validate(&self) -> Result<()> {
        if self.tasks.is_empty() {
            return Err(CrewLabError::CrewError("A crew needs at least one task".to_string()));
        }

        for (position, task) in self.tasks.iter().enumerate() {
            if let Some(names) = task.context_tasks() {
                for name in names {
                    if !self.tasks[..position].iter().any(|t| t.name() == name) {
                        return Err(CrewLabError::CrewError(format!(
                            "Task '{}' uses the output of '{}', which is not an earlier task",
                            task.name(),
                            name
                        )));
                    }
                }
            }

            if self.process == Process::Sequential {
                let role = task.agent_role().ok_or_else(|| {
                    CrewLabError::CrewError(format!(
                        "Task '{}' has no agent; sequential crews need one per task",
                        task.name()
                    ))
                })?;
                self.find_agent(role)?;
            }
        }

        if self.process == Process::Hierarchical
            && self.manager_llm.is_none()
            && self.manager_agent.is_none()
        {
            return Err(CrewLabError::CrewError(
                "A hierarchical crew needs a manager_llm or a manager_agent".to_string(),
            ));
        }

        Ok(())
    }

    /// Run every task and collect the outputs.
    pub async fn kickoff(&self) -> Result<CrewOutput> {
        self.validate()?;
        info!(process = ?self.process, tasks = self.tasks.len(), "Crew kickoff");

        let default_manager;
        let manager: Option<(&Agent, Vec<Box<dyn LlmTool>>)> = match self.process {
            Process::Sequential => None,
            Process::Hierarchical => {
                let agent = match &self.manager_agent {
                    Some(agent) => agent,
                    None => {
                        default_manager = self.default_manager()?;
                        &default_manager
                    }
                };
                Some((agent, delegation_tools(self.agents.clone())))
            }
        };

        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            let context = context_for(task, &outputs);

            let (agent_role, raw) = match &manager {
                Some((manager, tools)) => {
                    let raw = manager.run_with_tools(task, context.as_deref(), tools).await?;
                    (manager.role().to_string(), raw)
                }
                None => {
                    let agent = self.find_agent(task.agent_role().unwrap_or_default())?;
                    let extra = if agent.allow_delegation() {
                        self.coworkers_of(agent)
                    } else {
                        Vec::new()
                    };
                    let raw = agent.execute_task(task, context.as_deref(), &extra).await?;
                    (agent.role().to_string(), raw)
                }
            };

            if self.verbose {
                info!(task = task.name(), agent = %agent_role, output = %raw, "Task completed");
            } else {
                info!(task = task.name(), agent = %agent_role, "Task completed");
            }

            outputs.push(TaskOutput {
                name: task.name().to_string(),
                description: task.description().to_string(),
                agent: agent_role,
                raw,
            });
        }

        let raw = outputs.last().map(|o| o.raw.clone()).unwrap_or_default();
        Ok(CrewOutput {
            raw,
            tasks_output: outputs,
        })
    }

    fn find_agent(&self, role: &str) -> Result<&Arc<Agent>> {
        self.agents.iter().find(|a| a.matches_role(role)).ok_or_else(|| {
            let roles: Vec<&str> = self.agents.iter().map(|a| a.role()).collect();
            CrewLabError::CrewError(format!(
                "No agent with role '{}' in the crew (available: {})",
                role,
                roles.join(", ")
            ))
        })
    }

    fn coworkers_of(&self, agent: &Arc<Agent>) -> Vec<Box<dyn LlmTool>> {
        let others: Vec<Arc<Agent>> =
            self.agents.iter().filter(|a| !Arc::ptr_eq(a, agent)).cloned().collect();
        if others.is_empty() {
            Vec::new()
        } else {
            delegation_tools(others)
        }
    }

    fn default_manager(&self) -> Result<Agent> {
        let broker = self.manager_llm.clone().ok_or_else(|| {
            CrewLabError::CrewError("A hierarchical crew needs a manager_llm or a manager_agent".to_string())
        })?;

        Ok(Agent::builder(MANAGER_ROLE, MANAGER_GOAL, MANAGER_BACKSTORY, broker)
            .allow_delegation(true)
            .verbose(self.verbose)
            .build())
    }
}

fn context_for(task: &Task, outputs: &[TaskOutput]) -> Option<String> {
    let selected: Vec<&str> = match task.context_tasks() {
        Some(names) => outputs
            .iter()
            .filter(|o| names.iter().any(|n| n == &o.name))
            .map(|o| o.raw.as_str())
            .collect(),
        None => outputs.iter().map(|o| o.raw.as_str()).collect(),
    };

    if selected.is_empty() {
        None
    } else {
        Some(selected.join(CONTEXT_SEPARATOR))
    }
}

#[derive(Default)]
pub struct CrewBuilder {
    agents: Vec<Arc<Agent>>,
    tasks: Vec<Task>,
    process: Process,
    manager_llm: Option<LlmBroker>,
    manager_agent: Option<Agent>,
    verbose: bool,
}

impl CrewBuilder {
    pub fn agents(mut self, agents: Vec<Agent>) -> Self {
        self.agents = agents.into_iter().map(Arc::new).collect();
        self
    }

    pub fn tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn process(mut self, process: Process) -> Self {
        self.process = process;
        self
    }

    /// Model for the default manager of a hierarchical crew
    pub fn manager_llm(mut self, broker: LlmBroker) -> Self {
        self.manager_llm = Some(broker);
        self
    }

    /// A custom manager for a hierarchical crew; its own tools are not used
    pub fn manager_agent(mut self, agent: Agent) -> Self {
        self.manager_agent = Some(agent);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn build(self) -> Crew {
        Crew {
            agents: self.agents,
            tasks: self.tasks,
            process: self.process,
            manager_llm: self.manager_llm,
            manager_agent: self.manager_agent,
            verbose: self.verbose,
        }
    }
}
