use serde::Serialize;

/// A unit of work for a crew.
///
/// `context` lists the names of earlier tasks whose outputs are handed to this one.
/// When it is left unset the task sees the outputs of every task before it.
#[derive(Debug, Clone)]
pub struct Task {
    name: String,
    description: String,
    expected_output: String,
    agent: Option<String>,
    context: Option<Vec<String>>,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent: None,
            context: None,
        }
    }

    /// Role of the crew agent that runs this task
    pub fn agent(mut self, role: impl Into<String>) -> Self {
        self.agent = Some(role.into());
        self
    }

    pub fn context<I, S>(mut self, task_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context = Some(task_names.into_iter().map(Into::into).collect());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    pub fn agent_role(&self) -> Option<&str> {
        self.agent.as_deref()
    }

    pub fn context_tasks(&self) -> Option<&[String]> {
        self.context.as_deref()
    }
}

/// What one task produced.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskOutput {
    pub name: String,
    pub description: String,
    /// Role of the agent that produced the output
    pub agent: String,
    pub raw: String,
}
