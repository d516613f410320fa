//! Tools that let a manager (or a delegating agent) hand work to its coworkers.

use crate::crew::agent::Agent;
use crate::crew::task::Task;
use crate::llm::tools::{FunctionTool, LlmTool};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub const DELEGATE_WORK_TOOL: &str = "delegate_work_to_coworker";
pub const ASK_QUESTION_TOOL: &str = "ask_question_to_coworker";

const DELEGATED_EXPECTED_OUTPUT: &str =
    "Your best answer to your coworker asking you this, accounting for the context shared.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DelegateWorkArgs {
    /// The task to delegate
    pub task: String,
    /// Everything the coworker needs to know to do the task
    pub context: String,
    /// The role of the coworker to delegate to
    pub coworker: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AskQuestionArgs {
    /// The question to ask
    pub question: String,
    /// Everything the coworker needs to know to answer
    pub context: String,
    /// The role of the coworker to ask
    pub coworker: String,
}

/// Both delegation tools over the given coworkers.
pub fn delegation_tools(coworkers: Vec<Arc<Agent>>) -> Vec<Box<dyn LlmTool>> {
    let coworkers: Arc<[Arc<Agent>]> = coworkers.into();
    let roles = coworkers.iter().map(|a| a.role().to_string()).collect::<Vec<_>>().join(", ");

    let delegate = {
        let coworkers = Arc::clone(&coworkers);
        FunctionTool::from_fn(
            DELEGATE_WORK_TOOL,
            format!(
                "Delegate a specific task to one of the following coworkers: {}. \
                 The input must name the coworker, the task and all the context they need, \
                 because they know nothing about it beforehand.",
                roles
            ),
            move |args: DelegateWorkArgs| {
                let coworkers = Arc::clone(&coworkers);
                async move { Ok(run_coworker(&coworkers, &args.coworker, &args.task, &args.context).await) }
            },
        )
    };

    let ask = {
        let coworkers = Arc::clone(&coworkers);
        FunctionTool::from_fn(
            ASK_QUESTION_TOOL,
            format!(
                "Ask a specific question to one of the following coworkers: {}. \
                 The input must name the coworker, the question and all the context they need, \
                 because they know nothing about it beforehand.",
                roles
            ),
            move |args: AskQuestionArgs| {
                let coworkers = Arc::clone(&coworkers);
                async move {
                    Ok(run_coworker(&coworkers, &args.coworker, &args.question, &args.context).await)
                }
            },
        )
    };

    vec![Box::new(delegate), Box::new(ask)]
}

/// Run `request` on the coworker with the given role.
///
/// Failures come back as text so the calling agent can correct itself.
async fn run_coworker(coworkers: &[Arc<Agent>], coworker: &str, request: &str, context: &str) -> String {
    let Some(agent) = coworkers.iter().find(|a| a.matches_role(coworker)) else {
        let roles: Vec<&str> = coworkers.iter().map(|a| a.role()).collect();
        return format!(
            "Error executing tool. Coworker '{}' not found, it must be one of the following options:\n- {}",
            coworker,
            roles.join("\n- ")
        );
    };

    info!(coworker = agent.role(), "Delegating to coworker");
    let task = Task::new(format!("delegated to {}", agent.role()), request, DELEGATED_EXPECTED_OUTPUT);

    match agent.execute_task(&task, Some(context), &[]).await {
        Ok(output) => output,
        Err(e) => format!("Error executing tool. {} failed: {}", agent.role(), e),
    }
}
