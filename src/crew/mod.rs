//! Multi-agent crews: personas with tools working through a list of tasks,
//! either one after another or under a delegating manager.

pub mod agent;
#[allow(clippy::module_inception)]
pub mod crew;
pub mod delegation;
pub mod task;

pub use agent::{Agent, AgentBuilder};
pub use crew::{Crew, CrewBuilder, CrewOutput, Process};
pub use delegation::delegation_tools;
pub use task::{Task, TaskOutput};
