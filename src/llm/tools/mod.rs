pub mod arxiv;
pub mod engagement;
pub mod function_tool;
mod tool;
pub mod web_search_tool;

pub use arxiv::{arxiv_tools, ArxivClient};
pub use engagement::{calculate_engagement, engagement_tool};
pub use function_tool::{parameters_schema, parse_args, FunctionTool};
pub use tool::{clone_tools, FunctionDescriptor, LlmTool, ToolDescriptor};
pub use web_search_tool::{SearchResult, WebSearchTool};
