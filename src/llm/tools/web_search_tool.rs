use crate::error::{CrewLabError, Result};
use crate::llm::tools::function_tool::{parameters_schema, parse_args};
use crate::llm::tools::{LlmTool, ToolDescriptor};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;

pub const TAVILY_BASE_URL: &str = "https://api.tavily.com";
const DEFAULT_MAX_RESULTS: usize = 6;
const TIMEOUT_SECONDS: u64 = 30;

/// A web search result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    /// Extract of the page relevant to the query
    pub snippet: String,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize, JsonSchema)]
struct SearchArgs {
    /// The search query
    query: String,
    /// Maximum number of results to return
    max_results: Option<usize>,
}

/// Tool for searching the web through the Tavily search API
///
/// # Examples
///
/// ```ignore
/// use crewlab::llm::tools::WebSearchTool;
///
/// let tool = WebSearchTool::new(tavily_key);
/// let mut args = HashMap::new();
/// args.insert("query".to_string(), serde_json::json!("tendências em IA 2024"));
///
/// let results = tool.run(&args).await?;
/// ```
#[derive(Clone)]
pub struct WebSearchTool {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, TAVILY_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECONDS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Perform the web search
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        info!(query, max_results, "Searching the web");

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&json!({
                "api_key": self.api_key,
                "query": query,
                "max_results": max_results,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CrewLabError::ApiError(format!(
                "Search request failed with status {}",
                response.status()
            )));
        }

        let body: TavilyResponse = response.json().await?;

        Ok(body
            .results
            .into_iter()
            .take(max_results)
            .map(|r| SearchResult {
                title: r.title.trim().to_string(),
                url: r.url,
                snippet: clean_text(&r.content),
            })
            .collect())
    }
}

/// Collapse runs of whitespace into single spaces
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl LlmTool for WebSearchTool {
    async fn run(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let args: SearchArgs = parse_args(args)?;

        if args.query.trim().is_empty() {
            return Err(CrewLabError::InvalidArgument(
                "query parameter cannot be empty".to_string(),
            ));
        }

        let results = self.search(&args.query, args.max_results.unwrap_or(self.max_results)).await?;

        Ok(json!(results))
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::function(
            "search",
            "Search the web for up-to-date information. Returns the title, URL, and a relevant snippet for each result.",
            parameters_schema::<SearchArgs>(),
        )
    }

    fn clone_box(&self) -> Box<dyn LlmTool> {
        Box::new(self.clone())
    }
}
