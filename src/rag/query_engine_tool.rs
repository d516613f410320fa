use crate::error::Result;
use crate::llm::tools::{parameters_schema, parse_args, LlmTool, ToolDescriptor};
use crate::rag::query_engine::QueryEngine;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryEngineArgs {
    /// Pergunta a ser respondida a partir dos documentos indexados
    pub input: String,
}

/// Exposes a [`QueryEngine`] to agents as a named tool.
#[derive(Clone)]
pub struct QueryEngineTool {
    engine: QueryEngine,
    name: String,
    description: String,
}

impl QueryEngineTool {
    pub fn new(engine: QueryEngine, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            engine,
            name: name.into(),
            description: description.into(),
        }
    }
}

#[async_trait]
impl LlmTool for QueryEngineTool {
    async fn run(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let args: QueryEngineArgs = parse_args(args)?;
        let response = self.engine.query(&args.input).await?;
        Ok(json!(response.response))
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::function(&self.name, &self.description, parameters_schema::<QueryEngineArgs>())
    }

    fn clone_box(&self) -> Box<dyn LlmTool> {
        Box::new(self.clone())
    }
}
