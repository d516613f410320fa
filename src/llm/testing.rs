//! Scripted gateway shared by the unit tests of modules that sit on top of the broker.

use crate::error::Result;
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmGatewayResponse, LlmMessage, LlmToolCall};
use crate::llm::tools::LlmTool;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Replays a fixed list of responses and records every request it sees.
pub struct ScriptedGateway {
    responses: Mutex<Vec<LlmGatewayResponse>>,
    pub requests: Mutex<Vec<Vec<LlmMessage>>>,
    pub offered_tools: Mutex<Vec<Vec<String>>>,
}

impl ScriptedGateway {
    pub fn new(responses: Vec<LlmGatewayResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            offered_tools: Mutex::new(Vec::new()),
        }
    }

    /// A gateway that answers each call with the next text, in order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| text(t)).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

pub fn text(content: &str) -> LlmGatewayResponse {
    LlmGatewayResponse {
        content: Some(content.to_string()),
        tool_calls: vec![],
    }
}

pub fn tool_call(name: &str, arguments: Value) -> LlmGatewayResponse {
    let arguments: HashMap<String, Value> = match arguments {
        Value::Object(map) => map.into_iter().collect(),
        _ => HashMap::new(),
    };
    LlmGatewayResponse {
        content: None,
        tool_calls: vec![LlmToolCall {
            id: Some(format!("call_{}", name)),
            name: name.to_string(),
            arguments,
        }],
    }
}

#[async_trait::async_trait]
impl LlmGateway for ScriptedGateway {
    async fn complete(
        &self,
        _model: &str,
        messages: &[LlmMessage],
        tools: Option<&[Box<dyn LlmTool>]>,
        _config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.offered_tools.lock().unwrap().push(
            tools
                .unwrap_or(&[])
                .iter()
                .map(|t| t.descriptor().function.name)
                .collect(),
        );

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(text("default response"))
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn get_available_models(&self) -> Result<Vec<String>> {
        Ok(vec!["test-model".to_string()])
    }

    async fn calculate_embeddings(&self, text: &str, _model: Option<&str>) -> Result<Vec<f32>> {
        Ok(keyword_embedding(text))
    }
}

/// Deterministic bag-of-keywords embedding so retrieval order is predictable in tests.
pub fn keyword_embedding(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    ["algoritmo", "tendência", "ética", "rede"]
        .iter()
        .map(|k| lower.matches(k).count() as f32)
        .chain(std::iter::once(0.1))
        .collect()
}
