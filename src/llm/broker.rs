use crate::error::{CrewLabError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmMessage, LlmToolCall};
use crate::llm::tools::LlmTool;
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// Main interface for LLM interactions
#[derive(Clone)]
pub struct LlmBroker {
    model: String,
    gateway: Arc<dyn LlmGateway>,
    max_tool_rounds: usize,
}

impl LlmBroker {
    /// Create a new LLM broker
    pub fn new(model: impl Into<String>, gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            model: model.into(),
            gateway,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Limit the number of consecutive tool-calling rounds in one `generate` call
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate text response from LLM
    ///
    /// Tool calls requested by the model are executed and their results fed back until
    /// the model answers in plain text.
    pub async fn generate(
        &self,
        messages: &[LlmMessage],
        tools: Option<&[Box<dyn LlmTool>]>,
        config: Option<CompletionConfig>,
    ) -> Result<String> {
        let config = config.unwrap_or_default();
        let mut current_messages = messages.to_vec();

        for round in 0..=self.max_tool_rounds {
            let response =
                self.gateway.complete(&self.model, &current_messages, tools, &config).await?;

            if response.tool_calls.is_empty() {
                return Ok(response.content.unwrap_or_default());
            }

            if round == self.max_tool_rounds {
                break;
            }

            info!(round, count = response.tool_calls.len(), "Tool calls requested");

            current_messages.push(LlmMessage::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for tool_call in &response.tool_calls {
                let output = self.run_tool(tool_call, tools.unwrap_or(&[])).await;
                current_messages.push(LlmMessage::tool_result(tool_call, output));
            }
        }

        Err(CrewLabError::AgentError(format!(
            "Tool calling did not finish within {} rounds",
            self.max_tool_rounds
        )))
    }

    async fn run_tool(&self, tool_call: &LlmToolCall, tools: &[Box<dyn LlmTool>]) -> String {
        let Some(tool) = tools.iter().find(|t| t.matches(&tool_call.name)) else {
            warn!(tool = %tool_call.name, "Tool not found");
            return format!("Error: tool '{}' is not available", tool_call.name);
        };

        info!(tool = %tool_call.name, "Executing tool");
        debug!(arguments = ?tool_call.arguments, "Tool arguments");

        match tool.run(&tool_call.arguments).await {
            Ok(serde_json::Value::String(text)) => text,
            Ok(value) => value.to_string(),
            Err(e) => {
                warn!(tool = %tool_call.name, error = %e, "Tool failed");
                format!("Error: {}", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::models::MessageRole;
    use crate::llm::testing::{text, tool_call, ScriptedGateway};
    use crate::llm::tools::ToolDescriptor;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    #[derive(Clone)]
    struct MockTool {
        name: String,
        result: Value,
    }

    #[async_trait]
    impl LlmTool for MockTool {
        async fn run(&self, _args: &HashMap<String, Value>) -> Result<Value> {
            Ok(self.result.clone())
        }

        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::function(&self.name, "A mock tool", json!({}))
        }

        fn clone_box(&self) -> Box<dyn LlmTool> {
            Box::new(self.clone())
        }
    }

    #[derive(Clone)]
    struct FailingTool;

    #[async_trait]
    impl LlmTool for FailingTool {
        async fn run(&self, _args: &HashMap<String, Value>) -> Result<Value> {
            Err(CrewLabError::ToolError("boom".to_string()))
        }

        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::function("failing", "Always fails", json!({}))
        }

        fn clone_box(&self) -> Box<dyn LlmTool> {
            Box::new(self.clone())
        }
    }

    fn mock_tool(name: &str, result: Value) -> Box<dyn LlmTool> {
        Box::new(MockTool {
            name: name.to_string(),
            result,
        })
    }

    #[tokio::test]
    async fn test_broker_new_string_conversion() {
        let gateway = Arc::new(ScriptedGateway::new(vec![]));
        let broker = LlmBroker::new(String::from("my-model"), gateway);
        assert_eq!(broker.model(), "my-model");
        assert_eq!(broker.max_tool_rounds, DEFAULT_MAX_TOOL_ROUNDS);
    }

    #[tokio::test]
    async fn test_generate_simple_response() {
        let gateway = Arc::new(ScriptedGateway::texts(&["Hello, World!"]));
        let broker = LlmBroker::new("test-model", gateway);

        let messages = vec![LlmMessage::user("Hi")];
        let result = broker.generate(&messages, None, None).await.unwrap();

        assert_eq!(result, "Hello, World!");
    }

    #[tokio::test]
    async fn test_generate_empty_content() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Default::default()]));
        let broker = LlmBroker::new("test-model", gateway);

        let result = broker.generate(&[LlmMessage::user("Hi")], None, None).await.unwrap();
        assert_eq!(result, "");
    }

    #[tokio::test]
    async fn test_generate_runs_tool_and_feeds_result_back() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            tool_call("lookup", json!({"key": "a"})),
            text("The answer is 42"),
        ]));
        let broker = LlmBroker::new("test-model", gateway.clone());
        let tools = vec![mock_tool("lookup", json!("42"))];

        let result =
            broker.generate(&[LlmMessage::user("What?")], Some(&tools), None).await.unwrap();

        assert_eq!(result, "The answer is 42");
        assert_eq!(gateway.call_count(), 2);

        let requests = gateway.requests.lock().unwrap();
        let second = &requests[1];
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].role, MessageRole::Assistant);
        assert_eq!(second[1].tool_calls.as_ref().unwrap()[0].name, "lookup");
        assert_eq!(second[2].role, MessageRole::Tool);
        assert_eq!(second[2].content.as_deref(), Some("42"));
        assert_eq!(second[2].tool_call_id.as_deref(), Some("call_lookup"));
    }

    #[tokio::test]
    async fn test_generate_serializes_structured_tool_output() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            tool_call("lookup", json!({})),
            text("done"),
        ]));
        let broker = LlmBroker::new("test-model", gateway.clone());
        let tools = vec![mock_tool("lookup", json!({"count": 3}))];

        broker.generate(&[LlmMessage::user("Go")], Some(&tools), None).await.unwrap();

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests[1][2].content.as_deref(), Some(r#"{"count":3}"#));
    }

    #[tokio::test]
    async fn test_generate_answers_every_call_in_a_round() {
        let mut both = tool_call("first", json!({}));
        both.tool_calls.extend(tool_call("second", json!({})).tool_calls);

        let gateway = Arc::new(ScriptedGateway::new(vec![both, text("ok")]));
        let broker = LlmBroker::new("test-model", gateway.clone());
        let tools = vec![mock_tool("first", json!("1")), mock_tool("second", json!("2"))];

        broker.generate(&[LlmMessage::user("Go")], Some(&tools), None).await.unwrap();

        let requests = gateway.requests.lock().unwrap();
        let tool_messages: Vec<_> = requests[1]
            .iter()
            .filter(|m| m.role == MessageRole::Tool)
            .filter_map(|m| m.content.clone())
            .collect();
        assert_eq!(tool_messages, vec!["1".to_string(), "2".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_message() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            tool_call("missing", json!({})),
            text("recovered"),
        ]));
        let broker = LlmBroker::new("test-model", gateway.clone());
        let tools = vec![mock_tool("lookup", json!("x"))];

        let result =
            broker.generate(&[LlmMessage::user("Go")], Some(&tools), None).await.unwrap();
        assert_eq!(result, "recovered");

        let requests = gateway.requests.lock().unwrap();
        let feedback = requests[1][2].content.clone().unwrap();
        assert!(feedback.starts_with("Error:"));
        assert!(feedback.contains("missing"));
    }

    #[tokio::test]
    async fn test_failing_tool_becomes_error_message() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            tool_call("failing", json!({})),
            text("handled"),
        ]));
        let broker = LlmBroker::new("test-model", gateway.clone());
        let tools: Vec<Box<dyn LlmTool>> = vec![Box::new(FailingTool)];

        let result =
            broker.generate(&[LlmMessage::user("Go")], Some(&tools), None).await.unwrap();
        assert_eq!(result, "handled");

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests[1][2].content.as_deref(), Some("Error: Tool error: boom"));
    }

    #[tokio::test]
    async fn test_tool_round_limit_is_an_agent_error() {
        let responses = (0..5).map(|_| tool_call("lookup", json!({}))).collect();
        let gateway = Arc::new(ScriptedGateway::new(responses));
        let broker = LlmBroker::new("test-model", gateway.clone()).with_max_tool_rounds(2);
        let tools = vec![mock_tool("lookup", json!("again"))];

        let err = broker.generate(&[LlmMessage::user("Go")], Some(&tools), None).await.unwrap_err();

        assert!(matches!(err, CrewLabError::AgentError(_)));
        assert_eq!(gateway.call_count(), 3);
    }

    #[tokio::test]
    async fn test_tools_are_offered_to_gateway() {
        let gateway = Arc::new(ScriptedGateway::texts(&["ok"]));
        let broker = LlmBroker::new("test-model", gateway.clone());
        let tools = vec![mock_tool("lookup", json!("x"))];

        broker.generate(&[LlmMessage::user("Go")], Some(&tools), None).await.unwrap();

        let offered = gateway.offered_tools.lock().unwrap();
        assert_eq!(offered[0], vec!["lookup".to_string()]);
    }
}
