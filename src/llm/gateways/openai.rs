//! Gateway for OpenAI-compatible chat and embedding APIs.
//!
//! Groq and NVIDIA NIM both expose the OpenAI wire format, so a single gateway serves
//! both; the presets only differ in base URL and embedding defaults.

use crate::error::{CrewLabError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::gateways::openai_messages_adapter::{adapt_messages_to_openai, convert_tool_calls};
use crate::llm::models::{LlmGatewayResponse, LlmMessage};
use crate::llm::tools::LlmTool;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const NVIDIA_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";
const NVIDIA_EMBEDDING_MODEL: &str = "nv-embed-qa-e4";

/// Configuration for connecting to an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Option<std::time::Duration>,
    /// Model used by `calculate_embeddings` when the caller does not name one
    pub embedding_model: String,
    /// Upper bound, in tokens, of each piece sent to the embeddings endpoint
    pub embedding_chunk_tokens: usize,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: OPENAI_BASE_URL.to_string(),
            timeout: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_chunk_tokens: 8191,
        }
    }
}

/// Gateway for OpenAI-compatible LLM services.
///
/// Supports text generation, tool calling, and embeddings.
pub struct OpenAIGateway {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIGateway {
    /// Create a new gateway with custom configuration.
    pub fn with_config(config: OpenAIConfig) -> Self {
        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build().unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    /// Create gateway with custom API key and base URL.
    pub fn with_api_key_and_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self::with_config(OpenAIConfig {
            api_key: api_key.into(),
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    /// Gateway for Groq's OpenAI-compatible endpoint.
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::with_api_key_and_base_url(api_key, GROQ_BASE_URL)
    }

    /// Gateway for NVIDIA NIM, embedding with `nv-embed-qa-e4` by default.
    pub fn nvidia(api_key: impl Into<String>) -> Self {
        Self::nvidia_at(api_key, NVIDIA_BASE_URL)
    }

    /// NVIDIA preset pointed at a different base URL.
    pub fn nvidia_at(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_config(OpenAIConfig {
            api_key: api_key.into(),
            base_url: base_url.into(),
            embedding_model: NVIDIA_EMBEDDING_MODEL.to_string(),
            embedding_chunk_tokens: 512,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn completion_body(
        &self,
        model: &str,
        messages: &[LlmMessage],
        tools: Option<&[Box<dyn LlmTool>]>,
        config: &CompletionConfig,
    ) -> Result<Value> {
        let mut body = json!({
            "model": model,
            "messages": adapt_messages_to_openai(messages),
            "temperature": config.temperature,
            "max_tokens": config.max_tokens,
        });

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            let tool_defs: Vec<_> = tools.iter().map(|t| t.descriptor()).collect();
            body["tools"] = serde_json::to_value(tool_defs)?;
            if !config.parallel_tool_calls {
                body["parallel_tool_calls"] = json!(false);
            }
        }

        Ok(body)
    }

    /// Calculate embeddings, merging `extra` into each request body.
    ///
    /// Providers such as NVIDIA NIM need fields beyond `model` and `input`
    /// (`input_type`, `truncate`); those travel in `extra`. When `truncate` is set the
    /// provider cuts long input itself, so the text is sent whole instead of chunked.
    pub async fn embed_with(
        &self,
        text: &str,
        model: Option<&str>,
        extra: &Map<String, Value>,
    ) -> Result<Vec<f32>> {
        let model = model.unwrap_or(&self.config.embedding_model);
        debug!("Calculating embeddings with model: {}", model);

        let chunks = if extra.contains_key("truncate") {
            vec![text.to_string()]
        } else {
            chunk_text(text, self.config.embedding_chunk_tokens)
        };

        let mut all_embeddings = Vec::new();
        let mut weights = Vec::new();

        for chunk in &chunks {
            let mut body = json!({
                "model": model,
                "input": chunk
            });
            for (key, value) in extra {
                body[key] = value.clone();
            }

            let response = self
                .client
                .post(format!("{}/embeddings", self.config.base_url))
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                return Err(CrewLabError::GatewayError(format!(
                    "Embeddings API error: {} - {}",
                    status, error_text
                )));
            }

            let response_body: Value = response.json().await?;

            let embedding: Vec<f32> = response_body["data"][0]["embedding"]
                .as_array()
                .ok_or_else(|| {
                    CrewLabError::GatewayError("Invalid embeddings response".to_string())
                })?
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();

            weights.push(chunk.chars().count() as f32);
            all_embeddings.push(embedding);
        }

        if all_embeddings.len() == 1 {
            return Ok(all_embeddings.remove(0));
        }

        Ok(weighted_average_embeddings(&all_embeddings, &weights))
    }
}

impl Default for OpenAIGateway {
    fn default() -> Self {
        Self::with_config(OpenAIConfig::default())
    }
}

/// Split text into pieces of roughly `chunk_tokens` tokens.
fn chunk_text(text: &str, chunk_tokens: usize) -> Vec<String> {
    // ~4 characters per token
    let max_chars = chunk_tokens.max(1) * 4;
    let chars: Vec<char> = text.chars().collect();

    if chars.len() <= max_chars {
        return vec![text.to_string()];
    }

    chars.chunks(max_chars).map(|c| c.iter().collect()).collect()
}

/// Weighted average of embeddings, normalized to unit length.
fn weighted_average_embeddings(embeddings: &[Vec<f32>], weights: &[f32]) -> Vec<f32> {
    if embeddings.is_empty() {
        return vec![];
    }

    let dimension = embeddings[0].len();
    let total_weight: f32 = weights.iter().sum();

    let average: Vec<f32> = (0..dimension)
        .map(|dim_idx| {
            embeddings
                .iter()
                .zip(weights.iter())
                .map(|(embedding, &weight)| {
                    embedding.get(dim_idx).unwrap_or(&0.0) * (weight / total_weight)
                })
                .sum()
        })
        .collect();

    let norm: f32 = average.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        average.iter().map(|x| x / norm).collect()
    } else {
        average
    }
}

#[async_trait]
impl LlmGateway for OpenAIGateway {
    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        tools: Option<&[Box<dyn LlmTool>]>,
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        info!(base_url = %self.config.base_url, model, "Requesting chat completion");
        debug!("Message count: {}", messages.len());

        let body = self.completion_body(model, messages, tools, config)?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CrewLabError::GatewayError(format!(
                "OpenAI API error: {} - {}",
                status, error_text
            )));
        }

        let response_body: Value = response.json().await?;
        let message = &response_body["choices"][0]["message"];

        let content = message["content"].as_str().map(String::from);
        let tool_calls = match message["tool_calls"].as_array() {
            Some(calls) => convert_tool_calls(calls),
            None => vec![],
        };

        Ok(LlmGatewayResponse {
            content,
            tool_calls,
        })
    }

    async fn get_available_models(&self) -> Result<Vec<String>> {
        debug!("Fetching available models");

        let response = self
            .client
            .get(format!("{}/models", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CrewLabError::GatewayError(format!(
                "Failed to get models: {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;

        let mut models = body["data"]
            .as_array()
            .ok_or_else(|| CrewLabError::GatewayError("Invalid response format".to_string()))?
            .iter()
            .filter_map(|m| m["id"].as_str().map(String::from))
            .collect::<Vec<_>>();

        models.sort();
        Ok(models)
    }

    async fn calculate_embeddings(&self, text: &str, model: Option<&str>) -> Result<Vec<f32>> {
        self.embed_with(text, model, &Map::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tools::ToolDescriptor;
    use std::collections::HashMap;

    #[derive(Clone)]
    struct MockTool;

    #[async_trait]
    impl LlmTool for MockTool {
        async fn run(&self, _args: &HashMap<String, Value>) -> Result<Value> {
            Ok(json!({}))
        }

        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::function("test_tool", "A test", json!({}))
        }

        fn clone_box(&self) -> Box<dyn LlmTool> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn test_openai_config_default() {
        let config = OpenAIConfig::default();
        assert_eq!(config.api_key, "");
        assert_eq!(config.base_url, OPENAI_BASE_URL);
        assert_eq!(config.embedding_model, "text-embedding-3-large");
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_groq_preset() {
        let gateway = OpenAIGateway::groq("gsk-key");
        assert_eq!(gateway.config().api_key, "gsk-key");
        assert_eq!(gateway.config().base_url, "https://api.groq.com/openai/v1");
    }

    #[test]
    fn test_nvidia_preset() {
        let gateway = OpenAIGateway::nvidia("nvapi-key");
        assert_eq!(gateway.config().base_url, "https://integrate.api.nvidia.com/v1");
        assert_eq!(gateway.config().embedding_model, "nv-embed-qa-e4");
    }

    #[test]
    fn test_chunk_text_short() {
        let chunks = chunk_text("Hello world", 100);
        assert_eq!(chunks, vec!["Hello world".to_string()]);
    }

    #[test]
    fn test_chunk_text_long() {
        let long_text = "a".repeat(1000);
        let chunks = chunk_text(&long_text, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), long_text);
    }

    #[test]
    fn test_weighted_average_embeddings_single() {
        let result = weighted_average_embeddings(&[vec![1.0, 2.0, 3.0]], &[1.0]);

        let norm = (1.0_f32 + 4.0 + 9.0).sqrt();
        assert!((result[0] - 1.0 / norm).abs() < 0.001);
        assert!((result[1] - 2.0 / norm).abs() < 0.001);
        assert!((result[2] - 3.0 / norm).abs() < 0.001);
    }

    #[test]
    fn test_weighted_average_embeddings_multiple() {
        let result = weighted_average_embeddings(&[vec![1.0, 0.0], vec![0.0, 1.0]], &[1.0, 1.0]);

        let expected = 1.0 / (2.0_f32).sqrt();
        assert!((result[0] - expected).abs() < 0.001);
        assert!((result[1] - expected).abs() < 0.001);
    }

    #[test]
    fn test_weighted_average_embeddings_empty() {
        assert!(weighted_average_embeddings(&[], &[]).is_empty());
    }

    #[test]
    fn test_completion_body_without_tools() {
        let gateway = OpenAIGateway::default();
        let body = gateway
            .completion_body("m", &[LlmMessage::user("Hi")], None, &CompletionConfig::default())
            .unwrap();

        assert_eq!(body["model"], "m");
        assert_eq!(body["max_tokens"], 4096);
        assert!(body.get("tools").is_none());
        assert!(body.get("parallel_tool_calls").is_none());
    }

    #[test]
    fn test_completion_body_disables_parallel_tool_calls() {
        let gateway = OpenAIGateway::default();
        let tools: Vec<Box<dyn LlmTool>> = vec![Box::new(MockTool)];
        let config = CompletionConfig {
            parallel_tool_calls: false,
            ..Default::default()
        };

        let body = gateway
            .completion_body("m", &[LlmMessage::user("Hi")], Some(&tools), &config)
            .unwrap();

        assert_eq!(body["tools"][0]["function"]["name"], "test_tool");
        assert_eq!(body["parallel_tool_calls"], false);
    }

    #[tokio::test]
    async fn test_complete_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Olá!"}}]}"#)
            .create_async()
            .await;

        let gateway = OpenAIGateway::with_api_key_and_base_url("test-key", server.url());
        let messages = vec![LlmMessage::user("Oi")];

        let response = gateway
            .complete("llama-3.1-8b-instant", &messages, None, &CompletionConfig::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, Some("Olá!".to_string()));
        assert!(response.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_complete_with_tool_calls() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":null,"tool_calls":[{"id":"call_1","type":"function","function":{"name":"calculate_engagement","arguments":"{\"likes\": 150}"}}]}}]}"#)
            .create_async()
            .await;

        let gateway = OpenAIGateway::with_api_key_and_base_url("test-key", server.url());
        let tools: Vec<Box<dyn LlmTool>> = vec![Box::new(MockTool)];

        let response = gateway
            .complete(
                "model",
                &[LlmMessage::user("Engajamento?")],
                Some(&tools),
                &CompletionConfig::default(),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(response.content.is_none());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "calculate_engagement");
        assert_eq!(response.tool_calls[0].arguments["likes"], json!(150));
    }

    #[tokio::test]
    async fn test_complete_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("Unauthorized")
            .create_async()
            .await;

        let gateway = OpenAIGateway::with_api_key_and_base_url("bad-key", server.url());
        let result = gateway
            .complete("model", &[LlmMessage::user("Hi")], None, &CompletionConfig::default())
            .await;

        mock.assert_async().await;
        match result {
            Err(CrewLabError::GatewayError(message)) => assert!(message.contains("401")),
            other => panic!("Expected GatewayError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_available_models() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/models")
            .with_status(200)
            .with_body(r#"{"data":[{"id":"llama-3.1-8b-instant"},{"id":"gemma2-9b-it"}]}"#)
            .create_async()
            .await;

        let gateway = OpenAIGateway::with_api_key_and_base_url("test-key", server.url());
        let models = gateway.get_available_models().await.unwrap();

        mock.assert_async().await;
        assert_eq!(models, vec!["gemma2-9b-it".to_string(), "llama-3.1-8b-instant".to_string()]);
    }

    #[tokio::test]
    async fn test_calculate_embeddings_uses_configured_model() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_body(mockito::Matcher::JsonString(
                r#"{"model":"nv-embed-qa-e4","input":"test"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"data":[{"embedding":[0.1,0.2,0.3,0.4]}]}"#)
            .create_async()
            .await;

        let gateway = OpenAIGateway::nvidia_at("test-key", server.url());
        let embedding = gateway.calculate_embeddings("test", None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(embedding.len(), 4);
    }

    #[tokio::test]
    async fn test_embed_with_extra_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_body(mockito::Matcher::JsonString(
                r#"{"model":"nv-embed-qa-e4","input":"consulta","input_type":"query","truncate":"END"}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"data":[{"embedding":[0.5,0.6]}]}"#)
            .create_async()
            .await;

        let gateway = OpenAIGateway::nvidia_at("test-key", server.url());
        let mut extra = Map::new();
        extra.insert("input_type".to_string(), json!("query"));
        extra.insert("truncate".to_string(), json!("END"));

        let embedding = gateway.embed_with("consulta", None, &extra).await.unwrap();

        mock.assert_async().await;
        assert_eq!(embedding, vec![0.5, 0.6]);
    }

    #[tokio::test]
    async fn test_embed_with_truncate_sends_long_text_whole() {
        let long_text = "palavra ".repeat(1000);
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_body(mockito::Matcher::PartialJson(json!({
                "input": long_text.clone(),
                "truncate": "END"
            })))
            .with_status(200)
            .with_body(r#"{"data":[{"embedding":[0.3,0.4]}]}"#)
            .expect(1)
            .create_async()
            .await;

        let gateway = OpenAIGateway::nvidia_at("test-key", server.url());
        let mut extra = Map::new();
        extra.insert("input_type".to_string(), json!("passage"));
        extra.insert("truncate".to_string(), json!("END"));

        let embedding = gateway.embed_with(&long_text, None, &extra).await.unwrap();

        mock.assert_async().await;
        assert_eq!(embedding, vec![0.3, 0.4]);
    }

    #[tokio::test]
    async fn test_calculate_embeddings_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("POST", "/embeddings").with_status(500).create_async().await;

        let gateway = OpenAIGateway::with_api_key_and_base_url("test-key", server.url());
        let result = gateway.calculate_embeddings("test", None).await;

        assert!(matches!(result, Err(CrewLabError::GatewayError(_))));
    }
}
