//! Embedding generation for indexing and retrieval.

use crate::error::Result;
use crate::llm::gateways::OpenAIGateway;
use crate::llm::LlmGateway;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Retrieval-tuned models embed questions and stored passages differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingKind {
    Query,
    Passage,
}

impl EmbeddingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EmbeddingKind::Query => "query",
            EmbeddingKind::Passage => "passage",
        }
    }
}

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str, kind: EmbeddingKind) -> Result<Vec<f32>>;

    /// Name recorded in persisted indexes.
    fn model_name(&self) -> &str;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text, EmbeddingKind::Query).await
    }

    async fn embed_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text, EmbeddingKind::Passage).await?);
        }
        Ok(embeddings)
    }
}

/// Embeds through any gateway's `calculate_embeddings`; the kind is ignored.
pub struct GatewayEmbedder {
    gateway: Arc<dyn LlmGateway>,
    model: String,
}

impl GatewayEmbedder {
    pub fn new(gateway: Arc<dyn LlmGateway>, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for GatewayEmbedder {
    async fn embed(&self, text: &str, _kind: EmbeddingKind) -> Result<Vec<f32>> {
        self.gateway.calculate_embeddings(text, Some(&self.model)).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// NVIDIA NIM retrieval embeddings (`input_type` plus `truncate = END`).
pub struct NvidiaEmbedder {
    gateway: Arc<OpenAIGateway>,
    model: String,
}

impl NvidiaEmbedder {
    pub fn new(gateway: Arc<OpenAIGateway>, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }

    fn extra(kind: EmbeddingKind) -> Map<String, Value> {
        let mut extra = Map::new();
        extra.insert("input_type".to_string(), json!(kind.as_str()));
        extra.insert("truncate".to_string(), json!("END"));
        extra
    }
}

#[async_trait]
impl Embedder for NvidiaEmbedder {
    async fn embed(&self, text: &str, kind: EmbeddingKind) -> Result<Vec<f32>> {
        debug!(model = %self.model, kind = kind.as_str(), "Embedding text");
        self.gateway
            .embed_with(text, Some(&self.model), &Self::extra(kind))
            .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
