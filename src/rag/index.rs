//! In-memory vector index persisted as a single JSON file.

use crate::error::{CrewLabError, Result};
use crate::rag::document::Document;
use crate::rag::embedding::Embedder;
use crate::rag::splitter::{Node, SentenceSplitter};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use tracing::info;

pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedNode {
    node: Node,
    embedding: Vec<f32>,
}

/// A retrieved node and its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeWithScore {
    pub node: Node,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreIndex {
    embedding_model: String,
    nodes: Vec<IndexedNode>,
}

impl VectorStoreIndex {
    /// Split the documents, embed every chunk as a passage, and index the result.
    pub async fn from_documents(
        documents: &[Document],
        embedder: &dyn Embedder,
        splitter: &SentenceSplitter,
    ) -> Result<Self> {
        let nodes = splitter.split_documents(documents);
        let texts: Vec<String> = nodes.iter().map(|n| n.text.clone()).collect();
        let embeddings = embedder.embed_passages(&texts).await?;

        info!(
            documents = documents.len(),
            nodes = nodes.len(),
            model = embedder.model_name(),
            "Built vector index"
        );

        Ok(Self {
            embedding_model: embedder.model_name().to_string(),
            nodes: nodes
                .into_iter()
                .zip(embeddings)
                .map(|(node, embedding)| IndexedNode { node, embedding })
                .collect(),
        })
    }

    pub fn exists(dir: impl AsRef<Path>) -> bool {
        dir.as_ref().join(INDEX_FILE).is_file()
    }

    pub fn persist(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(INDEX_FILE);
        std::fs::write(&path, serde_json::to_string(self)?)?;

        info!(path = %path.display(), nodes = self.nodes.len(), "Persisted vector index");
        Ok(())
    }

    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !Self::exists(dir) {
            return Err(CrewLabError::ConfigError(format!(
                "No vector index stored in {}. Build the index first.",
                dir.display()
            )));
        }

        let content = std::fs::read_to_string(dir.join(INDEX_FILE))?;
        let index: Self = serde_json::from_str(&content)?;

        info!(path = %dir.display(), nodes = index.nodes.len(), "Loaded vector index");
        Ok(index)
    }

    /// The `top_k` nodes most similar to the query embedding, best first.
    pub fn retrieve(&self, query_embedding: &[f32], top_k: usize) -> Vec<NodeWithScore> {
        let mut scored: Vec<NodeWithScore> = self
            .nodes
            .iter()
            .map(|n| NodeWithScore {
                node: n.node.clone(),
                score: cosine_similarity(query_embedding, &n.embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
