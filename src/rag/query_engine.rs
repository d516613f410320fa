//! Retrieval-augmented question answering over a [`VectorStoreIndex`].

use crate::error::Result;
use crate::llm::{LlmBroker, LlmMessage};
use crate::rag::embedding::Embedder;
use crate::rag::index::{NodeWithScore, VectorStoreIndex};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_SIMILARITY_TOP_K: usize = 3;
pub const EMPTY_RESPONSE: &str = "Empty Response";

const TEXT_QA_TEMPLATE: &str = "Context information is below.\n\
---------------------\n\
{context_str}\n\
---------------------\n\
Given the context information and not prior knowledge, answer the query.\n\
Query: {query_str}\n\
Answer: ";

const TEXT_QA_SYSTEM_PROMPT: &str = "You are an expert Q&A system that is trusted around the world.\n\
Always answer the query using the provided context information, and not prior knowledge.\n\
Some rules to follow:\n\
1. Never directly reference the given context in your answer.\n\
2. Avoid statements like 'Based on the context, ...' or 'The context information ...' or anything along those lines.";

/// Answer text plus the nodes it was grounded on.
#[derive(Debug, Clone)]
pub struct Response {
    pub response: String,
    pub source_nodes: Vec<NodeWithScore>,
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.response)
    }
}

#[derive(Clone)]
pub struct QueryEngine {
    index: Arc<VectorStoreIndex>,
    embedder: Arc<dyn Embedder>,
    broker: Arc<LlmBroker>,
    similarity_top_k: usize,
}

impl QueryEngine {
    pub fn new(index: Arc<VectorStoreIndex>, embedder: Arc<dyn Embedder>, broker: Arc<LlmBroker>) -> Self {
        Self {
            index,
            embedder,
            broker,
            similarity_top_k: DEFAULT_SIMILARITY_TOP_K,
        }
    }

    pub fn with_similarity_top_k(mut self, top_k: usize) -> Self {
        self.similarity_top_k = top_k;
        self
    }

    pub async fn query(&self, query: &str) -> Result<Response> {
        let query_embedding = self.embedder.embed_query(query).await?;
        let source_nodes = self.index.retrieve(&query_embedding, self.similarity_top_k);
        debug!(query, retrieved = source_nodes.len(), "Retrieved context");

        if source_nodes.is_empty() {
            return Ok(Response {
                response: EMPTY_RESPONSE.to_string(),
                source_nodes,
            });
        }

        let context = source_nodes
            .iter()
            .map(|n| format_node(n))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = TEXT_QA_TEMPLATE
            .replace("{context_str}", &context)
            .replace("{query_str}", query);

        let messages = vec![LlmMessage::system(TEXT_QA_SYSTEM_PROMPT), LlmMessage::user(prompt)];
        let response = self.broker.generate(&messages, None, None).await?;

        Ok(Response {
            response,
            source_nodes,
        })
    }
}

fn format_node(n: &NodeWithScore) -> String {
    let metadata = n
        .node
        .metadata
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join("\n");

    if metadata.is_empty() {
        n.node.text.clone()
    } else {
        format!("{}\n\n{}", metadata, n.node.text)
    }
}

impl VectorStoreIndex {
    pub fn as_query_engine(
        self: Arc<Self>,
        embedder: Arc<dyn Embedder>,
        broker: Arc<LlmBroker>,
    ) -> QueryEngine {
        QueryEngine::new(self, embedder, broker)
    }
}
