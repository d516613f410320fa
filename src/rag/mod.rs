//! Local vector index over text documents and the query engines built on it.

pub mod document;
pub mod embedding;
pub mod index;
pub mod query_engine;
pub mod query_engine_tool;
pub mod samples;
pub mod splitter;

pub use document::{DirectoryReader, Document};
pub use embedding::{Embedder, EmbeddingKind, GatewayEmbedder, NvidiaEmbedder};
pub use index::{cosine_similarity, NodeWithScore, VectorStoreIndex};
pub use query_engine::{QueryEngine, Response};
pub use query_engine_tool::QueryEngineTool;
pub use samples::ensure_sample_corpus;
pub use splitter::{Node, SentenceSplitter};
