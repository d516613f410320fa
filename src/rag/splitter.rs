//! Token-bounded sentence splitting.

use crate::error::{CrewLabError, Result};
use crate::llm::gateways::TokenizerGateway;
use crate::rag::document::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_CHUNK_SIZE: usize = 1024;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// A chunk of a document; the unit that gets embedded and retrieved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: Uuid,
    pub text: String,
    /// Copied from the source document
    pub metadata: BTreeMap<String, String>,
    pub ref_doc_id: Uuid,
}

/// Splits documents into chunks of at most `chunk_size` tokens, keeping whole sentences
/// together where possible and repeating up to `chunk_overlap` tokens between neighbours.
#[derive(Clone)]
pub struct SentenceSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    tokenizer: Arc<TokenizerGateway>,
}

impl Default for SentenceSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            tokenizer: Arc::new(TokenizerGateway::default()),
        }
    }
}

impl SentenceSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(CrewLabError::InvalidArgument(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(CrewLabError::InvalidArgument(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_overlap,
            chunk_size,
            ..Self::default()
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split_documents(&self, documents: &[Document]) -> Vec<Node> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.text).into_iter().map(move |text| Node {
                    id: Uuid::new_v4(),
                    text,
                    metadata: doc.metadata.clone(),
                    ref_doc_id: doc.id,
                })
            })
            .collect()
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let pieces: Vec<(String, usize)> = self
            .sentences(text)
            .into_iter()
            .flat_map(|s| self.split_long(s))
            .collect();

        let mut chunks = Vec::new();
        let mut current: Vec<(String, usize)> = Vec::new();
        let mut current_tokens = 0;

        for (piece, tokens) in pieces {
            if current_tokens + tokens > self.chunk_size && !current.is_empty() {
                chunks.push(join(&current));

                // Carry trailing sentences into the next chunk as overlap
                let mut carried = Vec::new();
                let mut carried_tokens = 0;
                for (s, t) in current.iter().rev() {
                    if carried_tokens + t > self.chunk_overlap
                        || carried_tokens + t + tokens > self.chunk_size
                    {
                        break;
                    }
                    carried_tokens += t;
                    carried.push((s.clone(), *t));
                }
                carried.reverse();
                current = carried;
                current_tokens = carried_tokens;
            }

            current_tokens += tokens;
            current.push((piece, tokens));
        }

        if !current.is_empty() {
            chunks.push(join(&current));
        }

        chunks
    }

    /// Sentences end at a run of `.`, `!` or `?`, or at a line break.
    fn sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut start = 0;
        let mut chars = text.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            let terminal = matches!(c, '.' | '!' | '?');
            if terminal && matches!(chars.peek(), Some((_, '.' | '!' | '?'))) {
                continue;
            }
            if terminal || c == '\n' {
                let end = i + c.len_utf8();
                sentences.push(text[start..end].trim());
                start = end;
            }
        }
        sentences.push(text[start..].trim());

        sentences.retain(|s| !s.is_empty());
        sentences
    }

    /// Sentences longer than a chunk are cut into token windows.
    fn split_long(&self, sentence: &str) -> Vec<(String, usize)> {
        let tokens = self.tokenizer.encode(sentence);
        if tokens.len() <= self.chunk_size {
            return vec![(sentence.to_string(), tokens.len())];
        }

        tokens
            .chunks(self.chunk_size)
            .map(|window| (self.tokenizer.decode(window).trim().to_string(), window.len()))
            .collect()
    }
}

fn join(pieces: &[(String, usize)]) -> String {
    pieces.iter().map(|(s, _)| s.as_str()).collect::<Vec<_>>().join(" ")
}
