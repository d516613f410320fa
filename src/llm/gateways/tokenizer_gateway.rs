//! Token counting with tiktoken.
//!
//! Used to keep chat sessions inside a context window and to size document chunks
//! for the vector index.

use crate::error::{CrewLabError, Result};
use tiktoken_rs::CoreBPE;

/// Gateway for tokenizing and detokenizing text using tiktoken.
///
/// # Examples
///
/// ```
/// use crewlab::llm::gateways::TokenizerGateway;
///
/// let tokenizer = TokenizerGateway::new("cl100k_base").unwrap();
/// let tokens = tokenizer.encode("Olá, mundo!");
/// assert_eq!(tokenizer.decode(&tokens), "Olá, mundo!");
/// ```
pub struct TokenizerGateway {
    tokenizer: CoreBPE,
}

impl TokenizerGateway {
    /// Creates a tokenizer for one of the bundled encodings
    /// (`cl100k_base`, `p50k_base`, `r50k_base`).
    pub fn new(encoding: &str) -> Result<Self> {
        let tokenizer = match encoding {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            _ => {
                return Err(CrewLabError::ConfigError(format!(
                    "Unsupported encoding model: {}",
                    encoding
                )))
            }
        }
        .map_err(|e| CrewLabError::ConfigError(format!("Failed to load {}: {}", encoding, e)))?;

        Ok(Self { tokenizer })
    }

    pub fn encode(&self, text: &str) -> Vec<usize> {
        self.tokenizer.encode_with_special_tokens(text)
    }

    pub fn decode(&self, tokens: &[usize]) -> String {
        self.tokenizer.decode(tokens.to_vec()).unwrap_or_else(|e| {
            tracing::error!("Failed to decode tokens: {}", e);
            String::new()
        })
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

impl Default for TokenizerGateway {
    fn default() -> Self {
        Self::new("cl100k_base").expect("cl100k_base is bundled with tiktoken-rs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_empty() {
        let tokenizer = TokenizerGateway::default();
        assert!(tokenizer.encode("").is_empty());
    }

    #[test]
    fn test_decode_round_trip_portuguese() {
        let tokenizer = TokenizerGateway::default();
        let original = "As principais tendências para estudar são IA generativa e ética em IA.";
        let tokens = tokenizer.encode(original);

        assert_eq!(tokenizer.decode(&tokens), original);
    }

    #[test]
    fn test_count_tokens_matches_encode() {
        let tokenizer = TokenizerGateway::default();
        let text = "O algoritmo de recomendação é crucial.";

        assert_eq!(tokenizer.count_tokens(text), tokenizer.encode(text).len());
        assert!(tokenizer.count_tokens(text) > 5);
    }

    #[test]
    fn test_other_encoding() {
        let tokenizer = TokenizerGateway::new("p50k_base").unwrap();
        assert!(!tokenizer.encode("Hello, world!").is_empty());
    }

    #[test]
    fn test_unsupported_encoding() {
        let result = TokenizerGateway::new("o200k_unknown");
        assert!(matches!(result, Err(CrewLabError::ConfigError(_))));
    }
}
