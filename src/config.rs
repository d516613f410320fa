//! Environment-driven configuration and the shared client factories.
//!
//! Settings come from the process environment, optionally seeded from a `.env` file.

use crate::comex::{ComexLoader, ComexSource};
use crate::error::{CrewLabError, Result};
use crate::llm::gateways::{OpenAIGateway, GROQ_BASE_URL, NVIDIA_BASE_URL};
use crate::llm::tools::web_search_tool::TAVILY_BASE_URL;
use crate::llm::tools::{ArxivClient, WebSearchTool};
use crate::llm::LlmBroker;
use crate::rag::NvidiaEmbedder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_AGENT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_CREW_MODEL: &str = "meta/llama3-70b-instruct";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nv-embed-qa-e4";

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(env).with_target(false).try_init();
}

/// The provider credentials crewlab knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKey {
    Groq,
    Tavily,
    Nvidia,
}

impl ApiKey {
    pub const ALL: [ApiKey; 3] = [ApiKey::Groq, ApiKey::Tavily, ApiKey::Nvidia];

    pub fn env_var(self) -> &'static str {
        match self {
            ApiKey::Groq => "GROQ_API_KEY",
            ApiKey::Tavily => "TAVILY_API_KEY",
            ApiKey::Nvidia => "NVIDIA_API_KEY",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub groq_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub nvidia_api_key: Option<String>,
    /// Fast model behind single agents (Groq)
    pub agent_model: String,
    /// Larger model behind crews (NVIDIA NIM)
    pub crew_model: String,
    pub embedding_model: String,
    pub groq_base_url: String,
    pub nvidia_base_url: String,
    pub tavily_base_url: String,
    pub comex_base_url: String,
    /// Source documents for the vector indexes
    pub data_dir: PathBuf,
    /// Persisted vector indexes
    pub storage_dir: PathBuf,
    pub download_dir: PathBuf,
    /// Parquet cache of comex downloads
    pub cache_dir: PathBuf,
    pub arxiv_results_path: PathBuf,
}

impl Settings {
    /// Read settings from the environment, loading `.env` first when present.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Settings::from_env`], but every API key must be present.
    pub fn load() -> Result<Self> {
        let settings = Self::from_env();
        settings.require(&ApiKey::ALL)?;
        Ok(settings)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| non_empty(key).unwrap_or_else(|| default.to_string());

        Self {
            groq_api_key: non_empty(ApiKey::Groq.env_var()),
            tavily_api_key: non_empty(ApiKey::Tavily.env_var()),
            nvidia_api_key: non_empty(ApiKey::Nvidia.env_var()),
            agent_model: or("AGENT_MODEL", DEFAULT_AGENT_MODEL),
            crew_model: or("CREW_MODEL", DEFAULT_CREW_MODEL),
            embedding_model: or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            groq_base_url: or("GROQ_BASE_URL", GROQ_BASE_URL),
            nvidia_base_url: or("NVIDIA_BASE_URL", NVIDIA_BASE_URL),
            tavily_base_url: or("TAVILY_BASE_URL", TAVILY_BASE_URL),
            comex_base_url: or("COMEX_BASE_URL", crate::comex::COMEX_BASE_URL),
            data_dir: or("CREWLAB_DATA_DIR", "data").into(),
            storage_dir: or("CREWLAB_STORAGE_DIR", "storage").into(),
            download_dir: or("CREWLAB_DOWNLOAD_DIR", "downloads").into(),
            cache_dir: or("CREWLAB_CACHE_DIR", "cache_comex").into(),
            arxiv_results_path: or("CREWLAB_ARXIV_RESULTS", "arxiv_results.json").into(),
        }
    }

    pub fn api_key(&self, key: ApiKey) -> Option<&str> {
        match key {
            ApiKey::Groq => self.groq_api_key.as_deref(),
            ApiKey::Tavily => self.tavily_api_key.as_deref(),
            ApiKey::Nvidia => self.nvidia_api_key.as_deref(),
        }
    }

    /// Fail with a config error naming every missing key.
    pub fn require(&self, keys: &[ApiKey]) -> Result<()> {
        let missing: Vec<&str> = keys
            .iter()
            .filter(|k| self.api_key(**k).is_none())
            .map(|k| k.env_var())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CrewLabError::ConfigError(format!(
                "API keys not found: {}. Add them to the environment or a .env file.",
                missing.join(", ")
            )))
        }
    }

    fn key(&self, key: ApiKey) -> Result<String> {
        self.require(&[key])?;
        Ok(self.api_key(key).unwrap_or_default().to_string())
    }

    pub fn groq_gateway(&self) -> Result<Arc<OpenAIGateway>> {
        Ok(Arc::new(OpenAIGateway::with_api_key_and_base_url(
            self.key(ApiKey::Groq)?,
            &self.groq_base_url,
        )))
    }

    pub fn nvidia_gateway(&self) -> Result<Arc<OpenAIGateway>> {
        Ok(Arc::new(OpenAIGateway::nvidia_at(self.key(ApiKey::Nvidia)?, &self.nvidia_base_url)))
    }

    /// Broker for single agents: Groq with the agent model.
    pub fn agent_broker(&self) -> Result<LlmBroker> {
        Ok(LlmBroker::new(&self.agent_model, self.groq_gateway()?))
    }

    /// Broker for crews: NVIDIA NIM with the crew model.
    pub fn crew_broker(&self) -> Result<LlmBroker> {
        Ok(LlmBroker::new(&self.crew_model, self.nvidia_gateway()?))
    }

    pub fn embedder(&self) -> Result<NvidiaEmbedder> {
        Ok(NvidiaEmbedder::new(self.nvidia_gateway()?, &self.embedding_model))
    }

    pub fn web_search_tool(&self) -> Result<WebSearchTool> {
        Ok(WebSearchTool::with_base_url(self.key(ApiKey::Tavily)?, &self.tavily_base_url))
    }

    pub fn arxiv_client(&self) -> ArxivClient {
        ArxivClient::new(&self.download_dir, &self.arxiv_results_path)
    }

    pub fn comex_loader(&self) -> ComexLoader {
        ComexLoader::new(ComexSource::new(&self.comex_base_url), &self.cache_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]);

        assert_eq!(settings.agent_model, "llama-3.1-8b-instant");
        assert_eq!(settings.crew_model, "meta/llama3-70b-instruct");
        assert_eq!(settings.embedding_model, "nv-embed-qa-e4");
        assert_eq!(settings.groq_base_url, "https://api.groq.com/openai/v1");
        assert_eq!(settings.nvidia_base_url, "https://integrate.api.nvidia.com/v1");
        assert_eq!(settings.data_dir, PathBuf::from("data"));
        assert_eq!(settings.storage_dir, PathBuf::from("storage"));
        assert_eq!(settings.cache_dir, PathBuf::from("cache_comex"));
        assert!(settings.groq_api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let settings = settings_from(&[
            ("GROQ_API_KEY", "gsk"),
            ("AGENT_MODEL", "llama-3.3-70b-versatile"),
            ("CREWLAB_CACHE_DIR", "/tmp/comex"),
        ]);

        assert_eq!(settings.api_key(ApiKey::Groq), Some("gsk"));
        assert_eq!(settings.agent_model, "llama-3.3-70b-versatile");
        assert_eq!(settings.cache_dir, PathBuf::from("/tmp/comex"));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let settings = settings_from(&[("TAVILY_API_KEY", "  "), ("CREW_MODEL", "")]);

        assert!(settings.tavily_api_key.is_none());
        assert_eq!(settings.crew_model, DEFAULT_CREW_MODEL);
    }

    #[test]
    fn test_require_names_missing_keys() {
        let settings = settings_from(&[("GROQ_API_KEY", "gsk")]);

        assert!(settings.require(&[ApiKey::Groq]).is_ok());

        let err = settings.require(&ApiKey::ALL).unwrap_err();
        match err {
            CrewLabError::ConfigError(message) => {
                assert!(message.contains("TAVILY_API_KEY"));
                assert!(message.contains("NVIDIA_API_KEY"));
                assert!(!message.contains("GROQ_API_KEY"));
            }
            other => panic!("Expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_factories_need_their_keys() {
        let settings = settings_from(&[("GROQ_API_KEY", "gsk")]);

        assert!(settings.agent_broker().is_ok());
        assert!(settings.crew_broker().is_err());
        assert!(settings.web_search_tool().is_err());
        assert!(settings.embedder().is_err());
    }

    #[test]
    fn test_agent_broker_uses_agent_model() {
        let settings = settings_from(&[("GROQ_API_KEY", "gsk"), ("NVIDIA_API_KEY", "nv")]);

        assert_eq!(settings.agent_broker().unwrap().model(), DEFAULT_AGENT_MODEL);
        assert_eq!(settings.crew_broker().unwrap().model(), DEFAULT_CREW_MODEL);
    }
}
