use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigurationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Retrieval and fusion tuning
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for answer generation
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub embedding_dim: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Weight of the semantic branch in rank fusion; 1 - alpha weighs the
    /// lexical branch. Must be within [0, 1].
    pub fusion_alpha: f32,
    /// Result count when the request does not ask for one.
    pub default_top_k: usize,
    /// Budget for the vector branch before the outcome degrades to
    /// lexical-only.
    pub retrieval_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            embedding_dim: 768,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fusion_alpha: 0.7,
            default_top_k: 5,
            retrieval_timeout_ms: 300,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("TRAVEL_RAG_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(dim) = std::env::var("LLM_EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.llm.embedding_dim = d;
            }
        }
        if let Ok(val) = std::env::var("TRAVEL_RAG_FUSION_ALPHA") {
            if let Ok(v) = val.parse() {
                config.search.fusion_alpha = v;
            }
        }
        if let Ok(val) = std::env::var("TRAVEL_RAG_TOP_K") {
            if let Ok(v) = val.parse() {
                config.search.default_top_k = v;
            }
        }
        if let Ok(val) = std::env::var("TRAVEL_RAG_RETRIEVAL_TIMEOUT_MS") {
            if let Ok(v) = val.parse() {
                config.search.retrieval_timeout_ms = v;
            }
        }

        config
    }

    /// Reject invalid tuning values at startup, before any request is served.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let alpha = self.search.fusion_alpha;
        if !(0.0..=1.0).contains(&alpha) || alpha.is_nan() {
            return Err(ConfigurationError::AlphaOutOfRange(alpha));
        }
        if self.search.default_top_k == 0 {
            return Err(ConfigurationError::ZeroTopK);
        }
        if self.search.retrieval_timeout_ms == 0 {
            return Err(ConfigurationError::ZeroTimeout);
        }
        if self.llm.embedding_dim == 0 {
            return Err(ConfigurationError::ZeroEmbeddingDim);
        }
        Ok(())
    }

    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_millis(self.search.retrieval_timeout_ms)
    }
}
