use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::errors::RagError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

pub(crate) const fn default_embedding_dimension() -> usize {
    1536
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_openai_endpoint(),
            api_key: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_openai_endpoint")]
    pub llm_endpoint: String,
    #[serde(default)]
    pub llm_key: Option<String>,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    /// Low but nonzero: answers lean deterministic without being greedy
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

pub(crate) const fn default_temperature() -> f32 {
    0.1
}

const fn default_max_tokens() -> u32 {
    1024
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            llm_endpoint: default_openai_endpoint(),
            llm_key: None,
            llm_model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PineconeConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub index_name: Option<String>,
    /// Data-plane host of the index; resolved through the control plane when absent
    #[serde(default)]
    pub index_host: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_control_plane_url")]
    pub control_plane_url: String,
}

fn default_control_plane_url() -> String {
    "https://api.pinecone.io".to_string()
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: None,
            index_host: None,
            namespace: None,
            control_plane_url: default_control_plane_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    /// Upper bound on the context block handed to the language model, in characters
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

pub(crate) const fn default_top_k() -> usize {
    5
}

pub(crate) const fn default_max_context_chars() -> usize {
    12_000
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

const fn default_timeout_secs() -> u64 {
    30
}

/// Transient failures are retried once at most
pub const MAX_RETRIES: u32 = 1;

const fn default_max_retries() -> u32 {
    1
}

const fn default_retry_backoff_ms() -> u64 {
    500
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pinecone: PineconeConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from the default file locations, then apply environment overrides.
    ///
    /// Falls back to built-in defaults when neither `config.toml` nor
    /// `config.example.toml` exists, since credentials usually come from the environment.
    pub fn load() -> crate::Result<Self> {
        let mut config = if Path::new("config.toml").exists() {
            Self::from_file("config.toml")?
        } else if Path::new("config.example.toml").exists() {
            tracing::warn!(
                "Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")?
        } else {
            tracing::debug!("No config file found, using defaults and environment");
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Overlay values from process environment variables
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup.
    ///
    /// `OPENAI_API_KEY` only fills provider keys that are still unset; the other
    /// variables override the file.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(non_blank);

        if let Some(key) = get("OPENAI_API_KEY") {
            if self.embedding_api_key().is_none() {
                self.embeddings.api_key = Some(key.clone());
            }
            if self.llm_key().is_none() {
                self.llm.llm_key = Some(key);
            }
        }
        if let Some(key) = get("PINECONE_API_KEY") {
            self.pinecone.api_key = Some(key);
        }
        if let Some(index) = get("PINECONE_INDEX") {
            self.pinecone.index_name = Some(index);
        }
        if let Some(host) = get("PINECONE_INDEX_HOST") {
            self.pinecone.index_host = Some(host);
        }
        if let Some(namespace) = get("PINECONE_NAMESPACE") {
            self.pinecone.namespace = Some(namespace);
        }
        if let Some(level) = get("REPORTRAG_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Check that everything needed to serve a request is present.
    ///
    /// Every missing credential is named in a single error so the operator can
    /// fix them all at once.
    pub fn validate(&self) -> crate::Result<()> {
        let mut missing = Vec::new();
        if self.embedding_api_key().is_none() {
            missing.push("embeddings.api_key (env OPENAI_API_KEY)");
        }
        if self.llm_key().is_none() {
            missing.push("llm.llm_key (env OPENAI_API_KEY)");
        }
        if self.pinecone_api_key().is_none() {
            missing.push("pinecone.api_key (env PINECONE_API_KEY)");
        }
        if self.pinecone_index_name().is_none() {
            missing.push("pinecone.index_name (env PINECONE_INDEX)");
        }
        if !missing.is_empty() {
            return Err(RagError::ConfigError(format!(
                "missing required configuration: {}",
                missing.join(", ")
            )));
        }

        check_url("embeddings.endpoint", &self.embeddings.endpoint)?;
        check_url("llm.llm_endpoint", &self.llm.llm_endpoint)?;
        check_url("pinecone.control_plane_url", &self.pinecone.control_plane_url)?;
        if let Some(host) = self.pinecone_index_host() {
            check_url("pinecone.index_host", &normalize_host(host))?;
        }

        if self.embeddings.dimension == 0 {
            return Err(RagError::ConfigError(
                "embeddings.dimension must be greater than zero".to_string(),
            ));
        }
        if self.retrieval.default_top_k == 0 {
            return Err(RagError::ConfigError(
                "retrieval.default_top_k must be greater than zero".to_string(),
            ));
        }
        if self.retrieval.max_context_chars == 0 {
            return Err(RagError::ConfigError(
                "retrieval.max_context_chars must be greater than zero".to_string(),
            ));
        }
        if self.http.max_retries > MAX_RETRIES {
            return Err(RagError::ConfigError(format!(
                "http.max_retries must be at most {MAX_RETRIES}, got {}",
                self.http.max_retries
            )));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(RagError::ConfigError(format!(
                "llm.temperature must be within [0, 2], got {}",
                self.llm.temperature
            )));
        }

        Ok(())
    }

    /// Get embedding endpoint
    pub fn embedding_endpoint(&self) -> &str {
        &self.embeddings.endpoint
    }

    /// Get embedding API key, if configured
    pub fn embedding_api_key(&self) -> Option<&str> {
        present(self.embeddings.api_key.as_deref())
    }

    /// Get embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.embeddings.model
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }

    /// Get LLM endpoint
    pub fn llm_endpoint(&self) -> &str {
        &self.llm.llm_endpoint
    }

    /// Get LLM key, if configured
    pub fn llm_key(&self) -> Option<&str> {
        present(self.llm.llm_key.as_deref())
    }

    /// Get LLM model
    pub fn llm_model(&self) -> &str {
        &self.llm.llm_model
    }

    pub fn pinecone_api_key(&self) -> Option<&str> {
        present(self.pinecone.api_key.as_deref())
    }

    pub fn pinecone_index_name(&self) -> Option<&str> {
        present(self.pinecone.index_name.as_deref())
    }

    pub fn pinecone_index_host(&self) -> Option<&str> {
        present(self.pinecone.index_host.as_deref())
    }

    pub fn pinecone_namespace(&self) -> Option<&str> {
        present(self.pinecone.namespace.as_deref())
    }

    /// Get the per-request HTTP timeout
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

/// Pinecone reports hosts without a scheme
pub(crate) fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

fn check_url(name: &str, value: &str) -> crate::Result<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| RagError::ConfigError(format!("{name} is not a valid URL ({value}): {e}")))
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
