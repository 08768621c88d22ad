//! Embedding API client for OpenAI-compatible endpoints

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::AppConfig;
use crate::embeddings::Embedder;
use crate::errors::RagError;
use crate::errors::Result;
use crate::http::HttpTransport;
use crate::http::Upstream;

/// Client for generating embeddings
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    model: String,
    endpoint: String,
    api_key: String,
    dimension: usize,
    transport: HttpTransport,
}

impl EmbeddingClient {
    pub fn new(
        model: String,
        endpoint: String,
        api_key: String,
        dimension: usize,
        transport: HttpTransport,
    ) -> Self {
        Self {
            model,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            dimension,
            transport,
        }
    }

    /// Create an embedding client from application configuration
    ///
    /// # Errors
    /// - Missing API key
    /// - HTTP client build errors
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config.embedding_api_key().ok_or_else(|| {
            RagError::ConfigError(
                "embeddings.api_key (env OPENAI_API_KEY) is not set".to_string(),
            )
        })?;

        Ok(Self::new(
            config.embedding_model().to_string(),
            config.embedding_endpoint().to_string(),
            api_key.to_string(),
            config.embedding_dimension(),
            HttpTransport::from_config(config)?,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

/// Only the text-embedding-3 family accepts a requested output size
fn supports_dimensions(model: &str) -> bool {
    model.starts_with("text-embedding-3")
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for EmbeddingClient {
    /// Generate embedding for a single text
    ///
    /// # Errors
    /// - API request failures (network errors, timeouts, authentication failures)
    /// - Invalid API responses (malformed JSON, wrong embedding dimensions)
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.endpoint);
        debug!("Calling embeddings API: {} (model {})", url, self.model);

        let request = EmbeddingRequest {
            input: text,
            model: &self.model,
            dimensions: supports_dimensions(&self.model).then_some(self.dimension),
        };

        let result: EmbeddingResponse = self
            .transport
            .send_json(Upstream::Embedding, |client| {
                client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&request)
            })
            .await?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RagError::EmbeddingError("No embedding in response".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(RagError::EmbeddingError(format!(
                "expected {} dimensions from {}, got {}",
                self.dimension,
                self.model,
                embedding.len()
            )));
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
