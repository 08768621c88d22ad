//! Chat-completions client for OpenAI-compatible endpoints

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::RagError;
use crate::errors::Result;
use crate::http::HttpTransport;
use crate::http::Upstream;
use crate::llm::ChatMessage;
use crate::llm::ChatModel;
use crate::llm::GenerationParams;

#[derive(Debug, Clone)]
pub struct LlmService {
    endpoint: String,
    api_key: String,
    model: String,
    transport: HttpTransport,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl LlmService {
    pub fn new(endpoint: String, api_key: String, model: String, transport: HttpTransport) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model,
            transport,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config.llm_key().ok_or_else(|| {
            RagError::ConfigError("llm.llm_key (env OPENAI_API_KEY) is not set".to_string())
        })?;

        Ok(Self::new(
            config.llm_endpoint().to_string(),
            api_key.to_string(),
            config.llm_model().to_string(),
            HttpTransport::from_config(config)?,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for LlmService {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: GenerationParams,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!(
            "Calling chat completions: {} (model {}, temperature {})",
            url, self.model, params.temperature
        );

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response: ChatResponse = self
            .transport
            .send_json(Upstream::Llm, |client| {
                client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&request)
            })
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| RagError::LlmError("Empty completion in response".to_string()))
    }
}
