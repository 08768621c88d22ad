//! Hosted language model access

pub mod client;
pub mod prompts;

use async_trait::async_trait;
pub use client::LlmService;
pub use prompts::PromptTemplate;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling parameters for one completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: crate::config::default_temperature(),
            max_tokens: 1024,
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Return the model's reply to `messages` verbatim
    async fn complete(&self, messages: &[ChatMessage], params: GenerationParams)
        -> Result<String>;
}
