use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding provider error: {0}")]
    EmbeddingError(String),

    #[error("Vector index error: {0}")]
    VectorIndexError(String),

    #[error("Language model error: {0}")]
    LlmError(String),

    #[error("HTTP client error: {0}")]
    HttpError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse category of a [`RagError`], reported to callers alongside the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or malformed configuration, detected at startup
    Configuration,
    /// Request rejected before any external call was made
    InvalidInput,
    /// An embedding, vector index or language model call failed
    Upstream,
    /// Local failure unrelated to the request or the providers
    Internal,
}

impl RagError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigError(_) | Self::TomlParsing(_) => ErrorKind::Configuration,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::EmbeddingError(_)
            | Self::VectorIndexError(_)
            | Self::LlmError(_) => ErrorKind::Upstream,
            Self::HttpError(_) | Self::Serialization(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
