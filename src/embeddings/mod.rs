//! Embeddings generation module
//!
//! Converts a query string into a fixed-dimension vector through an
//! OpenAI-compatible `/embeddings` endpoint.
//!
//! # Examples
//!
//! ```rust,no_run
//! use reportrag::config::AppConfig;
//! use reportrag::embeddings::{Embedder, EmbeddingClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let client = EmbeddingClient::from_config(&config)?;
//!
//!     let embedding = client.embed("Data center revenue in Q2").await?;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;

use async_trait::async_trait;
pub use client::EmbeddingClient;

use crate::errors::Result;

/// Default embedding dimension for OpenAI text-embedding-3-small
pub const DEFAULT_EMBEDDING_DIM: usize = crate::config::default_embedding_dimension();

/// Text to vector, as seen by the retrieval step
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;
}
