//! RAG (Retrieval-Augmented Generation) module
//!
//! Answers questions about quarterly reports in two steps:
//! - Retrieval: embed the question and fetch the nearest chunks for a year/quarter
//! - Generation: assemble the chunks into a context block and ask the language model
//!
//! # Examples
//!
//! ```rust,no_run
//! use reportrag::config::AppConfig;
//! use reportrag::rag::{RagRequest, RagService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = RagService::new(&config).await?;
//!
//!     let request = RagRequest::new("What was revenue in Q2 2024?")
//!         .with_year(2024)
//!         .with_quarter(2);
//!     let response = service.query(request).await?;
//!     println!("Answer: {}", response.answer);
//!     println!("Sources: {} chunks", response.sources.len());
//!
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod generator;
pub mod pipeline;
pub mod retriever;

pub use context::AssembledContext;
pub use context::ContextAssembler;
pub use generator::AnswerGenerator;
pub use pipeline::PipelineState;
pub use pipeline::RagRequest;
pub use pipeline::RagResponse;
pub use pipeline::RagService;
pub use pipeline::RagSettings;
pub use pipeline::SourceRef;
pub use retriever::Retriever;
use serde::Serialize;

use crate::errors::RagError;
use crate::errors::Result;
use crate::models::MetadataFilter;
use crate::models::ScoredChunk;

/// Pinecone refuses larger `topK` values
pub const MAX_TOP_K: i64 = 10_000;

/// Validated result-count limit for a similarity search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TopK(usize);

impl TopK {
    pub fn new(value: i64) -> Result<Self> {
        if value <= 0 {
            return Err(RagError::InvalidInput(format!(
                "top_k must be a positive integer, got {value}"
            )));
        }
        if value > MAX_TOP_K {
            return Err(RagError::InvalidInput(format!(
                "top_k must be at most {MAX_TOP_K}, got {value}"
            )));
        }
        Ok(Self(value as usize))
    }

    pub const fn get(self) -> usize {
        self.0
    }
}

/// Outcome of the retrieval step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Retrieval {
    /// At least one chunk, best match first
    Found { chunks: Vec<ScoredChunk> },
    /// Nothing in the index satisfies the filter
    NoMatches { filter: MetadataFilter },
}

impl Retrieval {
    /// Wrap retrieved chunks, turning an empty list into the explicit marker
    pub fn from_chunks(chunks: Vec<ScoredChunk>, filter: &MetadataFilter) -> Self {
        if chunks.is_empty() {
            Self::NoMatches {
                filter: filter.clone(),
            }
        } else {
            Self::Found { chunks }
        }
    }

    pub fn chunks(&self) -> &[ScoredChunk] {
        match self {
            Self::Found { chunks } => chunks,
            Self::NoMatches { .. } => &[],
        }
    }

    pub fn is_no_matches(&self) -> bool {
        matches!(self, Self::NoMatches { .. })
    }
}
