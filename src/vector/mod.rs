//! Vector index access
//!
//! The retrieval step only needs filtered nearest-neighbour search; the
//! inspection helpers (stats, id listing) back the `stats` and `list-ids`
//! CLI commands.

pub mod pinecone;

use std::collections::BTreeMap;

use async_trait::async_trait;
pub use pinecone::group_ids_by_period;
pub use pinecone::PineconeClient;
use serde::Serialize;

use crate::errors::Result;
use crate::models::MetadataFilter;
use crate::models::ScoredChunk;

/// Summary statistics reported by the index
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexStats {
    pub dimension: usize,
    pub index_fullness: f64,
    pub total_vector_count: u64,
    pub namespaces: BTreeMap<String, u64>,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Nearest neighbours of `vector` among chunks accepted by `filter`,
    /// best match first, at most `top_k` of them
    async fn query(
        &self,
        vector: Vec<f32>,
        filter: &MetadataFilter,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>>;

    async fn describe_stats(&self) -> Result<IndexStats>;
}
