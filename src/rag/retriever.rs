//! Retrieval step: embed, search with a metadata filter, mark empty results

use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::embeddings::Embedder;
use crate::errors::Result;
use crate::models::MetadataFilter;
use crate::rag::Retrieval;
use crate::rag::TopK;
use crate::vector::VectorIndex;

/// Retriever for filtered semantic search
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    /// Create a new retriever
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Up to `top_k` chunks matching `filter`, ranked by similarity to `query`.
    ///
    /// Provider failures propagate as-is; an empty result is
    /// [`Retrieval::NoMatches`], not an error.
    pub async fn retrieve(
        &self,
        query: &str,
        filter: &MetadataFilter,
        top_k: TopK,
    ) -> Result<Retrieval> {
        info!("Searching with {}, top_k={}, query='{}'", filter, top_k.get(), query);

        let embedding = self.embedder.embed(query).await?;
        debug!("Query embedding dimension: {}", embedding.len());

        let matches = self.index.query(embedding, filter, top_k.get()).await?;
        let returned = matches.len();

        // The index is trusted to filter, but a mismatching chunk must never reach the prompt
        let chunks: Vec<_> = matches
            .into_iter()
            .filter(|m| {
                let accepted = filter.accepts(&m.chunk.metadata);
                if !accepted {
                    warn!(
                        "Dropping chunk {} whose metadata does not match {}",
                        m.chunk.id, filter
                    );
                }
                accepted
            })
            .take(top_k.get())
            .collect();

        info!("Retrieved {} chunks ({} returned by index)", chunks.len(), returned);
        if chunks.is_empty() {
            warn!(
                "No matching chunks for {}. Check that vectors were upserted with this metadata.",
                filter
            );
        }

        Ok(Retrieval::from_chunks(chunks, filter))
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }
}
