//! Shared test helpers: in-memory stand-ins for the three providers

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::embeddings::Embedder;
use crate::errors::RagError;
use crate::errors::Result;
use crate::llm::ChatMessage;
use crate::llm::ChatModel;
use crate::llm::GenerationParams;
use crate::llm::Role;
use crate::models::ChunkMetadata;
use crate::models::DocumentChunk;
use crate::models::MetadataFilter;
use crate::models::ScoredChunk;
use crate::vector::IndexStats;
use crate::vector::VectorIndex;

/// Test helper to build a scored chunk with year/quarter metadata
pub fn chunk(id: &str, text: &str, year: Value, quarter: Value, score: f32) -> ScoredChunk {
    ScoredChunk {
        chunk: DocumentChunk {
            id: id.to_string(),
            text: text.to_string(),
            metadata: ChunkMetadata {
                year: Some(year),
                quarter: Some(quarter),
                source: Some(format!("report-{id}")),
                ..ChunkMetadata::default()
            },
        },
        score,
    }
}

/// Deterministic embedder that counts its calls
#[derive(Debug)]
pub struct FakeEmbedder {
    dimension: usize,
    fail: bool,
    calls: AtomicUsize,
}

impl Default for FakeEmbedder {
    fn default() -> Self {
        Self {
            dimension: 8,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeEmbedder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RagError::EmbeddingError("embedding service down".to_string()));
        }
        let seed = text.bytes().map(f32::from).sum::<f32>();
        Ok((0..self.dimension).map(|i| seed + i as f32).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// In-memory index returning its chunks in score order
#[derive(Debug, Default)]
pub struct FakeIndex {
    chunks: Vec<ScoredChunk>,
    apply_filter: bool,
    unreachable: bool,
    calls: AtomicUsize,
}

impl FakeIndex {
    pub fn with_chunks(mut chunks: Vec<ScoredChunk>) -> Self {
        chunks.sort_by(|a, b| b.score.total_cmp(&a.score));
        Self {
            chunks,
            apply_filter: true,
            ..Self::default()
        }
    }

    /// Simulates an index that does not honour metadata filters
    pub fn ignoring_filter(mut self) -> Self {
        self.apply_filter = false;
        self
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn query(
        &self,
        _vector: Vec<f32>,
        filter: &MetadataFilter,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(RagError::VectorIndexError("connection refused".to_string()));
        }
        Ok(self
            .chunks
            .iter()
            .filter(|c| !self.apply_filter || filter.accepts(&c.chunk.metadata))
            .take(top_k)
            .cloned()
            .collect())
    }

    async fn describe_stats(&self) -> Result<IndexStats> {
        if self.unreachable {
            return Err(RagError::VectorIndexError("connection refused".to_string()));
        }
        Ok(IndexStats {
            dimension: 8,
            total_vector_count: self.chunks.len() as u64,
            ..IndexStats::default()
        })
    }
}

/// Chat model that records the user prompts it receives
#[derive(Debug, Default)]
pub struct FakeModel {
    fail: bool,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for FakeModel {
    async fn complete(&self, messages: &[ChatMessage], _params: GenerationParams) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(user) = messages.iter().rev().find(|m| m.role == Role::User) {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(user.content.clone());
            }
        }
        if self.fail {
            return Err(RagError::LlmError("model overloaded".to_string()));
        }
        Ok("Based on the reports, revenue grew.".to_string())
    }
}
