//! Complete RAG pipeline: Retrieve -> Generate

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::config::AppConfig;
use crate::embeddings::Embedder;
use crate::embeddings::EmbeddingClient;
use crate::errors::RagError;
use crate::errors::Result;
use crate::llm::ChatModel;
use crate::llm::GenerationParams;
use crate::llm::LlmService;
use crate::models::FilterValue;
use crate::models::MetadataFilter;
use crate::rag::AnswerGenerator;
use crate::rag::ContextAssembler;
use crate::rag::Retrieval;
use crate::rag::Retriever;
use crate::rag::TopK;
use crate::vector::PineconeClient;
use crate::vector::VectorIndex;

/// Initial stage: only the caller's inputs are known
#[derive(Debug)]
pub struct Start;

/// Retrieval finished
#[derive(Debug)]
pub struct Retrieved {
    documents: Retrieval,
}

/// Generation finished
#[derive(Debug)]
pub struct Done {
    documents: Retrieval,
    answer: String,
    used: Vec<usize>,
}

/// Per-request state threaded through the pipeline.
///
/// The stage parameter makes it impossible to record an answer before the
/// documents it was generated from.
#[derive(Debug)]
pub struct PipelineState<S> {
    query: String,
    filter: MetadataFilter,
    stage: S,
}

impl<S> PipelineState<S> {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn filter(&self) -> &MetadataFilter {
        &self.filter
    }

    pub fn year(&self) -> Option<&FilterValue> {
        self.filter.year.as_ref()
    }

    pub fn quarters(&self) -> &[FilterValue] {
        &self.filter.quarters
    }
}

impl PipelineState<Start> {
    pub fn new(
        query: impl Into<String>,
        year: Option<FilterValue>,
        quarter: Option<FilterValue>,
    ) -> Self {
        Self {
            query: query.into(),
            filter: MetadataFilter::new(year, quarter),
            stage: Start,
        }
    }

    /// Start from a prepared filter, e.g. one spanning several quarters
    pub fn with_filter(query: impl Into<String>, filter: MetadataFilter) -> Self {
        Self {
            query: query.into(),
            filter,
            stage: Start,
        }
    }

    /// `Start -> Retrieved`
    pub async fn retrieve(
        self,
        retriever: &Retriever,
        top_k: TopK,
    ) -> Result<PipelineState<Retrieved>> {
        debug!("Step 1: Retrieving documents");
        let documents = retriever.retrieve(&self.query, &self.filter, top_k).await?;
        Ok(PipelineState {
            query: self.query,
            filter: self.filter,
            stage: Retrieved { documents },
        })
    }
}

impl PipelineState<Retrieved> {
    pub fn documents(&self) -> &Retrieval {
        &self.stage.documents
    }

    pub fn into_documents(self) -> Retrieval {
        self.stage.documents
    }

    /// `Retrieved -> Done`
    pub async fn generate(self, generator: &AnswerGenerator) -> Result<PipelineState<Done>> {
        debug!("Step 2: Generating answer");
        let generated = generator
            .generate(&self.query, &self.filter, &self.stage.documents)
            .await?;
        Ok(PipelineState {
            query: self.query,
            filter: self.filter,
            stage: Done {
                documents: self.stage.documents,
                answer: generated.answer,
                used: generated.used,
            },
        })
    }
}

impl PipelineState<Done> {
    pub fn documents(&self) -> &Retrieval {
        &self.stage.documents
    }

    pub fn answer(&self) -> &str {
        &self.stage.answer
    }

    pub fn into_response(self) -> RagResponse {
        let chunks = self.stage.documents.chunks();
        let sources: Vec<SourceRef> = self
            .stage
            .used
            .iter()
            .filter_map(|&idx| chunks.get(idx))
            .map(|scored| SourceRef {
                id: scored.chunk.id.clone(),
                source: scored.chunk.metadata.source.clone(),
                score: scored.score,
            })
            .collect();

        RagResponse {
            answer: self.stage.answer,
            context_chunks: sources.len(),
            sources,
            query: self.query,
            filter: self.filter,
        }
    }
}

/// Tunables shared by every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RagSettings {
    pub default_top_k: usize,
    pub max_context_chars: usize,
    pub generation: GenerationParams,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            default_top_k: crate::config::default_top_k(),
            max_context_chars: crate::config::default_max_context_chars(),
            generation: GenerationParams::default(),
        }
    }
}

impl RagSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_top_k: config.retrieval.default_top_k,
            max_context_chars: config.retrieval.max_context_chars,
            generation: GenerationParams {
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
            },
        }
    }
}

/// Complete RAG service
///
/// Built once at startup; the provider handles inside are shared by all requests.
pub struct RagService {
    retriever: Retriever,
    generator: AnswerGenerator,
    default_top_k: usize,
}

impl RagService {
    /// Create a new RAG service from configuration
    ///
    /// # Errors
    /// - Missing credentials or index name (reported before any network call)
    /// - Pinecone index lookup failures
    /// - HTTP client build errors
    pub async fn new(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let embedder = Arc::new(EmbeddingClient::from_config(config)?);
        let index = Arc::new(PineconeClient::connect(config).await?);
        let model = Arc::new(LlmService::from_config(config)?);

        info!(
            "RAG service ready (embeddings: {}, model: {})",
            embedder.model(),
            model.model()
        );

        Ok(Self::from_services(
            embedder,
            index,
            model,
            RagSettings::from_config(config),
        ))
    }

    /// Create from existing services
    #[must_use]
    pub fn from_services(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        model: Arc<dyn ChatModel>,
        settings: RagSettings,
    ) -> Self {
        Self {
            retriever: Retriever::new(embedder, index),
            generator: AnswerGenerator::new(
                model,
                ContextAssembler::new(settings.max_context_chars),
                settings.generation,
            ),
            default_top_k: settings.default_top_k,
        }
    }

    /// Run retrieval and generation for one request
    ///
    /// # Errors
    /// - Invalid input (blank query, non-positive top_k), before any provider call
    /// - Embedding, vector index or language model failures, unmodified
    pub async fn query(&self, request: RagRequest) -> Result<RagResponse> {
        let (state, top_k) = self.start(request)?;
        info!("Processing RAG query: {}", state.query());

        let response = state
            .retrieve(&self.retriever, top_k)
            .await?
            .generate(&self.generator)
            .await?
            .into_response();

        info!("RAG query completed successfully");
        Ok(response)
    }

    /// Retrieval only, without calling the language model
    pub async fn search(&self, request: RagRequest) -> Result<Retrieval> {
        let (state, top_k) = self.start(request)?;
        Ok(state.retrieve(&self.retriever, top_k).await?.into_documents())
    }

    fn start(&self, request: RagRequest) -> Result<(PipelineState<Start>, TopK)> {
        if request.query.trim().is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".to_string()));
        }
        let top_k = match request.top_k {
            Some(value) => TopK::new(value)?,
            None => TopK::new(self.default_top_k as i64)?,
        };
        Ok((
            PipelineState::with_filter(
                request.query,
                MetadataFilter::with_quarters(request.year, request.quarters),
            ),
            top_k,
        ))
    }

    /// Get retriever reference
    #[must_use]
    pub const fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Get generator reference
    #[must_use]
    pub const fn generator(&self) -> &AnswerGenerator {
        &self.generator
    }
}

/// Pipeline entry point input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagRequest {
    pub query: String,
    #[serde(default)]
    pub year: Option<FilterValue>,
    /// One quarter or a list of them; chunks from any listed quarter qualify
    #[serde(
        default,
        rename = "quarter",
        alias = "quarters",
        deserialize_with = "one_or_many"
    )]
    pub quarters: Vec<FilterValue>,
    /// Signed so that out-of-range values can be rejected with a clear error
    #[serde(default)]
    pub top_k: Option<i64>,
}

impl RagRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            year: None,
            quarters: Vec::new(),
            top_k: None,
        }
    }

    #[must_use]
    pub fn with_year(mut self, year: impl Into<FilterValue>) -> Self {
        self.year = Some(year.into());
        self
    }

    #[must_use]
    pub fn with_quarter(mut self, quarter: impl Into<FilterValue>) -> Self {
        self.quarters.push(quarter.into());
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: i64) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(FilterValue),
    Many(Vec<FilterValue>),
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<FilterValue>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

/// A chunk that contributed to the answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub id: String,
    pub source: Option<String>,
    pub score: f32,
}

/// RAG response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub context_chunks: usize,
    pub query: String,
    pub filter: MetadataFilter,
}

impl RagResponse {
    /// Get a formatted string representation
    #[must_use]
    pub fn format(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Query: {} ({})\n\n", self.query, self.filter));
        output.push_str(&format!("Answer:\n{}\n\n", self.answer));
        output.push_str(&format!("Sources ({} chunks):\n", self.sources.len()));

        for (idx, source) in self.sources.iter().enumerate() {
            output.push_str(&format!(
                "  {}. {} [{}] (Score: {:.3})\n",
                idx + 1,
                source.id,
                source.source.as_deref().unwrap_or("unknown source"),
                source.score
            ));
        }

        output
    }
}
