//! Answer generation step

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::errors::Result;
use crate::llm::prompts::ReportPrompts;
use crate::llm::ChatMessage;
use crate::llm::ChatModel;
use crate::llm::GenerationParams;
use crate::llm::PromptTemplate;
use crate::models::MetadataFilter;
use crate::rag::ContextAssembler;
use crate::rag::Retrieval;

/// Answer plus the chunks that reached the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub context_chunks: usize,
    /// Positions of the contributing chunks within the retrieval
    pub used: Vec<usize>,
}

impl GeneratedAnswer {
    fn no_information(filter: &MetadataFilter) -> Self {
        Self {
            answer: no_information_answer(filter),
            context_chunks: 0,
            used: Vec::new(),
        }
    }
}

/// Turns retrieved chunks into an answer through the language model
#[derive(Clone)]
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    assembler: ContextAssembler,
    template: PromptTemplate,
    params: GenerationParams,
}

impl AnswerGenerator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        assembler: ContextAssembler,
        params: GenerationParams,
    ) -> Self {
        Self {
            model,
            assembler,
            template: ReportPrompts::report_qa(),
            params,
        }
    }

    /// Produce an answer for `query` from `retrieval`.
    ///
    /// The model is never called with an empty context: no matches, or matches
    /// without usable text, yield a fixed "no information" answer instead.
    pub async fn generate(
        &self,
        query: &str,
        filter: &MetadataFilter,
        retrieval: &Retrieval,
    ) -> Result<GeneratedAnswer> {
        let chunks = match retrieval {
            Retrieval::NoMatches { filter } => {
                info!("No documents for {}, skipping language model", filter);
                return Ok(GeneratedAnswer::no_information(filter));
            }
            Retrieval::Found { chunks } => chunks,
        };

        let context = self.assembler.assemble(chunks);
        if context.is_empty() {
            warn!(
                "None of {} chunks left any context for {}, skipping language model",
                chunks.len(),
                filter
            );
            return Ok(GeneratedAnswer::no_information(filter));
        }

        let prompt = self.build_prompt(query, &context.text);
        debug!(
            "Prompt built from {} chunks ({} chars)",
            context.chunks_used,
            prompt.len()
        );

        let messages = [ChatMessage::system(ReportPrompts::SYSTEM), ChatMessage::user(prompt)];
        let answer = self.model.complete(&messages, self.params).await?;

        info!("Answer generated ({} chars)", answer.len());
        Ok(GeneratedAnswer {
            answer,
            context_chunks: context.chunks_used,
            used: context.used,
        })
    }

    /// Fill the report prompt with a context block and the question
    #[must_use]
    pub fn build_prompt(&self, query: &str, context: &str) -> String {
        let values = HashMap::from([("context", context), ("query", query)]);
        self.template.render(&values)
    }

    pub const fn params(&self) -> GenerationParams {
        self.params
    }
}

/// Fixed answer used when retrieval found nothing
pub fn no_information_answer(filter: &MetadataFilter) -> String {
    format!("No relevant information found in historical reports for {filter}.")
}
