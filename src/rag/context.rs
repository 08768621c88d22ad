//! Context assembly from retrieved chunks

use tracing::debug;

use crate::models::ScoredChunk;

/// Separator placed between consecutive chunk texts
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Context block plus the chunks that made it in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    pub chunks_used: usize,
    /// Positions, in the input slice, of the chunks that contributed text
    pub used: Vec<usize>,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.chunks_used == 0
    }
}

/// Joins chunk texts in retrieval order, bounded by a character budget
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    max_context_chars: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(crate::config::default_max_context_chars())
    }
}

impl ContextAssembler {
    /// Create a new context assembler
    #[must_use]
    pub const fn new(max_context_chars: usize) -> Self {
        Self { max_context_chars }
    }

    pub const fn max_context_chars(&self) -> usize {
        self.max_context_chars
    }

    /// Assemble the context block.
    ///
    /// Chunks are added whole, in the given order, while they fit. A first chunk
    /// that is larger than the whole budget is cut at a character boundary so the
    /// model always receives something. Chunks without text are skipped and never
    /// counted.
    #[must_use]
    pub fn assemble(&self, chunks: &[ScoredChunk]) -> AssembledContext {
        let mut text = String::new();
        let mut used_chars = 0;
        let mut used = Vec::new();
        let separator_chars = CONTEXT_SEPARATOR.chars().count();

        for (idx, scored) in chunks.iter().enumerate() {
            if scored.chunk.text.trim().is_empty() {
                debug!("Skipping chunk {} without text", scored.chunk.id);
                continue;
            }
            let chunk_chars = scored.chunk.text.chars().count();

            if used.is_empty() {
                if chunk_chars > self.max_context_chars {
                    let truncated = truncate_chars(&scored.chunk.text, self.max_context_chars);
                    debug!(
                        "Chunk {} truncated from {} to {} chars",
                        scored.chunk.id, chunk_chars, self.max_context_chars
                    );
                    if !truncated.trim().is_empty() {
                        text.push_str(truncated);
                        used.push(idx);
                    }
                    break;
                }
                text.push_str(&scored.chunk.text);
                used_chars = chunk_chars;
                used.push(idx);
                continue;
            }

            if used_chars + separator_chars + chunk_chars > self.max_context_chars {
                break;
            }
            text.push_str(CONTEXT_SEPARATOR);
            text.push_str(&scored.chunk.text);
            used_chars += separator_chars + chunk_chars;
            used.push(idx);
        }

        if used.len() < chunks.len() {
            debug!(
                "Context budget of {} chars: using {} of {} chunks",
                self.max_context_chars,
                used.len(),
                chunks.len()
            );
        }

        AssembledContext {
            text,
            chunks_used: used.len(),
            used,
        }
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
