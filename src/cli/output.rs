//! CLI output formatting utilities
//!
//! This module provides consistent output formatting for the `reportrag` CLI

use std::collections::BTreeMap;

use serde_json::json;

use crate::rag::RagResponse;
use crate::rag::Retrieval;
use crate::vector::IndexStats;
use crate::AppConfig;
use crate::RagError;

/// Safely truncate a string at character boundary (not byte boundary)
///
/// # Returns
/// Truncated string with "..." suffix if truncated, otherwise the original string
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Hide all but the first few characters of a secret
#[must_use]
pub fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        None => "(not set)".to_string(),
        Some(s) if s.chars().count() <= 8 => "****".to_string(),
        Some(s) => format!("{}****", s.chars().take(4).collect::<String>()),
    }
}

pub fn print_response(response: &RagResponse) {
    println!("📝 Answer:");
    println!("{}", response.answer);
    println!();

    if response.sources.is_empty() {
        return;
    }
    println!("📚 Sources ({} chunks, {}):", response.sources.len(), response.filter);
    for (idx, source) in response.sources.iter().enumerate() {
        println!(
            "  {}. {} | {} | score {:.3}",
            idx + 1,
            source.id,
            source.source.as_deref().unwrap_or("N/A"),
            source.score
        );
    }
}

pub fn print_retrieval(retrieval: &Retrieval) {
    match retrieval {
        Retrieval::NoMatches { filter } => {
            print_warning(&format!("No chunks found for {filter}"));
        }
        Retrieval::Found { chunks } => {
            println!("Found {} chunks:", chunks.len());
            for (idx, scored) in chunks.iter().enumerate() {
                println!();
                println!(
                    "  {}. {} (score {:.3}, source {})",
                    idx + 1,
                    scored.chunk.id,
                    scored.score,
                    scored.chunk.metadata.source.as_deref().unwrap_or("N/A")
                );
                println!("     {}", truncate_str(&scored.chunk.text.replace('\n', " "), 200));
            }
        }
    }
}

pub fn print_stats(stats: &IndexStats) {
    println!("📊 Index Statistics");
    println!("===================");
    println!("  Dimension: {}", stats.dimension);
    println!("  Total vectors: {}", stats.total_vector_count);
    println!("  Fullness: {:.2}%", stats.index_fullness * 100.0);

    if !stats.namespaces.is_empty() {
        println!();
        println!("  Namespaces:");
        for (name, count) in &stats.namespaces {
            let name = if name.is_empty() { "(default)" } else { name };
            println!("    - {name}: {count} vectors");
        }
    }
}

pub fn print_period_groups(groups: &BTreeMap<String, Vec<String>>, total: usize) {
    println!("Found {total} ids in {} periods:", groups.len());
    for (period, ids) in groups {
        println!("  {period}: {} ids", ids.len());
    }
}

pub fn print_config(config: &AppConfig) {
    println!("📋 reportrag Configuration:");
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!();

    println!("🧠 Embeddings:");
    println!("  Endpoint: {}", config.embedding_endpoint());
    println!("  Model: {}", config.embedding_model());
    println!("  Dimension: {}", config.embedding_dimension());
    println!("  API key: {}", mask_secret(config.embedding_api_key()));
    println!();

    println!("💬 LLM:");
    println!("  Endpoint: {}", config.llm_endpoint());
    println!("  Model: {}", config.llm_model());
    println!("  Temperature: {}", config.llm.temperature);
    println!("  Max tokens: {}", config.llm.max_tokens);
    println!("  API key: {}", mask_secret(config.llm_key()));
    println!();

    println!("🌲 Pinecone:");
    println!("  Index: {}", config.pinecone_index_name().unwrap_or("(not set)"));
    println!(
        "  Host: {}",
        config.pinecone_index_host().unwrap_or("(resolved at startup)")
    );
    println!("  Namespace: {}", config.pinecone_namespace().unwrap_or("(default)"));
    println!("  API key: {}", mask_secret(config.pinecone_api_key()));
    println!();

    println!("🔍 Retrieval:");
    println!("  Default top_k: {}", config.retrieval.default_top_k);
    println!("  Max context chars: {}", config.retrieval.max_context_chars);
    println!();

    println!("🌐 HTTP:");
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!(
        "  Retries: {} ({}ms backoff)",
        config.http.max_retries, config.http.retry_backoff_ms
    );

    if let Err(e) = config.validate() {
        println!();
        print_warning(&e.to_string());
    }
}

/// Machine-readable error body for `--json` output
#[must_use]
pub fn error_json(err: &RagError) -> serde_json::Value {
    json!({
        "error": {
            "kind": err.kind(),
            "message": err.to_string(),
        }
    })
}

pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("❌ {msg}");
}
