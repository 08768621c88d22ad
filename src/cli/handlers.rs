//! CLI command handlers

use std::path::Path;

use tracing::info;

use crate::cli::commands::QueryArgs;
use crate::cli::output::*;
use crate::rag::RagRequest;
use crate::rag::RagService;
use crate::vector::group_ids_by_period;
use crate::vector::PineconeClient;
use crate::vector::VectorIndex;
use crate::AppConfig;
use crate::Result;

/// Year and quarter stay text: the index is matched on exactly what was typed
#[must_use]
pub fn build_request(args: QueryArgs) -> RagRequest {
    RagRequest {
        query: args.query,
        year: args.year.map(Into::into),
        quarters: args.quarter.into_iter().map(Into::into).collect(),
        top_k: args.top_k,
    }
}

/// Handle ask command
pub async fn handle_ask(config: &AppConfig, args: QueryArgs, json: bool) -> Result<()> {
    let service = RagService::new(config).await?;
    let response = service.query(build_request(args)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

/// Handle search command
pub async fn handle_search(config: &AppConfig, args: QueryArgs) -> Result<()> {
    let service = RagService::new(config).await?;
    print_info(&format!("🔍 Searching: \"{}\"", args.query));

    let retrieval = service.search(build_request(args)).await?;
    print_retrieval(&retrieval);
    Ok(())
}

/// Handle stats command
pub async fn handle_stats(config: &AppConfig) -> Result<()> {
    let index = PineconeClient::connect(config).await?;
    let stats = index.describe_stats().await?;
    print_stats(&stats);
    Ok(())
}

/// Handle list-ids command
pub async fn handle_list_ids(
    config: &AppConfig,
    prefix: Option<String>,
    output: Option<&Path>,
) -> Result<()> {
    let index = PineconeClient::connect(config).await?;
    let ids = index.list_ids(prefix.as_deref()).await?;
    let total = ids.len();
    let groups = group_ids_by_period(ids);

    match output {
        Some(path) => {
            std::fs::write(path, serde_json::to_string_pretty(&groups)?)?;
            info!("Wrote {} periods to {}", groups.len(), path.display());
            print_success(&format!(
                "Saved {total} ids in {} periods to {}",
                groups.len(),
                path.display()
            ));
        }
        None => print_period_groups(&groups, total),
    }
    Ok(())
}

/// Handle config command
pub fn handle_config(config: &AppConfig) -> Result<()> {
    print_config(config);
    Ok(())
}
