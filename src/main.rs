use std::process::ExitCode;

use clap::Parser;
use reportrag::cli::error_json;
use reportrag::cli::handle_ask;
use reportrag::cli::handle_config;
use reportrag::cli::handle_list_ids;
use reportrag::cli::handle_search;
use reportrag::cli::handle_stats;
use reportrag::cli::print_error;
use reportrag::cli::Cli;
use reportrag::cli::Commands;
use reportrag::config::AppConfig;
use reportrag::Result;
use tracing::error;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine, the environment may already be set
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let json_errors = matches!(cli.command, Commands::Ask { json: true, .. });

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            if json_errors {
                println!("{}", error_json(&e));
            } else {
                print_error(&e.to_string());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load()?;

    if cli.verbose {
        reportrag::logging::init_logging_with_level("debug")?;
    } else {
        reportrag::logging::init_logging_with_config(Some(&config))?;
    }
    info!("Configuration loaded successfully");

    match cli.command {
        Commands::Ask { query, json } => handle_ask(&config, query, json).await,
        Commands::Search { query } => handle_search(&config, query).await,
        Commands::Stats => handle_stats(&config).await,
        Commands::ListIds { prefix, output } => {
            handle_list_ids(&config, prefix, output.as_deref()).await
        }
        Commands::Config => handle_config(&config),
    }
}
