mod config;
mod errors;
mod evaluation;
mod llm_client;
mod models;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Cli, Config};
use crate::evaluation::pipeline::Evaluator;
use crate::llm_client::{GeminiClient, GenerationService, UnavailableService};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on missing required env vars)
    let mut config = Config::from_env()?;
    config.apply_cli(&cli);

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV evaluator v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client. A failure here skips every candidate rather than aborting.
    let llm: Arc<dyn GenerationService> = match GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_api_base.clone(),
        config.gemini_model.clone(),
        config.request_timeout,
    ) {
        Ok(client) => {
            match config.request_timeout {
                Some(t) => info!(
                    "LLM client initialized (model: {}, timeout: {}s)",
                    client.model(),
                    t.as_secs()
                ),
                None => info!("LLM client initialized (model: {}, no timeout)", client.model()),
            }
            Arc::new(client)
        }
        Err(e) => {
            error!("Error initializing Gemini model: {e}");
            Arc::new(UnavailableService::new(config.gemini_model.clone(), e.to_string()))
        }
    };

    let scorer = config.scoring_mode.scorer();
    info!("Scoring mode: {}", config.scoring_mode);

    let evaluator = Evaluator::new(llm, scorer, config.output_dir.clone())
        .with_saved_prompts(config.save_prompts);
    info!("Writing outputs to {}", evaluator.output_dir().display());

    evaluator.run_batch(&cli.jd, &cli.cvs).await;

    Ok(())
}
