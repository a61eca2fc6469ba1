//! Wayfarer application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialise tracing
//! 3. Build the embedding and language model clients once
//! 4. Wire the document index, retrieval and orchestrator into the API state
//! 5. Serve the axum REST API

mod cli;

use std::sync::Arc;

use clap::Parser;

use wayfarer_api::routes;
use wayfarer_api::state::AppState;
use wayfarer_chat::{LanguageModel, OpenRouterClient};
use wayfarer_core::WayfarerConfig;
use wayfarer_vector::{DynEmbeddingService, HttpEmbeddingService, MockEmbedding, VectorIndex};

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config_exists = config_file.exists();
    let mut config = if config_exists {
        WayfarerConfig::load(&config_file)?
    } else {
        WayfarerConfig::default()
    };
    config.general.port = args.resolve_port(config.general.port);

    // Tracing. RUST_LOG takes precedence over the resolved level.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .init();

    tracing::info!("Starting Wayfarer v{}", env!("CARGO_PKG_VERSION"));
    if config_exists {
        tracing::info!(path = %config_file.display(), "Configuration loaded");
    } else {
        tracing::info!(path = %config_file.display(), "No configuration file, using defaults");
    }

    // Clients.
    let embedder: Arc<dyn DynEmbeddingService> = if args.mock_embeddings {
        tracing::warn!("Using offline mock embeddings; retrieval quality will be poor");
        Arc::new(MockEmbedding::new())
    } else {
        Arc::new(HttpEmbeddingService::from_config(&config.embedding)?)
    };
    let model: Arc<dyn LanguageModel> = Arc::new(OpenRouterClient::from_config(&config.llm)?);

    // Document index (single shared instance).
    let index = Arc::new(VectorIndex::new());
    tracing::info!(dimensions = embedder.dimensions(), "Vector index initialized");

    let state = AppState::new(config.clone(), model, index, embedder);

    if let Err(e) = routes::start_server(&config, state).await {
        tracing::error!(error = %e, "API server stopped");
        return Err(e.into());
    }
    Ok(())
}
