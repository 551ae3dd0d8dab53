mod analysis;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod refine;
mod routes;
mod segmentation;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::AnalysisPipeline;
use crate::config::Config;
use crate::extraction::Extractor;
use crate::llm_client::LlmClient;
use crate::refine::{RefineAccumulator, RefineOptions};
use crate::routes::build_router;
use crate::segmentation::Segmenter;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume analyzer v{}", env!("CARGO_PKG_VERSION"));

    // Chunking and templates are validated here, before any request is served
    let segmenter = Segmenter::with_default_separators(config.chunk_size, config.chunk_overlap)?;
    info!(
        "Segmenter: chunk_size={}, chunk_overlap={}",
        segmenter.chunk_size(),
        segmenter.chunk_overlap()
    );

    let accumulator = RefineAccumulator::with_default_templates(RefineOptions {
        step_timeout: config.generation_timeout,
        max_attempts: config.generation_max_attempts,
        ..RefineOptions::default()
    })?;

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let pipeline = AnalysisPipeline::new(
        Extractor::default(),
        segmenter,
        accumulator,
        Arc::new(llm),
        config.extraction_timeout,
    );

    // Build app state
    let state = AppState {
        pipeline: Arc::new(pipeline),
        max_upload_bytes: config.max_upload_bytes,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
