use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use travel_rag::api;
use travel_rag::config::Config;
use travel_rag::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("LLM provider: {} ({})", config.llm.provider, config.llm.base_url);
    tracing::info!(
        "Fusion alpha: {}, top_k: {}",
        config.search.fusion_alpha,
        config.search.default_top_k
    );

    let state = AppState::new(config.clone())?;

    // Index the document feed before accepting any traffic
    let seeded = state.seed().await?;
    tracing::info!("Indexed {seeded} reference documents");

    let app = Router::new()
        .route("/api/answer", post(api::answer::answer))
        .route("/api/answer/stream", post(api::answer::answer_stream))
        .route("/api/documents", get(api::docs::list_documents))
        .route("/api/health", get(api::docs::health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
