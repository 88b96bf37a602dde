//! Salon Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salon_engine::api;
use salon_engine::app::App;
use salon_engine::infrastructure::{
    app_config::EngineConfig,
    clock::SystemClock,
    ollama::OllamaClient,
    persistence::SqliteRoomStore,
    ports::ClockPort,
    resilient_llm::ResilientLlmClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salon_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Salon Engine");

    let config = EngineConfig::from_env();
    let server_host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let server_port: u16 = std::env::var("SERVER_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .unwrap_or(3000);
    let db_path = std::env::var("SALON_DB").unwrap_or_else(|_| "salon.db".into());

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);

    let ollama_client = OllamaClient::from_env_with_timeout(config.request_timeout_secs);
    tracing::info!(
        model = ollama_client.model(),
        timeout_secs = ollama_client.timeout_secs(),
        max_attempts = config.retry.max_attempts,
        initial_delay_ms = config.retry.initial_delay_ms,
        "LLM client configured"
    );
    let llm = Arc::new(ResilientLlmClient::new(
        Arc::new(ollama_client),
        config.retry.clone(),
    ));

    let store = Arc::new(SqliteRoomStore::new(&db_path).await?);

    let app = Arc::new(App::new(llm, store, clock, config));

    let router = api::http::routes()
        .with_state(app)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_methods(Any)
                .allow_headers(Any)
                .allow_origin(Any),
        );

    let addr: SocketAddr = format!("{server_host}:{server_port}").parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
