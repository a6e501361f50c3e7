use gasfutures::{config::Config, routes::create_router, AppState};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gasfutures=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting gas futures contract engine");

    // Load configuration
    let config = Config::load()?;

    tracing::info!(
        "Loaded configuration - Server: {}:{}",
        config.server.host,
        config.server.port
    );

    // Initialize application state (hydrates the ledger)
    let state = AppState::new(config.clone()).await?;

    tracing::info!(contracts = state.ledger.len(), "Initialized application state");

    if config.sweeper.enabled {
        state
            .sweeper
            .clone()
            .spawn(Duration::from_secs(config.sweeper.interval_secs.max(1)));
        tracing::info!(
            interval_secs = config.sweeper.interval_secs,
            "Expiration sweeper running"
        );
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
