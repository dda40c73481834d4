//! brew-server entry point

use brew_server::{AppState, Config, api, error, logger};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    error::set_expose_diagnostics(!config.is_production());
    logger::init_logger(
        &config.log_level,
        config.is_production(),
        config.log_dir.as_deref(),
    )?;

    tracing::info!("Starting brew-server (env: {})", config.environment);

    let state = AppState::from_config(&config)?;
    state.bootstrap_admin(&config)?;

    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("brew-server HTTP listening on {http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("brew-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    tracing::info!("Shutdown signal received");
}
