use anyhow::{Context, Result};
use clap::Parser;
use tabkeep_server::{create_router, AppState, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let state = AppState::from_config(&config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    tracing::info!(
        addr = %config.addr,
        file = %config.file.display(),
        autosave = !config.no_autosave,
        "tabkeep-server listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
