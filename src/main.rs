use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use client_tracker::{AppState, app, config, db};

/// Client and invoice tracking API
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Listen address, overrides BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("client_tracker=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = config::init()?;

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => serve(config, bind).await,
        Command::Migrate => migrate(config).await,
    }
}

async fn serve(config: config::Config, bind: Option<String>) -> Result<()> {
    let store = db::init(&config).await?;
    let state = AppState::from_config(&config, store);

    let addr = bind.unwrap_or_else(|| config.bind_addr.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app(state, &config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn migrate(config: config::Config) -> Result<()> {
    if config.uses_memory_store() {
        anyhow::bail!("DATABASE_URL points at the in-memory store, nothing to migrate");
    }

    let db = db::Database::new(&config).await?;
    db.migrate().await?;
    tracing::info!("migrations applied");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
