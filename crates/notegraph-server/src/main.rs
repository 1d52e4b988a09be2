mod config;
mod routes;
mod rpc;

use anyhow::{Context, Result};
use clap::Parser;
use notegraph_core::sqlite::{SqliteNoteStore, SqlitePool};
use notegraph_core::{GraphBuilder, MarkdownConverter, NoteService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Overrides, ServerConfig};

#[derive(Parser, Debug)]
#[command(version, about = "Self-hosted note server")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "NOTEGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file, or `:memory:`.
    #[arg(long, env = "NOTEGRAPH_DATABASE")]
    database: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::load(cli.config.as_deref())?.apply(Overrides {
        database: cli.database,
        host: cli.host,
        port: cli.port,
    });
    init_tracing(&config.log.filter);

    let pool = SqlitePool::new(config.sqlite()).context("Failed to open database")?;
    let service = NoteService::new(
        SqliteNoteStore::new(pool),
        MarkdownConverter::new(),
        GraphBuilder::new(config.graph.untitled_title.clone()),
    );

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "notegraph v{} listening on http://{} (database {})",
        env!("CARGO_PKG_VERSION"),
        addr,
        config.database.path.display()
    );

    axum::serve(listener, routes::app(Arc::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}
