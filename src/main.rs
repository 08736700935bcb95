use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use concept_api::config::{config, StorageBackend};
use concept_api::database::DatabaseManager;

#[derive(Debug, Parser)]
#[command(name = "concept-api", version, about = "Serve the concept API")]
struct Args {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Storage backend: memory or postgres (overrides STORAGE_BACKEND)
    #[arg(long)]
    backend: Option<StorageBackend>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL and friends are picked up locally
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = config().clone();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(backend) = args.backend {
        config.storage.backend = backend;
    }
    tracing::info!("Starting concept API in {:?} mode", config.environment);

    let db = DatabaseManager::connect(&config.storage)
        .await
        .context("opening document store")?;
    let app = concept_api::app::router(&config, db)?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}{}", bind_addr, config.api.base_path);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
