use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;

use royalty_claims_server::{build_router, build_state, cache::DEFAULT_CACHE_TTL, config};

#[derive(Debug, Parser)]
#[command(name = "royalty-claims-server")]
#[command(about = "Claims verification and payout reconciliation backend")]
struct Cli {
    /// JSON file listing the claim sources.
    #[arg(long, env = "CLAIM_SOURCES")]
    sources: PathBuf,

    /// Port to listen on.
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Log indexer endpoint for sources that do not set their own.
    #[arg(long, env = "INDEXER_URL", default_value = "https://eth.hypersync.xyz/query")]
    indexer_url: String,

    /// Lifetime of cached manifests and portfolios, in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL.as_secs())]
    cache_ttl_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "royalty_claims_server=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let sources = config::load_sources(&cli.sources)?;
    tracing::info!(
        sources = sources.len(),
        file = %cli.sources.display(),
        "loaded claim sources"
    );
    tracing::info!(indexer_url = %cli.indexer_url, "default log indexer");

    let state = build_state(
        sources,
        cli.indexer_url,
        Duration::from_secs(cli.cache_ttl_secs),
    );
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    tracing::info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}
