//! Claims verification service for tokenized energy-royalty payouts.
//!
//! Fetches payout manifests from a content-addressed gateway, verifies them
//! against on-chain anchored Merkle roots, scans claim events through a
//! paginated log indexer and serves reconciled per-wallet claim data to the
//! portfolio UI.

pub mod cache;
pub mod chain;
pub mod config;
pub mod manifest;
pub mod pipeline;
pub mod routes;
pub mod state;

use std::{sync::Arc, time::Duration};

use axum::Router;
use tower_http::cors::CorsLayer;

use cache::TtlCache;
use config::ClaimSource;
use pipeline::ClaimsPipeline;
use state::AppState;

/// Assemble shared state with fresh caches using `cache_ttl`.
pub fn build_state(
    sources: Vec<ClaimSource>,
    default_indexer_url: String,
    cache_ttl: Duration,
) -> Arc<AppState> {
    let pipeline = ClaimsPipeline::new(
        reqwest::Client::new(),
        default_indexer_url,
        TtlCache::new(cache_ttl),
    );
    Arc::new(AppState {
        sources,
        pipeline: Arc::new(pipeline),
        portfolios: TtlCache::new(cache_ttl),
    })
}

pub fn build_router(state: Arc<AppState>) -> Router {
    // CORS for the portfolio UI, which is served from a different origin.
    Router::new()
        .nest("/api", routes::api_router(state))
        .layer(CorsLayer::very_permissive())
}
