use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use royalty_claims_core::parse_address;

use crate::{
    pipeline::{build_portfolio, Portfolio, SourceClaims, UnclaimedProof},
    state::AppState,
};

/// Lowercase owner address, or 400 if it is not a 20-byte hex address.
fn owner_key(owner: &str) -> Result<String, StatusCode> {
    parse_address(owner)
        .map(|_| owner.trim().to_ascii_lowercase())
        .ok_or(StatusCode::BAD_REQUEST)
}

async fn portfolio_for(state: &Arc<AppState>, owner: String) -> Portfolio {
    if let Some(cached) = state.portfolios.get(&owner) {
        return cached;
    }
    let portfolio = build_portfolio(state.pipeline.clone(), &state.sources, &owner).await;
    state.portfolios.insert(owner, portfolio.clone());
    portfolio
}

/// `GET /api/claims/:owner` — reconciled claims across all sources.
async fn get_portfolio(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> Result<Json<Portfolio>, StatusCode> {
    let owner = owner_key(&owner)?;
    Ok(Json(portfolio_for(&state, owner).await))
}

/// `GET /api/claims/:owner/sources/:name` — reconciliation for one source.
async fn get_source_claims(
    State(state): State<Arc<AppState>>,
    Path((owner, name)): Path<(String, String)>,
) -> Result<Json<SourceClaims>, StatusCode> {
    let owner = owner_key(&owner)?;
    let source = state.source(&name).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(state.pipeline.reconcile_source(source, &owner).await))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProofsResponse {
    source: String,
    owner_address: String,
    proofs: Vec<UnclaimedProof>,
}

/// `GET /api/claims/:owner/sources/:name/proofs` — Merkle proofs for the
/// owner's unclaimed rows, ready for the claim contract.
async fn get_unclaimed_proofs(
    State(state): State<Arc<AppState>>,
    Path((owner, name)): Path<(String, String)>,
) -> Result<Json<ProofsResponse>, StatusCode> {
    let owner = owner_key(&owner)?;
    let source = state.source(&name).ok_or(StatusCode::NOT_FOUND)?;

    let proofs = state
        .pipeline
        .unclaimed_proofs(source, &owner)
        .await
        .map_err(|e| {
            tracing::warn!(source = %name, error = %e, "cannot build claim proofs");
            StatusCode::BAD_GATEWAY
        })?;

    Ok(Json(ProofsResponse {
        source: name,
        owner_address: owner,
        proofs,
    }))
}

/// `POST /api/claims/:owner/refresh` — drop the cached portfolio and rebuild it.
async fn refresh_portfolio(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> Result<Json<Portfolio>, StatusCode> {
    let owner = owner_key(&owner)?;
    state.portfolios.invalidate(&owner);
    Ok(Json(portfolio_for(&state, owner).await))
}

/// `POST /api/claims/:owner/sources/:name/refresh` — refetch the source's
/// manifest and recompute its reconciliation.
async fn refresh_source_claims(
    State(state): State<Arc<AppState>>,
    Path((owner, name)): Path<(String, String)>,
) -> Result<Json<SourceClaims>, StatusCode> {
    let owner = owner_key(&owner)?;
    let source = state.source(&name).ok_or(StatusCode::NOT_FOUND)?;
    state.pipeline.invalidate_manifest(&source.name);
    state.portfolios.invalidate(&owner);
    Ok(Json(state.pipeline.reconcile_source(source, &owner).await))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/claims/{owner}", get(get_portfolio))
        .route("/claims/{owner}/refresh", post(refresh_portfolio))
        .route("/claims/{owner}/sources/{name}", get(get_source_claims))
        .route(
            "/claims/{owner}/sources/{name}/refresh",
            post(refresh_source_claims),
        )
        .route(
            "/claims/{owner}/sources/{name}/proofs",
            get(get_unclaimed_proofs),
        )
}
