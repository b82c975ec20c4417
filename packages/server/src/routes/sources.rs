use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::{config::ClaimSource, state::AppState};

/// `GET /api/sources` — configured claim sources.
async fn list_sources(State(state): State<Arc<AppState>>) -> Json<Vec<ClaimSource>> {
    Json(state.sources.clone())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/sources", get(list_sources))
}
