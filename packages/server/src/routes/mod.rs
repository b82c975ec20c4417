mod claims;
mod health;
mod sources;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` sub-router with all API routes.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(sources::router())
        .merge(claims::router())
        .with_state(state)
}
