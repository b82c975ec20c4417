use std::sync::Arc;

use crate::{cache::TtlCache, config::ClaimSource, pipeline::ClaimsPipeline, pipeline::Portfolio};

/// Shared application state.
pub struct AppState {
    /// Configured claim sources, in display order.
    pub sources: Vec<ClaimSource>,
    pub pipeline: Arc<ClaimsPipeline>,
    /// Reconciled portfolios keyed by lowercase owner address.
    pub portfolios: TtlCache<String, Portfolio>,
}

impl AppState {
    pub fn source(&self, name: &str) -> Option<&ClaimSource> {
        self.sources.iter().find(|s| s.name == name)
    }
}
