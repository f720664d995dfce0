//! mlib-server library interface
//!
//! Music library catalog service: songs grouped by performing group, kept
//! consistent across edits and deletes, served over HTTP.

pub mod api;
pub mod catalog;
pub mod error;
pub mod services;
pub mod verses;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::catalog::CatalogRepository;
use crate::services::MetadataProvider;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repo: CatalogRepository,
    /// Enrichment source for new songs
    pub metadata: Arc<dyn MetadataProvider>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(repo: CatalogRepository, metadata: Arc<dyn MetadataProvider>) -> Self {
        Self {
            repo,
            metadata,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::song_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
